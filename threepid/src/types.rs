//! Workflow types: media, display modes, view states and actions.

use crate::error::Error;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vm:meta])* $variant:ident = $val:literal),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name { $($(#[$vm])* $variant),* }

        impl $name {
            /// Wire identifier of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self { $(Self::$variant => $val,)* }
            }

            /// Convert from a wire identifier. Returns `None` for unknown values.
            #[must_use]
            pub fn from_wire(v: &str) -> Option<Self> {
                match v { $($val => Some(Self::$variant),)* _ => None }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Third-party identifier medium.
    pub enum Medium {
        /// Email address.
        Email = "email",
        /// Phone number (E.164 digits, no leading `+`).
        Msisdn = "msisdn",
    }
}

impl Medium {
    /// Parse a medium name, accepting `phone` as an alias of `msisdn`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phone" => Some(Self::Msisdn),
            other => Self::from_wire(other),
        }
    }
}

wire_enum! {
    /// What the details screen offers the user once loaded.
    pub enum DisplayMode {
        /// Identifier is not discoverable; offer to share it.
        Share = "share",
        /// Identifier is discoverable; offer to revoke it.
        Revoke = "revoke",
        /// A validation email was sent; offer to cancel waiting for it.
        CancelEmailValidation = "cancel_email_validation",
        /// A validation SMS was sent; ask for the code.
        EnterSmsCode = "enter_sms_code",
    }
}

impl DisplayMode {
    /// Whether this mode is shown while a validation request is pending.
    #[must_use]
    pub const fn awaits_validation(self) -> bool {
        matches!(self, Self::CancelEmailValidation | Self::EnterSmsCode)
    }

    /// Mode derived from a discoverability lookup.
    #[must_use]
    pub const fn from_discoverable(discoverable: bool) -> Self {
        if discoverable { Self::Revoke } else { Self::Share }
    }
}

/// Snapshot published to the flow's subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// A request is in flight.
    Loading,
    /// Idle, showing the given mode.
    Loaded(DisplayMode),
    /// The last operation failed with this cause.
    Error(Error),
}

impl ViewState {
    /// The display mode, if loaded.
    #[must_use]
    pub const fn display_mode(&self) -> Option<DisplayMode> {
        match self {
            Self::Loaded(mode) => Some(*mode),
            _ => None,
        }
    }

    /// Whether a validation request must be pending in this state.
    #[must_use]
    pub const fn awaits_validation(&self) -> bool {
        matches!(self, Self::Loaded(mode) if mode.awaits_validation())
    }
}

/// Actions dispatched to a [`DiscoveryFlow`](crate::DiscoveryFlow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    /// Query the current discoverability.
    Load,
    /// Make the identifier discoverable.
    Share,
    /// Stop the identifier being discoverable.
    Revoke,
    /// Abandon a pending email validation.
    CancelEmailValidation,
    /// Submit the code received by SMS.
    EnterSmsCode(String),
}

/// A share/revoke request waiting for the user to validate ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingValidation {
    /// Secret generated for this request.
    pub client_secret: String,
    /// Session id returned by the token request.
    pub sid: String,
    /// `true` to bind (share), `false` to unbind (revoke).
    pub bind: bool,
}

impl PendingValidation {
    /// Whether an out-of-band confirmation refers to this request.
    #[must_use]
    pub fn matches(&self, client_secret: &str, sid: &str) -> bool {
        self.client_secret == client_secret && self.sid == sid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_accepts_phone_alias() {
        assert_eq!(Medium::parse("phone"), Some(Medium::Msisdn));
        assert_eq!(Medium::parse(" MSISDN "), Some(Medium::Msisdn));
        assert_eq!(Medium::parse("email"), Some(Medium::Email));
        assert_eq!(Medium::parse("fax"), None);
        assert_eq!(Medium::Msisdn.to_string(), "msisdn");
    }

    #[test]
    fn only_validation_modes_await_validation() {
        assert!(ViewState::Loaded(DisplayMode::EnterSmsCode).awaits_validation());
        assert!(ViewState::Loaded(DisplayMode::CancelEmailValidation).awaits_validation());
        assert!(!ViewState::Loaded(DisplayMode::Share).awaits_validation());
        assert!(!ViewState::Loading.awaits_validation());
        assert!(!ViewState::Error(Error::Unknown).awaits_validation());
    }

    #[test]
    fn discoverable_maps_to_revoke() {
        assert_eq!(DisplayMode::from_discoverable(true), DisplayMode::Revoke);
        assert_eq!(DisplayMode::from_discoverable(false), DisplayMode::Share);
    }

    #[test]
    fn pending_match_requires_both_fields() {
        let p = PendingValidation {
            client_secret: "c".into(),
            sid: "s".into(),
            bind: true,
        };
        assert!(p.matches("c", "s"));
        assert!(!p.matches("c", "other"));
        assert!(!p.matches("other", "s"));
    }
}
