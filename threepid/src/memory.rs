//! In-process simulation of a homeserver and identity service.
//!
//! Enabled via the `memory` Cargo feature (on by default). [`MemoryGateway`]
//! keeps the account's associations, the identity server's bindings, token
//! sessions and an outbox of the emails and texts "sent" to the user, so a
//! whole share / revoke round trip can run without a network.
//!
//! Email sessions reach the directory through
//! [`add_association`](Gateway::add_association). Phone sessions are settled
//! by the identity service itself: a correct SMS code publishes the number,
//! unless the removal that preceded the token request took it out of the
//! directory (a revoke).
//!
//! ```
//! use threepid::{DiscoveryFlow, MemoryGateway, ThreePid, ViewState, DisplayMode};
//! use std::sync::Arc;
//!
//! # async fn example() -> threepid::Result<()> {
//! let gateway = Arc::new(MemoryGateway::new());
//! let flow = DiscoveryFlow::new(Arc::clone(&gateway), ThreePid::parse("alice@example.com")?);
//! let mut states = flow.subscribe()?;
//!
//! flow.load().await;
//! assert_eq!(states.recv().await, Some(ViewState::Loading));
//! assert_eq!(states.recv().await, Some(ViewState::Loaded(DisplayMode::Share)));
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Collaborator, Error, Result};
use crate::gateway::{Gateway, PhoneTokenResponse};
use crate::identifier::ThreePid;
use crate::secret::{random_code, random_hex};
use crate::types::{Medium, wire_enum};

/// Digits in a simulated SMS code.
const SMS_CODE_DIGITS: usize = 6;

wire_enum! {
    /// A [`Gateway`] request, for failure injection and call inspection.
    pub enum Operation {
        /// [`Gateway::lookup_discoverability`].
        Lookup = "lookup",
        /// [`Gateway::remove_association`].
        RemoveAssociation = "remove_association",
        /// [`Gateway::request_email_token`].
        RequestEmailToken = "request_email_token",
        /// [`Gateway::request_phone_token`].
        RequestPhoneToken = "request_phone_token",
        /// [`Gateway::add_association`].
        AddAssociation = "add_association",
        /// [`Gateway::submit_validation_token`].
        SubmitToken = "submit_token",
    }
}

/// A message the simulated homeserver sent to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxMessage {
    /// Validation email. Following its link yields `(client_secret, sid)`.
    Email {
        /// Recipient address.
        to: String,
        /// Client secret embedded in the link.
        client_secret: String,
        /// Session id embedded in the link.
        sid: String,
    },
    /// Validation text message.
    Sms {
        /// Recipient number, international form.
        to: String,
        /// The code to type back.
        code: String,
    },
}

/// Knobs of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Delay applied to every request.
    pub latency: Duration,
    /// Value reported by [`Gateway::supports_rebind`].
    pub supports_rebind: bool,
    /// When `false`, identity-service requests fail with
    /// [`Error::Unavailable`].
    pub identity_service: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            supports_rebind: false,
            identity_service: true,
        }
    }
}

struct Session {
    three_pid: ThreePid,
    client_secret: String,
    code: Option<String>,
    validated: bool,
    /// Phone only: bind the number once its code is accepted.
    publish: bool,
}

#[derive(Default)]
struct Directory {
    associated: HashSet<ThreePid>,
    bound: HashSet<ThreePid>,
    /// Identifiers whose last removal also unbound them.
    unbound: HashSet<ThreePid>,
    sessions: HashMap<String, Session>,
    outbox: Vec<OutboxMessage>,
    failures: HashMap<Operation, Error>,
    calls: Vec<Operation>,
}

/// A [`Gateway`] backed by in-memory state.
pub struct MemoryGateway {
    config: Mutex<MemoryConfig>,
    dir: Mutex<Directory>,
}

impl fmt::Debug for MemoryGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = self.dir();
        f.debug_struct("MemoryGateway")
            .field("config", &self.config())
            .field("bound", &dir.bound.len())
            .field("sessions", &dir.sessions.len())
            .field("outbox", &dir.outbox.len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// An empty directory with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// An empty directory with `config`.
    #[must_use]
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config: Mutex::new(config),
            dir: Mutex::new(Directory::default()),
        }
    }

    /// Seed identifiers that are associated with the account and discoverable.
    #[must_use]
    pub fn with_bound(self, three_pids: impl IntoIterator<Item = ThreePid>) -> Self {
        {
            let mut dir = self.dir();
            for p in three_pids {
                dir.associated.insert(p.clone());
                dir.bound.insert(p);
            }
        }
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> MemoryConfig {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the configuration.
    pub fn set_config(&self, config: MemoryConfig) {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: Error) {
        self.dir().failures.insert(op, error);
    }

    /// Identifiers currently discoverable, sorted.
    #[must_use]
    pub fn bound(&self) -> Vec<ThreePid> {
        let mut v: Vec<_> = self.dir().bound.iter().cloned().collect();
        v.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        v
    }

    /// Everything sent so far, oldest first.
    #[must_use]
    pub fn outbox(&self) -> Vec<OutboxMessage> {
        self.dir().outbox.clone()
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.dir().calls.clone()
    }

    /// Simulate the user following the link of a validation email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Server`] if no email session matches.
    pub fn follow_email_link(&self, client_secret: &str, sid: &str) -> Result<()> {
        let mut dir = self.dir();
        let session = dir
            .sessions
            .get_mut(sid)
            .filter(|s| s.client_secret == client_secret && s.three_pid.medium == Medium::Email)
            .ok_or_else(|| no_session(sid))?;
        session.validated = true;
        debug!(%sid, "email link followed");
        Ok(())
    }

    fn dir(&self) -> MutexGuard<'_, Directory> {
        self.dir.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply latency, record the call and surface any injected failure.
    async fn enter(&self, op: Operation) -> Result<()> {
        let latency = self.config().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut dir = self.dir();
        dir.calls.push(op);
        dir.failures.remove(&op).map_or(Ok(()), Err)
    }

    fn require_identity_service(&self) -> Result<()> {
        if self.config().identity_service {
            Ok(())
        } else {
            Err(Error::Unavailable(Collaborator::IdentityService))
        }
    }

    fn open_session(&self, three_pid: ThreePid, client_secret: &str, code: Option<String>) -> Result<String> {
        let sid = random_hex(8)?;
        let mut dir = self.dir();
        let publish = code.is_some() && !dir.unbound.remove(&three_pid);
        dir.sessions.insert(
            sid.clone(),
            Session {
                three_pid,
                client_secret: client_secret.to_owned(),
                code,
                validated: false,
                publish,
            },
        );
        Ok(sid)
    }
}

fn no_session(sid: &str) -> Error {
    Error::server("M_NO_VALID_SESSION", format!("no validation session {sid}"))
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn lookup_discoverability(&self, three_pid: &ThreePid) -> Result<bool> {
        self.enter(Operation::Lookup).await?;
        self.require_identity_service()?;
        Ok(self.dir().bound.contains(three_pid))
    }

    async fn remove_association(&self, address: &str, medium: Medium) -> Result<()> {
        self.enter(Operation::RemoveAssociation).await?;
        let key = ThreePid {
            address: address.to_owned(),
            medium,
        };
        let mut dir = self.dir();
        dir.associated.remove(&key);
        if dir.bound.remove(&key) {
            dir.unbound.insert(key);
        } else {
            dir.unbound.remove(&key);
        }
        Ok(())
    }

    async fn request_email_token(
        &self,
        address: &str,
        client_secret: &str,
        _send_attempt: u32,
    ) -> Result<Option<String>> {
        self.enter(Operation::RequestEmailToken).await?;
        let three_pid = ThreePid::email(address)?;
        let sid = self.open_session(three_pid, client_secret, None)?;
        self.dir().outbox.push(OutboxMessage::Email {
            to: address.to_owned(),
            client_secret: client_secret.to_owned(),
            sid: sid.clone(),
        });
        Ok(Some(sid))
    }

    async fn request_phone_token(
        &self,
        phone_number: &str,
        client_secret: &str,
        _send_attempt: u32,
    ) -> Result<PhoneTokenResponse> {
        self.enter(Operation::RequestPhoneToken).await?;
        let three_pid = ThreePid::msisdn(phone_number)?;
        let msisdn = three_pid.address.clone();
        let code = random_code(SMS_CODE_DIGITS)?;
        let sid = self.open_session(three_pid, client_secret, Some(code.clone()))?;
        self.dir().outbox.push(OutboxMessage::Sms {
            to: phone_number.to_owned(),
            code,
        });
        Ok(PhoneTokenResponse {
            sid: Some(sid),
            msisdn: Some(msisdn),
        })
    }

    async fn add_association(&self, sid: &str, client_secret: &str, bind: bool) -> Result<()> {
        self.enter(Operation::AddAssociation).await?;
        let mut dir = self.dir();
        let session = dir
            .sessions
            .get(sid)
            .filter(|s| s.client_secret == client_secret)
            .ok_or_else(|| no_session(sid))?;
        if !session.validated {
            return Err(Error::server(
                "M_THREEPID_AUTH_FAILED",
                "identifier ownership has not been validated",
            ));
        }
        let three_pid = session.three_pid.clone();
        dir.sessions.remove(sid);
        dir.associated.insert(three_pid.clone());
        if bind {
            dir.bound.insert(three_pid);
        } else {
            dir.bound.remove(&three_pid);
        }
        Ok(())
    }

    async fn submit_validation_token(
        &self,
        code: &str,
        medium: Medium,
        client_secret: &str,
        sid: &str,
    ) -> Result<()> {
        self.enter(Operation::SubmitToken).await?;
        self.require_identity_service()?;
        let mut dir = self.dir();
        let session = dir
            .sessions
            .get_mut(sid)
            .filter(|s| s.client_secret == client_secret && s.three_pid.medium == medium)
            .ok_or_else(|| no_session(sid))?;
        if session.code.as_deref() != Some(code) {
            return Err(Error::server("M_THREEPID_AUTH_FAILED", "incorrect validation code"));
        }
        session.validated = true;
        let published = session.publish.then(|| session.three_pid.clone());
        if let Some(three_pid) = published {
            debug!(%three_pid, "phone number published");
            dir.associated.insert(three_pid.clone());
            dir.bound.insert(three_pid);
        }
        Ok(())
    }

    fn supports_rebind(&self) -> bool {
        self.config().supports_rebind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ThreePid {
        ThreePid::parse("alice@example.com").unwrap()
    }

    #[tokio::test]
    async fn seeded_identifiers_are_discoverable() {
        let gw = MemoryGateway::new().with_bound([alice()]);
        assert!(gw.lookup_discoverability(&alice()).await.unwrap());
        gw.remove_association("alice@example.com", Medium::Email)
            .await
            .unwrap();
        assert!(!gw.lookup_discoverability(&alice()).await.unwrap());
    }

    #[tokio::test]
    async fn email_session_needs_link_before_association() {
        let gw = MemoryGateway::new();
        let sid = gw
            .request_email_token("alice@example.com", "secret", 1)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            gw.add_association(&sid, "secret", true).await,
            Err(Error::Server { .. })
        ));
        assert!(gw.follow_email_link("wrong", &sid).is_err());
        gw.follow_email_link("secret", &sid).unwrap();
        gw.add_association(&sid, "secret", true).await.unwrap();
        assert_eq!(gw.bound(), vec![alice()]);
    }

    #[tokio::test]
    async fn sms_code_validates_phone_session() {
        let gw = MemoryGateway::new();
        let resp = gw
            .request_phone_token("+447700900123", "secret", 1)
            .await
            .unwrap();
        assert_eq!(resp.msisdn.as_deref(), Some("447700900123"));
        let sid = resp.sid.unwrap();
        let Some(OutboxMessage::Sms { code, .. }) = gw.outbox().pop() else {
            panic!("no sms sent");
        };
        assert!(
            gw.submit_validation_token("000000x", Medium::Msisdn, "secret", &sid)
                .await
                .is_err()
        );
        gw.submit_validation_token(&code, Medium::Msisdn, "secret", &sid)
            .await
            .unwrap();
        assert_eq!(gw.bound()[0].address, "447700900123");
    }

    #[tokio::test]
    async fn sms_code_after_unbinding_removal_keeps_number_private() {
        let number = ThreePid::parse("+447700900123").unwrap();
        let gw = MemoryGateway::new().with_bound([number.clone()]);
        gw.remove_association(&number.address, Medium::Msisdn)
            .await
            .unwrap();
        let sid = gw
            .request_phone_token("+447700900123", "secret", 1)
            .await
            .unwrap()
            .sid
            .unwrap();
        let Some(OutboxMessage::Sms { code, .. }) = gw.outbox().pop() else {
            panic!("no sms sent");
        };

        gw.submit_validation_token(&code, Medium::Msisdn, "secret", &sid)
            .await
            .unwrap();

        assert!(gw.bound().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let gw = MemoryGateway::new();
        gw.fail_next(Operation::Lookup, Error::Network("timeout".into()));
        assert_eq!(
            gw.lookup_discoverability(&alice()).await,
            Err(Error::Network("timeout".into()))
        );
        assert_eq!(gw.lookup_discoverability(&alice()).await, Ok(false));
        assert_eq!(gw.calls(), vec![Operation::Lookup, Operation::Lookup]);
    }

    #[tokio::test]
    async fn missing_identity_service_is_reported() {
        let gw = MemoryGateway::with_config(MemoryConfig {
            identity_service: false,
            ..MemoryConfig::default()
        });
        assert_eq!(
            gw.lookup_discoverability(&alice()).await,
            Err(Error::Unavailable(Collaborator::IdentityService))
        );
    }
}
