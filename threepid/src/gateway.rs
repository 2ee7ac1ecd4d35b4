//! The session / identity-service boundary the flow talks to.
//!
//! [`Gateway`] groups the handful of homeserver and identity-server requests
//! the discoverability workflow needs. Implement it over a real Matrix SDK
//! session, or use [`MemoryGateway`](crate::MemoryGateway) for a simulation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifier::ThreePid;
use crate::types::Medium;

/// Response to a phone-number token request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneTokenResponse {
    /// Validation session id. `None` if the server omitted it.
    pub sid: Option<String>,
    /// Canonical msisdn the server sent the SMS to, if reported.
    pub msisdn: Option<String>,
}

/// Asynchronous requests against the homeserver and the identity service.
///
/// Errors are surfaced to the flow's subscriber unmodified, so implementations
/// should map transport failures to [`Error::Network`](crate::Error::Network),
/// server rejections to [`Error::Server`](crate::Error::Server), and a missing
/// REST client or identity service to
/// [`Error::Unavailable`](crate::Error::Unavailable).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Whether `three_pid` is currently discoverable on the identity server.
    async fn lookup_discoverability(&self, three_pid: &ThreePid) -> Result<bool>;

    /// Remove the association of `address` from the account.
    async fn remove_association(&self, address: &str, medium: Medium) -> Result<()>;

    /// Ask the homeserver to email a validation link. Returns the session id.
    async fn request_email_token(
        &self,
        address: &str,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<Option<String>>;

    /// Ask the homeserver to text a validation code to `phone_number`
    /// (international form, leading `+`).
    async fn request_phone_token(
        &self,
        phone_number: &str,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<PhoneTokenResponse>;

    /// Add the validated identifier to the account, binding it on the identity
    /// server when `bind` is `true`.
    async fn add_association(&self, sid: &str, client_secret: &str, bind: bool) -> Result<()>;

    /// Submit a validation token (SMS code) to the identity service.
    async fn submit_validation_token(
        &self,
        code: &str,
        medium: Medium,
        client_secret: &str,
        sid: &str,
    ) -> Result<()>;

    /// Whether the homeserver can replace an association in one call.
    fn supports_rebind(&self) -> bool;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn lookup_discoverability(&self, three_pid: &ThreePid) -> Result<bool> {
        (**self).lookup_discoverability(three_pid).await
    }

    async fn remove_association(&self, address: &str, medium: Medium) -> Result<()> {
        (**self).remove_association(address, medium).await
    }

    async fn request_email_token(
        &self,
        address: &str,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<Option<String>> {
        (**self)
            .request_email_token(address, client_secret, send_attempt)
            .await
    }

    async fn request_phone_token(
        &self,
        phone_number: &str,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<PhoneTokenResponse> {
        (**self)
            .request_phone_token(phone_number, client_secret, send_attempt)
            .await
    }

    async fn add_association(&self, sid: &str, client_secret: &str, bind: bool) -> Result<()> {
        (**self).add_association(sid, client_secret, bind).await
    }

    async fn submit_validation_token(
        &self,
        code: &str,
        medium: Medium,
        client_secret: &str,
        sid: &str,
    ) -> Result<()> {
        (**self)
            .submit_validation_token(code, medium, client_secret, sid)
            .await
    }

    fn supports_rebind(&self) -> bool {
        (**self).supports_rebind()
    }
}
