//! Completing a pending request: email confirmation links and SMS codes.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Inner, Ticket};
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::types::{Medium, PendingValidation, ViewState};

impl<G: Gateway> Inner<G> {
    pub(super) async fn on_email_validated(&self, client_secret: &str, sid: &str) -> bool {
        let (ticket, pending) = {
            let mut st = self.lock();
            if st.in_flight {
                debug!(three_pid = %self.three_pid, %sid, "ignoring email validation while busy");
                return false;
            }
            let Some(pending) = st.pending.take_if(|p| p.matches(client_secret, sid)) else {
                debug!(three_pid = %self.three_pid, %sid, "ignoring email validation for unknown request");
                return false;
            };
            let ticket = st.next_ticket();
            st.publish(ViewState::Loading);
            (ticket, pending)
        };

        match self
            .gateway
            .add_association(&pending.sid, &pending.client_secret, pending.bind)
            .await
        {
            Ok(()) => {
                info!(three_pid = %self.three_pid, bind = pending.bind, "association updated");
                self.recheck(ticket).await;
            }
            Err(e) => self.fail(ticket, e),
        }
        true
    }

    pub(super) async fn submit_code(&self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::InvalidArgument("validation code is empty".into()));
        }

        let (ticket, pending) = {
            let mut st = self.lock();
            if st.in_flight {
                return Err(Error::AlreadyInProgress);
            }
            let pending = match (&st.pending, self.three_pid.medium) {
                (Some(p), Medium::Msisdn) => p.clone(),
                _ => return Err(Error::NoPendingValidation),
            };
            (st.next_ticket(), pending)
        };

        let PendingValidation {
            client_secret, sid, ..
        } = &pending;
        match self
            .gateway
            .submit_validation_token(code, Medium::Msisdn, client_secret, sid)
            .await
        {
            Ok(()) => {
                info!(three_pid = %self.three_pid, %sid, "phone number validated");
                self.recheck(ticket).await;
            }
            Err(e) => self.fail(ticket, e),
        }
        Ok(())
    }

    async fn recheck(&self, ticket: Ticket) {
        if self.is_current(ticket) {
            self.check_discoverability(ticket).await;
        }
    }
}

#[async_trait]
trait EmailValidationTarget: Send + Sync {
    async fn validate(&self, client_secret: &str, sid: &str) -> bool;
}

#[async_trait]
impl<G: Gateway> EmailValidationTarget for Inner<G> {
    async fn validate(&self, client_secret: &str, sid: &str) -> bool {
        self.on_email_validated(client_secret, sid).await
    }
}

/// Delivers email confirmations straight into the flow that requested them.
///
/// Hand it to whatever observes validation links (deep-link router, mail
/// poller). It holds the flow weakly: once the flow is dropped, deliveries
/// resolve to `false`.
#[derive(Clone)]
pub struct EmailValidationHandle {
    target: Weak<dyn EmailValidationTarget>,
}

impl EmailValidationHandle {
    pub(super) fn new<G: Gateway + 'static>(inner: &Arc<Inner<G>>) -> Self {
        let target: Weak<Inner<G>> = Arc::downgrade(inner);
        Self { target }
    }

    /// Deliver a confirmation carrying `(client_secret, sid)`.
    ///
    /// Returns `true` if the flow is alive and the payload matched its
    /// pending request.
    pub async fn deliver(&self, client_secret: &str, sid: &str) -> bool {
        let Some(target) = self.target.upgrade() else {
            return false;
        };
        target.validate(client_secret, sid).await
    }

    /// Whether the flow behind this handle still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for EmailValidationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailValidationHandle")
            .field("is_alive", &self.is_alive())
            .finish()
    }
}
