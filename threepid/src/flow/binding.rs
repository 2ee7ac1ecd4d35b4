//! Share / revoke: drop the current association and request a validation
//! token for the new one.

use tracing::{debug, info};

use super::{Inner, Ticket};
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::identifier::international_format;
use crate::secret::generate_client_secret;
use crate::types::{DisplayMode, Medium, PendingValidation, ViewState};

/// Every request mints a new client secret, so this is always the first send.
const SEND_ATTEMPT: u32 = 1;

impl<G: Gateway> Inner<G> {
    pub(super) async fn request_binding(&self, bind: bool) -> Result<()> {
        let ticket = self.begin_exclusive()?;
        debug!(three_pid = %self.three_pid, bind, "binding requested");

        match self.binding_steps(ticket, bind).await {
            Ok(Some((pending, mode))) => {
                info!(three_pid = %self.three_pid, sid = %pending.sid, bind, "validation token sent");
                self.finish(ticket, ViewState::Loaded(mode), Some(pending));
            }
            Ok(None) => {}
            Err(e) => self.fail(ticket, e),
        }
        Ok(())
    }

    /// Returns `None` if the operation went stale between requests.
    async fn binding_steps(
        &self,
        ticket: Ticket,
        bind: bool,
    ) -> Result<Option<(PendingValidation, DisplayMode)>> {
        if self.gateway.supports_rebind() {
            // TODO: replace the association in one call once the rebind
            // endpoint is wired into `Gateway`.
            return Err(Error::NotImplemented("atomic 3PID rebind"));
        }

        let address = &self.three_pid.address;
        self.gateway
            .remove_association(address, self.three_pid.medium)
            .await?;
        if !self.is_current(ticket) {
            return Ok(None);
        }

        let client_secret = generate_client_secret()?;
        let (sid, mode) = match self.three_pid.medium {
            Medium::Email => {
                let sid = self
                    .gateway
                    .request_email_token(address, &client_secret, SEND_ATTEMPT)
                    .await?;
                (sid, DisplayMode::CancelEmailValidation)
            }
            Medium::Msisdn => {
                let number = international_format(address);
                let resp = self
                    .gateway
                    .request_phone_token(&number, &client_secret, SEND_ATTEMPT)
                    .await?;
                if let Some(msisdn) = &resp.msisdn {
                    debug!(%msisdn, "server reported canonical msisdn");
                }
                (resp.sid, DisplayMode::EnterSmsCode)
            }
        };
        let sid = sid.filter(|s| !s.is_empty()).ok_or(Error::Unknown)?;

        Ok(Some((
            PendingValidation {
                client_secret,
                sid,
                bind,
            },
            mode,
        )))
    }
}
