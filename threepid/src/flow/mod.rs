//! The discoverability workflow for a single third-party identifier.
//!
//! A [`DiscoveryFlow`] owns one [`ThreePid`], issues requests through a
//! [`Gateway`], and publishes [`ViewState`] snapshots to at most one
//! [`Subscription`]. All outcomes of the workflow are published; the `Result`
//! returned by each operation only reports dispatch-level rejections.
//!
//! Every operation takes a ticket (a generation number) when it starts.
//! `load` and `cancel_email_validation` supersede whatever is in flight;
//! `share`, `revoke`, code submission and email validation are exclusive and
//! are rejected with [`Error::AlreadyInProgress`] while a request is running.
//! A continuation whose ticket is no longer current is dropped silently.

mod binding;
mod validation;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::identifier::ThreePid;
use crate::stream::{self, Subscription};
use crate::types::{DisplayMode, PendingValidation, ViewAction, ViewState};

pub use validation::EmailValidationHandle;

/// Discoverability / binding workflow for one [`ThreePid`].
///
/// Cloning is cheap and yields another handle to the same flow, so several
/// tasks may dispatch actions concurrently.
pub struct DiscoveryFlow<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for DiscoveryFlow<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G> fmt::Debug for DiscoveryFlow<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.lock();
        f.debug_struct("DiscoveryFlow")
            .field("three_pid", &self.inner.three_pid)
            .field("current", &st.current)
            .field("in_flight", &st.in_flight)
            .field("pending", &st.pending.is_some())
            .finish_non_exhaustive()
    }
}

struct Inner<G> {
    gateway: G,
    three_pid: ThreePid,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    generation: u64,
    in_flight: bool,
    pending: Option<PendingValidation>,
    current: Option<ViewState>,
    subscriber: Option<mpsc::UnboundedSender<ViewState>>,
}

impl State {
    /// Push `state` to the subscriber and make it current.
    ///
    /// A pending request only survives while the published state awaits
    /// validation.
    fn publish(&mut self, state: ViewState) {
        if !state.awaits_validation() {
            self.pending = None;
        }
        if let Some(tx) = &self.subscriber
            && tx.send(state.clone()).is_err()
        {
            debug!("subscriber gone, dropping it");
            self.subscriber = None;
        }
        self.current = Some(state);
    }

    fn next_ticket(&mut self) -> Ticket {
        self.generation += 1;
        self.in_flight = true;
        Ticket(self.generation)
    }
}

/// Generation captured by an operation when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket(u64);

impl<G: Gateway + 'static> DiscoveryFlow<G> {
    /// Create a flow for `three_pid`. Nothing is requested until an action is
    /// dispatched.
    pub fn new(gateway: G, three_pid: ThreePid) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                three_pid,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Dispatch a view action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInProgress`] or [`Error::NoPendingValidation`]
    /// when the action is rejected; nothing is published in that case.
    pub async fn process(&self, action: ViewAction) -> Result<()> {
        match action {
            ViewAction::Load => {
                self.load().await;
                Ok(())
            }
            ViewAction::Share => self.share().await,
            ViewAction::Revoke => self.revoke().await,
            ViewAction::CancelEmailValidation => {
                self.cancel_email_validation().await;
                Ok(())
            }
            ViewAction::EnterSmsCode(code) => self.submit_code(&code).await,
        }
    }

    /// Publish `Loading`, then the discoverability-derived state.
    pub async fn load(&self) {
        let ticket = self.inner.begin_superseding();
        self.inner.check_discoverability(ticket).await;
    }

    /// Make the identifier discoverable (bind).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInProgress`] if a request is in flight.
    pub async fn share(&self) -> Result<()> {
        self.inner.request_binding(true).await
    }

    /// Stop the identifier being discoverable (unbind).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInProgress`] if a request is in flight.
    pub async fn revoke(&self) -> Result<()> {
        self.inner.request_binding(false).await
    }

    /// Forget the pending request and re-check discoverability. A later
    /// confirmation for the forgotten request is ignored.
    pub async fn cancel_email_validation(&self) {
        let ticket = self.inner.begin_superseding();
        debug!(three_pid = %self.inner.three_pid, "email validation cancelled");
        self.inner.check_discoverability(ticket).await;
    }

    /// Validate the pending phone request with the code received by SMS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a blank code,
    /// [`Error::NoPendingValidation`] if no phone request is pending, or
    /// [`Error::AlreadyInProgress`] if a request is in flight.
    pub async fn submit_code(&self, code: &str) -> Result<()> {
        self.inner.submit_code(code).await
    }

    /// Deliver an out-of-band email confirmation.
    ///
    /// Returns `true` if it matched the pending request and was consumed.
    pub async fn on_email_validated(&self, client_secret: &str, sid: &str) -> bool {
        self.inner.on_email_validated(client_secret, sid).await
    }

    /// A weak callback for whatever observes email confirmation links.
    #[must_use]
    pub fn email_validation_handle(&self) -> EmailValidationHandle {
        EmailValidationHandle::new(&self.inner)
    }
}

impl<G> DiscoveryFlow<G> {
    /// Subscribe to published view states.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySubscribed`] while another subscription is
    /// alive.
    pub fn subscribe(&self) -> Result<Subscription<ViewState>> {
        let mut st = self.inner.lock();
        if st.subscriber.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(Error::AlreadySubscribed);
        }
        let (tx, sub) = stream::channel();
        st.subscriber = Some(tx);
        Ok(sub)
    }

    /// The identifier this flow manages.
    #[must_use]
    pub fn three_pid(&self) -> &ThreePid {
        &self.inner.three_pid
    }

    /// The collaborator requests go through.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    /// The last published state, if any.
    #[must_use]
    pub fn current(&self) -> Option<ViewState> {
        self.inner.lock().current.clone()
    }

    /// The request awaiting validation, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PendingValidation> {
        self.inner.lock().pending.clone()
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.lock().in_flight
    }
}

impl<G> Inner<G> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a ticket and publish `Loading`, unless a request is in flight.
    fn begin_exclusive(&self) -> Result<Ticket> {
        let mut st = self.lock();
        if st.in_flight {
            return Err(Error::AlreadyInProgress);
        }
        let ticket = st.next_ticket();
        st.publish(ViewState::Loading);
        Ok(ticket)
    }

    /// Take a ticket and publish `Loading`; anything in flight goes stale.
    fn begin_superseding(&self) -> Ticket {
        let mut st = self.lock();
        let ticket = st.next_ticket();
        st.publish(ViewState::Loading);
        ticket
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.lock().generation == ticket.0
    }

    /// Publish the final state of the operation holding `ticket`, storing
    /// `pending` first. Returns `false` if the operation was superseded.
    fn finish(&self, ticket: Ticket, state: ViewState, pending: Option<PendingValidation>) -> bool {
        let mut st = self.lock();
        if st.generation != ticket.0 {
            debug!(
                three_pid = %self.three_pid,
                ticket = ticket.0,
                current = st.generation,
                "dropping stale result"
            );
            return false;
        }
        st.in_flight = false;
        st.pending = pending;
        st.publish(state);
        true
    }

    /// Publish `error` as the outcome of `ticket`; stale failures are only
    /// traced at debug level by [`finish`](Self::finish).
    fn fail(&self, ticket: Ticket, error: Error) {
        let message = error.to_string();
        if self.finish(ticket, ViewState::Error(error), None) {
            warn!(three_pid = %self.three_pid, error = %message, "request failed");
        }
    }
}

impl<G: Gateway> Inner<G> {
    async fn check_discoverability(&self, ticket: Ticket) {
        match self.gateway.lookup_discoverability(&self.three_pid).await {
            Ok(discoverable) => {
                debug!(three_pid = %self.three_pid, discoverable, "lookup finished");
                let mode = DisplayMode::from_discoverable(discoverable);
                self.finish(ticket, ViewState::Loaded(mode), None);
            }
            Err(e) => self.fail(ticket, e),
        }
    }
}
