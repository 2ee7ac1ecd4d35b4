//! Scripted gateway shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use threepid::{Gateway, Medium, PhoneTokenResponse, Result, ThreePid, ViewState};
use tokio::sync::Notify;

pub const EMAIL_SID: &str = "sid-email";
pub const PHONE_SID: &str = "sid-phone";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Lookup,
    Remove,
    EmailToken,
    PhoneToken,
    Add,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Lookup(ThreePid),
    Remove {
        address: String,
        medium: Medium,
    },
    EmailToken {
        address: String,
        client_secret: String,
        send_attempt: u32,
    },
    PhoneToken {
        number: String,
        client_secret: String,
        send_attempt: u32,
    },
    Add {
        sid: String,
        client_secret: String,
        bind: bool,
    },
    Submit {
        code: String,
        medium: Medium,
        client_secret: String,
        sid: String,
    },
}

impl Call {
    pub const fn op(&self) -> Op {
        match self {
            Self::Lookup(_) => Op::Lookup,
            Self::Remove { .. } => Op::Remove,
            Self::EmailToken { .. } => Op::EmailToken,
            Self::PhoneToken { .. } => Op::PhoneToken,
            Self::Add { .. } => Op::Add,
            Self::Submit { .. } => Op::Submit,
        }
    }
}

/// Replies from queues (falling back to success) and records every call.
/// A held operation blocks its next call until its gate is notified.
#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<Call>>,
    lookups: Mutex<VecDeque<Result<bool>>>,
    removals: Mutex<VecDeque<Result<()>>>,
    email_tokens: Mutex<VecDeque<Result<Option<String>>>>,
    phone_tokens: Mutex<VecDeque<Result<PhoneTokenResponse>>>,
    additions: Mutex<VecDeque<Result<()>>>,
    submissions: Mutex<VecDeque<Result<()>>>,
    gates: Mutex<HashMap<Op, Arc<Notify>>>,
    rebind: AtomicBool,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_lookup(&self, r: Result<bool>) -> &Self {
        self.lookups.lock().unwrap().push_back(r);
        self
    }

    pub fn on_remove(&self, r: Result<()>) -> &Self {
        self.removals.lock().unwrap().push_back(r);
        self
    }

    pub fn on_email_token(&self, r: Result<Option<String>>) -> &Self {
        self.email_tokens.lock().unwrap().push_back(r);
        self
    }

    pub fn on_phone_token(&self, r: Result<PhoneTokenResponse>) -> &Self {
        self.phone_tokens.lock().unwrap().push_back(r);
        self
    }

    pub fn on_add(&self, r: Result<()>) -> &Self {
        self.additions.lock().unwrap().push_back(r);
        self
    }

    pub fn on_submit(&self, r: Result<()>) -> &Self {
        self.submissions.lock().unwrap().push_back(r);
        self
    }

    pub fn set_rebind(&self, v: bool) {
        self.rebind.store(v, Ordering::SeqCst);
    }

    /// Block the next call of `op` until the returned gate is notified.
    pub fn hold(&self, op: Op) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(op, Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls().iter().map(Call::op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.ops().into_iter().filter(|o| *o == op).count()
    }

    /// Yield until `op` has been called `n` times.
    pub async fn wait_for(&self, op: Op, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(op) < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("gateway call never arrived");
    }

    async fn enter(&self, call: Call) {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        let gate = self.gates.lock().unwrap().remove(&op);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>, default: impl FnOnce() -> T) -> Result<T> {
    queue.lock().unwrap().pop_front().unwrap_or_else(|| Ok(default()))
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn lookup_discoverability(&self, three_pid: &ThreePid) -> Result<bool> {
        let r = pop(&self.lookups, || false);
        self.enter(Call::Lookup(three_pid.clone())).await;
        r
    }

    async fn remove_association(&self, address: &str, medium: Medium) -> Result<()> {
        let r = pop(&self.removals, || ());
        self.enter(Call::Remove {
            address: address.to_owned(),
            medium,
        })
        .await;
        r
    }

    async fn request_email_token(
        &self,
        address: &str,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<Option<String>> {
        let r = pop(&self.email_tokens, || Some(EMAIL_SID.to_owned()));
        self.enter(Call::EmailToken {
            address: address.to_owned(),
            client_secret: client_secret.to_owned(),
            send_attempt,
        })
        .await;
        r
    }

    async fn request_phone_token(
        &self,
        phone_number: &str,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<PhoneTokenResponse> {
        let r = pop(&self.phone_tokens, || PhoneTokenResponse {
            sid: Some(PHONE_SID.to_owned()),
            msisdn: Some(phone_number.trim_start_matches('+').to_owned()),
        });
        self.enter(Call::PhoneToken {
            number: phone_number.to_owned(),
            client_secret: client_secret.to_owned(),
            send_attempt,
        })
        .await;
        r
    }

    async fn add_association(&self, sid: &str, client_secret: &str, bind: bool) -> Result<()> {
        let r = pop(&self.additions, || ());
        self.enter(Call::Add {
            sid: sid.to_owned(),
            client_secret: client_secret.to_owned(),
            bind,
        })
        .await;
        r
    }

    async fn submit_validation_token(
        &self,
        code: &str,
        medium: Medium,
        client_secret: &str,
        sid: &str,
    ) -> Result<()> {
        let r = pop(&self.submissions, || ());
        self.enter(Call::Submit {
            code: code.to_owned(),
            medium,
            client_secret: client_secret.to_owned(),
            sid: sid.to_owned(),
        })
        .await;
        r
    }

    fn supports_rebind(&self) -> bool {
        self.rebind.load(Ordering::SeqCst)
    }
}

/// Everything published so far.
pub fn drain(sub: &mut threepid::Subscription<ViewState>) -> Vec<ViewState> {
    std::iter::from_fn(|| sub.try_recv()).collect()
}

pub fn alice() -> ThreePid {
    ThreePid::parse("alice@example.com").unwrap()
}

pub fn phone() -> ThreePid {
    ThreePid::parse("+44 7700 900123").unwrap()
}
