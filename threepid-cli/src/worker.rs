//! Worker thread: owns the tokio runtime, the gateway and one flow per
//! identifier.
//!
//! The main thread sends [`Cmd`] requests; the worker spawns them onto the
//! runtime and sends [`Event`] results back. Each flow's subscription is
//! drained by its own task, so view states reach the UI as they are published.
//! The worker returns once the UI drops its command sender.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

use threepid::{DiscoveryFlow, MemoryGateway, OutboxMessage, ThreePid, ViewAction};
use tokio::runtime::Runtime;

use crate::cmd::config;
use crate::event::{Cmd, Event, Tx};

type Flow = DiscoveryFlow<Arc<MemoryGateway>>;

/// Run the worker loop: subscribe to every flow, load them all, then process
/// [`Cmd`] until the UI hangs up.
#[allow(clippy::needless_pass_by_value)]
pub fn run(
    rx: mpsc::Receiver<Cmd>,
    tx: Tx,
    profile: String,
    three_pids: Vec<ThreePid>,
    gateway: Arc<MemoryGateway>,
) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = tx.send(Event::Flash(format!("Fatal: {e}")));
            return;
        }
    };

    let w = Worker {
        rt,
        flows: three_pids
            .into_iter()
            .map(|p| DiscoveryFlow::new(Arc::clone(&gateway), p))
            .collect(),
        settle: Arc::new(Settle {
            bound: Mutex::new(gateway.bound()),
            gateway: Arc::clone(&gateway),
            tx: tx.clone(),
            profile,
        }),
        gateway,
        tx,
    };
    w.start_streams();
    for index in 0..w.flows.len() {
        w.dispatch(Cmd::Action {
            index,
            action: ViewAction::Load,
        });
    }

    while let Ok(cmd) = rx.recv() {
        w.dispatch(cmd);
    }
}

struct Worker {
    rt: Runtime,
    gateway: Arc<MemoryGateway>,
    flows: Vec<Flow>,
    settle: Arc<Settle>,
    tx: Tx,
}

impl Worker {
    /// Forward every flow's published states to the UI.
    fn start_streams(&self) {
        for (index, flow) in self.flows.iter().enumerate() {
            match flow.subscribe() {
                Ok(mut sub) => {
                    let tx = self.tx.clone();
                    self.rt.spawn(async move {
                        while let Some(state) = sub.recv().await {
                            if tx.send(Event::State { index, state }).is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(e) => self.flash(&format!("{}: {e}", flow.three_pid())),
            }
        }
    }

    fn dispatch(&self, cmd: Cmd) {
        match cmd {
            Cmd::Action { index, action } => self.action(index, action),
            Cmd::FollowLink(index) => self.follow_link(index),
        }
    }

    fn action(&self, index: usize, action: ViewAction) {
        let Some(flow) = self.flows.get(index).cloned() else {
            return;
        };
        let tx = self.tx.clone();
        let settle = Arc::clone(&self.settle);
        self.rt.spawn(async move {
            let label = action_label(&action);
            if let Err(e) = flow.process(action).await {
                let _ = tx.send(Event::Flash(format!("{label}: {e}")));
            }
            settle.run();
        });
    }

    /// Simulate the user clicking the link of the validation email, then let
    /// the flow know.
    fn follow_link(&self, index: usize) {
        let Some(flow) = self.flows.get(index) else {
            return;
        };
        let Some(pending) = flow.pending() else {
            self.flash("Nothing awaiting validation");
            return;
        };
        let address = &flow.three_pid().address;
        let found = self.gateway.outbox().into_iter().rev().find_map(|m| match m {
            OutboxMessage::Email {
                to,
                client_secret,
                sid,
            } if to == *address && client_secret == pending.client_secret => {
                Some((client_secret, sid))
            }
            _ => None,
        });
        let Some((client_secret, sid)) = found else {
            self.flash("No validation email for this address");
            return;
        };
        if let Err(e) = self.gateway.follow_email_link(&client_secret, &sid) {
            self.flash(&format!("Link: {e}"));
            return;
        }

        let handle = flow.email_validation_handle();
        let tx = self.tx.clone();
        let settle = Arc::clone(&self.settle);
        self.rt.spawn(async move {
            if !handle.deliver(&client_secret, &sid).await {
                let _ = tx.send(Event::Flash("Link ignored".into()));
            }
            settle.run();
        });
    }

    fn flash(&self, msg: &str) {
        let _ = self.tx.send(Event::Flash(msg.into()));
    }
}

/// Runs after every request: refreshes the outbox and persists the directory.
struct Settle {
    gateway: Arc<MemoryGateway>,
    /// Last persisted directory contents.
    bound: Mutex<Vec<ThreePid>>,
    tx: Tx,
    profile: String,
}

impl Settle {
    fn run(&self) {
        let _ = self.tx.send(Event::Outbox(self.gateway.outbox()));
        let mut saved = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        let bound = self.gateway.bound();
        if bound == *saved {
            return;
        }
        match config::save_directory(&self.profile, &bound) {
            Ok(()) => *saved = bound,
            Err(e) => {
                let _ = self.tx.send(Event::Flash(format!("Save: {e}")));
            }
        }
    }
}

const fn action_label(action: &ViewAction) -> &'static str {
    match action {
        ViewAction::Load => "Load",
        ViewAction::Share => "Share",
        ViewAction::Revoke => "Revoke",
        ViewAction::CancelEmailValidation => "Cancel",
        ViewAction::EnterSmsCode(_) => "Code",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use threepid::{DisplayMode, ViewState};

    use super::*;

    #[test]
    fn returns_once_ui_hangs_up() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (tx, rx) = mpsc::channel();
        let gateway = Arc::new(MemoryGateway::new());
        let three_pids = vec![ThreePid::parse("alice@example.com").unwrap()];
        let worker = std::thread::spawn(move || {
            run(cmd_rx, tx, "worker-test".into(), three_pids, gateway);
        });

        loop {
            if let Event::State {
                state: ViewState::Loaded(mode),
                ..
            } = rx.recv_timeout(Duration::from_secs(5)).unwrap()
            {
                assert_eq!(mode, DisplayMode::Share);
                break;
            }
        }

        drop(cmd_tx);
        worker.join().unwrap();
        // Every sender went away with the runtime.
        assert!(rx.iter().all(|ev| !matches!(ev, Event::Key(_))));
    }
}
