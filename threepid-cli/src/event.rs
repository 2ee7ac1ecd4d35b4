//! Event types, command types, and the terminal poller.
//!
//! The main thread only handles UI rendering and key input. Every flow lives
//! on the worker's tokio runtime.
//!
//! - App key handling → `CmdTx` → Worker (via [`Cmd::Action`], [`Cmd::FollowLink`])
//! - Flow subscriptions and worker results → `Tx` → Main thread

use std::sync::mpsc;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use threepid::{OutboxMessage, ViewAction, ViewState};

/// Event sender (terminal poller + worker → main thread).
pub type Tx = mpsc::Sender<Event>;

/// Command sender (App → worker thread). The worker exits once it is dropped.
pub type CmdTx = mpsc::Sender<Cmd>;

/// Events consumed by the main loop.
#[derive(Debug)]
pub enum Event {
    /// Terminal key press.
    Key(KeyEvent),
    /// Terminal resize.
    Resize,
    /// Periodic tick (~50 ms).
    Tick,
    /// A flow published a new view state.
    State { index: usize, state: ViewState },
    /// Worker: messages the simulated server has sent so far.
    Outbox(Vec<OutboxMessage>),
    /// Worker: flash status message.
    Flash(String),
}

/// Commands sent to the worker thread.
#[derive(Debug)]
pub enum Cmd {
    /// Dispatch an action to the flow of identifier `index`.
    Action { index: usize, action: ViewAction },
    /// Follow the link of the latest validation email for identifier `index`.
    FollowLink(usize),
}

/// Spawn the terminal-polling thread. Sends [`Event::Key`], [`Event::Resize`], [`Event::Tick`].
pub fn spawn_poller(tx: Tx, tick: Duration) {
    std::thread::spawn(move || {
        loop {
            let ok = match event::poll(tick) {
                Ok(true) => event::read().map_or(Ok(()), |ev| match ev {
                    CtEvent::Key(k) if k.kind == KeyEventKind::Press => tx.send(Event::Key(k)),
                    CtEvent::Resize(_, _) => tx.send(Event::Resize),
                    _ => Ok(()),
                }),
                Ok(false) => tx.send(Event::Tick),
                Err(_) => break,
            };
            if ok.is_err() {
                break;
            }
        }
    });
}
