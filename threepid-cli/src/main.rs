//! threepid: terminal client for 3PID discoverability settings.
//!
//! Architecture: **main thread = UI only**, **worker thread = tokio runtime
//! and every flow**. Flow subscriptions are drained on the runtime and reach
//! the UI as [`Event`]s, never blocking rendering.

#![allow(
    missing_docs,
    missing_debug_implementations,
    clippy::print_stderr,
    clippy::print_stdout
)]

mod app;
mod cmd;
mod event;
mod tui;
mod ui;
mod worker;

use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use threepid::Error;

use crate::app::App;
use crate::cmd::{Cli, Command, config, inspect, profile};
use crate::event::{Cmd, Event};

fn main() {
    if let Err(e) = run() {
        eprintln!("fatal: {e}");
        process::exit(1);
    }
}

fn run() -> threepid::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::New(args)) => profile::create(&args).map(drop),
        Some(Command::List) => profile::list(),
        Some(Command::Remove { name }) => profile::remove(&name),
        Some(Command::Clear) => profile::clear(),
        Some(Command::Default { name }) => profile::default(name.as_deref()),
        Some(Command::Info { profile, json }) => {
            threepid::init_logger(Some("warn"), None)?;
            let name = profile.unwrap_or_else(config::default_profile);
            inspect::info(&name, json)
        }
        None => {
            let name = cli.profile.unwrap_or_else(config::default_profile);
            run_tui(&name)
        }
    }
}

fn run_tui(profile: &str) -> threepid::Result<()> {
    let (cfg, gateway) = config::open(profile).map_err(|e| match e {
        Error::Io(_) => Error::InvalidArgument(format!(
            "profile '{profile}' not found; create it with `threepid new {profile} -t <email|phone>`"
        )),
        other => other,
    })?;
    threepid::init_logger(Some(&cfg.log), Some(&config::log_path(profile)))?;
    tracing::info!(%profile, identifiers = cfg.three_pids.len(), "session started");

    let (event_tx, event_rx) = mpsc::channel::<Event>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Cmd>();

    event::spawn_poller(event_tx.clone(), Duration::from_millis(50));

    let worker_profile = profile.to_owned();
    let three_pids = cfg.three_pids.clone();
    let worker = std::thread::spawn(move || {
        worker::run(cmd_rx, event_tx, worker_profile, three_pids, gateway);
    });

    let mut app = App::new(profile.to_owned(), cfg.three_pids, cmd_tx);

    let (mut terminal, _restore) = tui::enter().map_err(|e| Error::Io(format!("terminal: {e}")))?;

    while !app.quit {
        terminal
            .draw(|f| ui::render(&app, f))
            .map_err(|e| Error::Io(format!("render: {e}")))?;

        match event_rx.recv() {
            Ok(Event::Key(k)) => app.handle_key(k),
            Ok(Event::Tick) => app.tick(),
            Ok(Event::Resize) => {}
            Ok(ev) => app.apply(ev),
            Err(_) => break,
        }
    }
    drop(app);
    let _ = worker.join();
    Ok(())
}
