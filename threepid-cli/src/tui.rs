//! Terminal setup and teardown.
//!
//! [`enter`] switches to raw mode and the alternate screen and hands back a
//! [`Restore`] guard. The terminal is put back when the guard drops, and by
//! the panic hook if the process panics first.

use std::io::{self, Stdout, stdout};
use std::panic;
use std::sync::Once;

use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::ExecutableCommand as _;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

static PANIC_HOOK: Once = Once::new();

/// Restores the terminal when dropped.
#[must_use = "the terminal is restored as soon as the guard drops"]
pub struct Restore(());

impl Drop for Restore {
    fn drop(&mut self) {
        let _ = restore();
    }
}

/// Enter raw mode and the alternate screen.
pub fn enter() -> io::Result<(Tui, Restore)> {
    PANIC_HOOK.call_once(|| {
        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let _ = restore();
            prev(info);
        }));
    });
    enable_raw_mode()?;
    let guard = Restore(());
    stdout().execute(EnterAlternateScreen)?;
    Ok((Terminal::new(CrosstermBackend::new(stdout()))?, guard))
}

fn restore() -> io::Result<()> {
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()
}
