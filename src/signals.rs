//! SIGINT/SIGTERM turn into a regular exit request

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use tracing::info;

use crate::types::AppCommand;

/// Post [`AppCommand::Exit`] for every termination signal until the UI goes away
pub fn spawn_listener(
    commands: Sender<AppCommand>,
    wake: impl Fn() + Send + 'static,
) -> Result<JoinHandle<()>> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                info!(signal, "Termination signal received, shutting down");
                if commands.send(AppCommand::Exit).is_err() {
                    break;
                }
                wake();
            }
        })
        .context("Failed to spawn signal listener thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_sigterm_posts_exit() {
        let (tx, rx) = mpsc::channel();
        let _handle = spawn_listener(tx, || {}).unwrap();

        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(AppCommand::Exit));
    }
}
