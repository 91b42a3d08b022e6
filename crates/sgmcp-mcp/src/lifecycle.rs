//! Accepting → Draining lifecycle shared by every transport.
//!
//! The transition is one-way. Once draining, `search` and `search_prompt_guide`
//! fail with `service_unavailable` and `fetch_content` answers with empty text;
//! listeners keep running until the host stops the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct Lifecycle {
    draining: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the draining state. Returns `true` only for the call that made
    /// the transition.
    pub fn begin_drain(&self) -> bool {
        !self.draining.swap(true, Ordering::SeqCst)
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_draining() { "draining" } else { "ok" }
    }
}

/// Flip `lifecycle` to draining on SIGINT or SIGTERM. Runs until the runtime
/// shuts down; later signals are logged and otherwise ignored.
pub async fn watch_signals(lifecycle: Arc<Lifecycle>) {
    loop {
        let signal = match wait_for_signal().await {
            Ok(name) => name,
            Err(e) => {
                error!(error = %e, "Failed to install signal handler; draining disabled");
                return;
            }
        };

        if lifecycle.begin_drain() {
            info!(signal, "Received shutdown signal; draining");
        } else {
            warn!(signal, "Already draining; signal ignored");
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_accepting() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.is_draining());
        assert_eq!(lifecycle.status_label(), "ok");
    }

    #[test]
    fn drain_is_one_way_and_reported_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_drain());
        assert!(!lifecycle.begin_drain());
        assert!(lifecycle.is_draining());
        assert_eq!(lifecycle.status_label(), "draining");
    }

    #[test]
    fn concurrent_drains_transition_exactly_once() {
        let lifecycle = Arc::new(Lifecycle::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                std::thread::spawn(move || lifecycle.begin_drain())
            })
            .collect();
        let transitions = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|made_transition| *made_transition)
            .count();
        assert_eq!(transitions, 1);
        assert!(lifecycle.is_draining());
    }
}
