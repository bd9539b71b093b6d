//! Signal handling for graceful shutdown.
//!
//! Termination signals (SIGINT/SIGTERM on Unix, Ctrl+C on Windows) and the end
//! of interactive input both funnel into one [`ShutdownSignal`] that the
//! application waits on.

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// Cloneable one-shot shutdown trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: watch::Sender<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Requests shutdown. Later calls have no effect.
    pub fn trigger(&self, reason: &str) {
        if !self.sender.send_replace(true) {
            info!("🛑 Shutdown requested: {}", reason);
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

/// Waits for a termination signal and logs it.
pub async fn wait_for_termination() -> Result<(), Box<dyn std::error::Error>> {
    wait_for_termination_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

pub async fn wait_for_termination_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
