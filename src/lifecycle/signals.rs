//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM (Ctrl+C elsewhere)
//! - Forward them into a buffered channel owned by the running server
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The channel holds one pending signal; further signals are dropped until
//!   the caller receives it
//! - A signal is advisory: nothing is stopped until the caller acts on it

use std::fmt;
use std::io;

use tokio::sync::mpsc;

/// Termination request delivered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Receiving end of the termination channel.
#[derive(Debug)]
pub struct TerminationSignals {
    tx: mpsc::Sender<Signal>,
    rx: mpsc::Receiver<Signal>,
}

impl TerminationSignals {
    /// Subscribe to OS termination signals.
    ///
    /// Must be called from within a Tokio runtime. The subscription lives as
    /// long as the process.
    pub fn listen() -> io::Result<Self> {
        let signals = Self::detached();
        spawn_forwarder(signals.tx.clone())?;
        Ok(signals)
    }

    /// A channel that only receives signals sent through
    /// [`TerminationSignals::notifier`].
    pub fn detached() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    /// Sender for injecting a signal by hand.
    pub fn notifier(&self) -> mpsc::Sender<Signal> {
        self.tx.clone()
    }

    /// Wait for the next signal.
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }
}

fn deliver(tx: &mpsc::Sender<Signal>, signal: Signal) -> bool {
    tracing::info!(signal = %signal, "Termination signal received");
    match tx.try_send(signal) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!(signal = %signal, "Signal already pending, dropped");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(unix)]
fn spawn_forwarder(tx: mpsc::Sender<Signal>) -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => Signal::Interrupt,
                Some(()) = terminate.recv() => Signal::Terminate,
                else => break,
            };
            if !deliver(&tx, received) {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_forwarder(tx: mpsc::Sender<Signal>) -> io::Result<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                break;
            }
            if !deliver(&tx, Signal::Interrupt) {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notifier_delivers() {
        let mut signals = TerminationSignals::detached();
        signals.notifier().send(Signal::Terminate).await.unwrap();
        assert_eq!(signals.recv().await, Some(Signal::Terminate));
    }

    #[tokio::test]
    async fn test_one_pending_signal() {
        let signals = TerminationSignals::detached();
        let tx = signals.notifier();
        assert!(deliver(&tx, Signal::Interrupt));
        assert!(deliver(&tx, Signal::Terminate));

        let mut signals = signals;
        assert_eq!(signals.recv().await, Some(Signal::Interrupt));
        assert!(signals.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_channel_stops_forwarding() {
        let signals = TerminationSignals::detached();
        let tx = signals.notifier();
        drop(signals);
        assert!(!deliver(&tx, Signal::Interrupt));
    }
}
