// ============================================================================
// Sweep Worker
// Dedicated background thread driving the periodic matching sweep
// ============================================================================

use crate::engine::MatchingEngine;
use crossbeam::channel::{bounded, tick, Sender};
use crossbeam::select;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Handle to the background sweep thread.
///
/// The worker runs [`MatchingEngine::run_matching_sweep`] at the configured
/// interval until stopped or dropped. Sweeps never overlap: one thread owns
/// the loop, and each pass finishes before the next tick is honored.
pub struct SweepWorker {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SweepWorker {
    /// Stop the worker and wait for the in-flight sweep to finish
    pub fn stop(mut self) {
        self.signal_and_join();
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    fn signal_and_join(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SweepWorker {
    fn drop(&mut self) {
        self.signal_and_join();
    }
}

impl MatchingEngine {
    /// Spawn the dedicated sweep thread for this engine.
    ///
    /// Callers own the returned handle; dropping it stops the worker. More
    /// than one worker on the same engine is safe but pointless, since each
    /// book serializes its own matching.
    pub fn start_sweeper(self: &Arc<Self>) -> SweepWorker {
        let engine = Arc::clone(self);
        let (shutdown, shutdown_rx) = bounded::<()>(1);
        let interval = self.config().sweep_interval;

        let handle = std::thread::spawn(move || {
            tracing::debug!(?interval, "sweep worker started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        engine.run_matching_sweep();
                    },
                    recv(shutdown_rx) -> _ => {
                        tracing::debug!("sweep worker stopping");
                        break;
                    },
                }
            }
        });

        SweepWorker {
            shutdown,
            handle: Some(handle),
        }
    }
}
