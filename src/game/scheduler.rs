//! Content Scheduler
//!
//! One periodic driver per running round. Each tick the round sweeps
//! expired content; every `ticks_per_placement`-th tick it places new content.
//!
//! Every `spawn` allocates its own shutdown channel, so a round that pauses
//! and resumes re-arms with a fresh cancellation scope instead of reusing
//! one that has already fired.

use std::future::Future;
use std::ops::ControlFlow;

use tokio::sync::broadcast;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error};

/// Result of one tick callback. `Break` stops the driver, for callers whose
/// owner has gone away.
pub type TickFlow = ControlFlow<()>;

/// Tick timing for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Time between ticks
    pub tick: Duration,
    /// Place new content every this many ticks
    pub ticks_per_placement: u32,
}

impl Cadence {
    /// Build a cadence.
    pub const fn new(tick: Duration, ticks_per_placement: u32) -> Self {
        Self {
            tick,
            ticks_per_placement,
        }
    }

    /// Is a placement due on tick number `tick` (1-based)?
    #[inline]
    pub fn placement_due(&self, tick: u64) -> bool {
        tick % u64::from(self.ticks_per_placement.max(1)) == 0
    }

    /// Time between placements.
    pub fn placement_interval(&self) -> Duration {
        self.tick * self.ticks_per_placement.max(1)
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), 4)
    }
}

/// Handle to a running periodic driver.
#[derive(Debug)]
pub struct ContentScheduler {
    shutdown_tx: broadcast::Sender<()>,
}

impl ContentScheduler {
    /// Spawn a driver calling `on_tick(n)` every `cadence.tick`, starting one
    /// period from now with `n = 1`.
    ///
    /// The callback's future runs to completion before the next tick or the
    /// cancel signal is looked at.
    pub fn spawn<F, Fut>(label: String, cadence: Cadence, mut on_tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let watched = label.clone();

        let driver = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + cadence.tick, cadence.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut tick: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        debug!("Scheduler {} cancelled after {} ticks", label, tick);
                        return;
                    }
                    _ = interval.tick() => {
                        tick += 1;
                        if on_tick(tick).await.is_break() {
                            debug!("Scheduler {} stopped by its owner after {} ticks", label, tick);
                            return;
                        }
                    }
                }
            }
        });

        tokio::spawn(async move {
            if let Err(e) = driver.await {
                if e.is_panic() {
                    error!("Scheduler {} stopped without being cancelled; the board has gone silent", watched);
                }
            }
        });

        Self { shutdown_tx }
    }

    /// Signal the driver to stop after its current tick.
    ///
    /// Safe to call from inside the tick callback and safe to repeat.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// The driver task holds the only receiver until it exits.
    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.shutdown_tx.receiver_count() == 0
    }
}
