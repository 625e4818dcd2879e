//! Layout stabilization: after anything that can change node geometry, a
//! short fixed cascade of recompute ticks absorbs the surface's late reflow.
//!
//! The scheduler is a cooperative timer queue. It never sleeps; the host
//! pumps it with its own clock through [`LayoutScheduler::due`]. Only one
//! cascade is pending at a time: a new trigger cancels whatever the previous
//! one had not fired yet.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Recompute offsets from the triggering event, in milliseconds.
pub const DEFAULT_CASCADE_MS: [u64; 4] = [0, 50, 150, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    ViewActivated,
    OverlayToggled,
    ContainerResized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CascadeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub cascade: CascadeId,
    pub trigger: Trigger,
    pub index: usize,
    pub deadline: Duration,
    /// Last tick of its cascade; anything still unresolved here is dropped.
    pub is_final: bool,
}

#[derive(Debug)]
pub struct LayoutScheduler {
    offsets: Vec<Duration>,
    pending: VecDeque<Tick>,
    next_cascade: u64,
}

impl Default for LayoutScheduler {
    fn default() -> Self {
        Self::new(&DEFAULT_CASCADE_MS)
    }
}

impl LayoutScheduler {
    pub fn new(offsets_ms: &[u64]) -> Self {
        let mut offsets: Vec<u64> = offsets_ms.to_vec();
        offsets.sort_unstable();
        offsets.dedup();
        if offsets.is_empty() {
            offsets.push(0);
        }
        Self {
            offsets: offsets.into_iter().map(Duration::from_millis).collect(),
            pending: VecDeque::new(),
            next_cascade: 0,
        }
    }

    pub fn offsets(&self) -> &[Duration] {
        &self.offsets
    }

    /// Starts a cascade at `now`, cancelling the unfired ticks of the
    /// previous one.
    pub fn schedule(&mut self, trigger: Trigger, now: Duration) -> CascadeId {
        let cancelled = self.pending.len();
        self.pending.clear();

        self.next_cascade += 1;
        let cascade = CascadeId(self.next_cascade);
        let last = self.offsets.len() - 1;
        for (index, offset) in self.offsets.iter().enumerate() {
            self.pending.push_back(Tick {
                cascade,
                trigger,
                index,
                deadline: now + *offset,
                is_final: index == last,
            });
        }
        tracing::debug!(
            cascade = cascade.0,
            ?trigger,
            cancelled,
            ticks = self.offsets.len(),
            "layout cascade scheduled"
        );
        cascade
    }

    /// Pops every tick whose deadline is at or before `now`, in order.
    pub fn due(&mut self, now: Duration) -> Vec<Tick> {
        let mut ready = Vec::new();
        while let Some(tick) = self.pending.front() {
            if tick.deadline > now {
                break;
            }
            if let Some(tick) = self.pending.pop_front() {
                ready.push(tick);
            }
        }
        ready
    }

    /// Cancels everything pending (view teardown). Returns how many ticks
    /// were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        if cancelled > 0 {
            tracing::debug!(cancelled, "layout cascade cancelled");
        }
        cancelled
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.front().map(|tick| tick.deadline)
    }

    pub fn active_cascade(&self) -> Option<CascadeId> {
        self.pending.front().map(|tick| tick.cascade)
    }
}
