//! Events emitted by the engine after each successful commit.

use roadwatch_types::{PrincipalId, ReportId, Resolution};
use roadwatch_verification::RewardEvent;
use serde::Serialize;

/// Engine-level events that observers can subscribe to via the [`EventBus`].
///
/// Emitted only after the corresponding batch committed, in commit order
/// per report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new report was stored.
    Submitted {
        report_id: ReportId,
        submitter: PrincipalId,
    },
    /// An affirmative vote was recorded.
    Corroborated {
        report_id: ReportId,
        voter: PrincipalId,
        count: u32,
    },
    /// A report left `pending` for `verified`.
    Verified {
        report_id: ReportId,
        resolution: Resolution,
    },
    /// A report left `pending` for `rejected`.
    Rejected {
        report_id: ReportId,
        resolution: Resolution,
    },
    /// An account was credited.
    Rewarded {
        account: PrincipalId,
        report_id: ReportId,
        reason: RewardEvent,
        tokens: u64,
        reputation: i32,
    },
    /// Tokens moved between two accounts.
    Transferred {
        from: PrincipalId,
        to: PrincipalId,
        amount: u64,
    },
}

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting task; keep handlers fast to
/// avoid stalling the engine.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&EngineEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&EngineEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &EngineEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn submitted() -> EngineEvent {
        EngineEvent::Submitted {
            report_id: ReportId::new("r1").unwrap(),
            submitter: PrincipalId::new("u0").unwrap(),
        }
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&submitted());
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&submitted());
        assert_eq!(bus.listener_count(), 0);
    }
}
