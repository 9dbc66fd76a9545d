//! Injectable clock (§9: "All time-dependent code must accept an injectable
//! clock ... so tests can advance virtual time").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of milliseconds-since-epoch. The default is the host's wall
/// clock; rate-limit algorithms and the audit emitter take a `Clock` instead
/// of calling `SystemTime::now()` directly so tests can control time.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// The host's monotonic wall clock, used unless a caller injects another one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64
    }
}

/// A manually-advanced clock for deterministic tests (§8 S3/S5 require
/// advancing virtual time past a window boundary).
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start the clock at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self { now_ms: Arc::new(AtomicU64::new(start_ms)) }
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute value.
    pub fn set(&self, at_ms: u64) {
        self.now_ms.store(at_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A shared, cloneable handle to any `Clock` implementation, used throughout
/// the engine so extensions can be handed the same injected clock as the
/// evaluator.
pub type SharedClock = Arc<dyn Clock>;

/// Build the default shared clock (the host's wall clock).
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Tool-bag wrapper so a [`SharedClock`] can be registered under the
/// `"clock"` key and looked up with [`crate::tools::ToolBag::get`].
#[derive(Clone)]
pub struct ClockTool(pub SharedClock);

/// Resolve the clock registered in `tools` under `"clock"`, or the host's
/// wall clock if none was registered.
pub fn clock_from(tools: &crate::tools::ToolBag) -> SharedClock {
    tools.get::<ClockTool>("clock").map(|tool| tool.0.clone()).unwrap_or_else(system_clock)
}
