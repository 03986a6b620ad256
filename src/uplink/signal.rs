// src/uplink/signal.rs

use core::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const DONE_OK: u8 = 2;
const DONE_FAILED: u8 = 3;

/// Result of one transmission, as reported by the transport.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TxOutcome {
    Sent,
    Failed,
}

impl TxOutcome {
    pub const fn is_success(self) -> bool {
        matches!(self, TxOutcome::Sent)
    }
}

/// Single-producer, single-consumer handoff of a transmission result.
///
/// The orchestrator arms it before sending and takes the outcome on a later
/// evaluation. The transport (possibly from an interrupt or another task)
/// completes it once. Only loads and stores are used, so it works on cores
/// without compare-and-swap.
#[derive(Debug)]
pub struct TxDoneSignal {
    state: AtomicU8,
}

impl Default for TxDoneSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl TxDoneSignal {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Consumer side: a send is about to start.
    pub fn arm(&self) {
        self.state.store(PENDING, Ordering::Release);
    }

    /// Producer side. Ignored unless armed.
    pub fn complete(&self, success: bool) {
        if self.state.load(Ordering::Acquire) != PENDING {
            log::warn!("uplink: completion without a pending send");
            return;
        }
        let done = if success { DONE_OK } else { DONE_FAILED };
        self.state.store(done, Ordering::Release);
    }

    /// Consumer side: takes the outcome if the send has finished.
    pub fn take(&self) -> Option<TxOutcome> {
        let outcome = match self.state.load(Ordering::Acquire) {
            DONE_OK => TxOutcome::Sent,
            DONE_FAILED => TxOutcome::Failed,
            _ => return None,
        };
        self.state.store(IDLE, Ordering::Release);
        Some(outcome)
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }
}
