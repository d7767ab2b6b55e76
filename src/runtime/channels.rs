//! Completion queue shared by adapters and the control worker.
//!
//! Uses an `embassy-sync` bounded MPMC channel.  Adapters push from any
//! thread without blocking; the control worker's completion task awaits
//! the receive side and wakes the moment something arrives.
//!
//! ```text
//! ┌──────────────┐  Completion  ┌────────────────┐
//! │   Adapters   │────────────▶│ Control worker  │
//! │ (any thread) │              │ (async, 1 task) │
//! └──────────────┘              └────────────────┘
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{error, trace};

use crate::app::events::Completion;

/// Channel depth for completions.
pub const COMPLETION_DEPTH: usize = 32;

/// Slots kept free for replies; lossy pushes never take these.
const RESERVED_SLOTS: usize = 8;

type CompletionChannel = Channel<CriticalSectionRawMutex, Completion, COMPLETION_DEPTH>;

/// Receive side, owned by the control worker.
pub struct CompletionQueue {
    channel: Arc<CompletionChannel>,
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionQueue {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Channel::new()),
        }
    }

    pub fn sender(&self) -> CompletionSender {
        CompletionSender {
            channel: Arc::clone(&self.channel),
        }
    }

    pub fn try_next(&self) -> Option<Completion> {
        self.channel.try_receive().ok()
    }

    /// Wait for the next completion.
    pub async fn next(&self) -> Completion {
        self.channel.receive().await
    }
}

/// Send side, cloned into every reply handle.
#[derive(Clone)]
pub struct CompletionSender {
    channel: Arc<CompletionChannel>,
}

impl CompletionSender {
    /// Enqueue a completion.  A full queue drops it with an error log.
    pub fn push(&self, completion: Completion) {
        if let Err(e) = self.channel.try_send(completion) {
            error!("completion queue full, dropping {e:?}");
        }
    }

    /// Enqueue an informational completion only while the queue has room
    /// to spare.
    pub fn push_lossy(&self, completion: Completion) {
        if self.channel.free_capacity() > RESERVED_SLOTS {
            self.push(completion);
        } else {
            trace!("completion queue busy, dropping {completion:?}");
        }
    }
}

impl core::fmt::Debug for CompletionSender {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompletionSender")
            .field("free", &self.channel.free_capacity())
            .finish()
    }
}
