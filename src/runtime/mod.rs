//! Goal runtime: threads, executor and queues around the charging core.
//!
//! ```text
//!  accept() ──▶ charge-goal thread (result-wait loop, SafetyPort)
//!                  │ spawns
//!                  ▼
//!             charge-control thread
//!             ┌──────────────────────────────────────────┐
//!             │ edge_executor::LocalExecutor             │
//!             │  ┌─────────────┐   ┌──────────────────┐  │
//!             │  │ tick loop   │   │ completion loop  │  │
//!             │  │ fixed rate  │   │ wake-on-push     │  │
//!             │  └─────────────┘   └──────────────────┘  │
//!             └──────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod control_task;
pub mod server;

/// Stack size for the goal and control threads.
pub(crate) const WORKER_STACK_KB: usize = 64;
