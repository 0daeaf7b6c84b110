//! Engine services: command application, per-match owners, cleanup, deltas.

pub mod apply;
pub mod cleanup;
pub mod delta;
pub mod session;

pub use self::cleanup::CleanupScheduler;
pub use self::delta::{LineCounts, MatchDelta, diff};
pub use self::session::{Command, CommandOutcome, MatchEngine};
