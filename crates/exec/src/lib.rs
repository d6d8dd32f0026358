//! Subprocess invocation and streaming.
//!
//! One invocation spawns one external process with redirected stdio. Both
//! output streams are drained concurrently so a full pipe buffer on one
//! stream can never block the producer from writing the other. The async
//! path additionally feeds stderr lines through the progress decoder as
//! they arrive and honors cooperative cancellation.

mod args;
mod process;
mod progress;

pub use args::{Arg, GitArgs};
pub use process::{CancelMode, CommandRunner, ExecError, ExecOutcome};
pub use progress::{ProgressEvent, ProgressSender, parse_progress_line};
