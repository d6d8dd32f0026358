//! Typed API over the `git` command-line tool.
//!
//! The crate assembles argument lists for git, runs it as a subprocess
//! through [`exec`], parses its line-oriented output formats into the
//! object graphs in [`models`], and classifies failures from literal
//! stderr templates into the closed [`GitError`] taxonomy. Parsing works
//! over fully-buffered output with explicit cursors and per-parse caches;
//! nothing here talks to a repository except through the process boundary.

pub mod cursor;
pub mod escape;
pub mod error;
pub mod models;
pub mod ops;
pub mod parse;

pub use error::{GitError, Result};
pub use models::{
    Blame, BlameCommit, BlameHunk, BlameLine, BlamePrevious, ColumnAction, ColumnHeader,
    ConfigEntry, Diff, DiffFile, DiffHunk, DiffLine, DiffStats, FileStatus, GitRef, GitRemote,
    HeadInfo, HunkStats, LineState, PushFlag, PushResult, RefKind, ReflogEntry, Revision,
    Signature, StashEntry, StatusEntry, TreeEntry, TreeEntryKind, WorktreeStatus,
};
pub use ops::{ConfigScope, Git, LogRequest, ResetMode};

// Re-exported so callers can drive async operations without naming the
// process crate directly.
pub use exec::{CancelMode, ProgressEvent, ProgressSender};
pub use tokio_util::sync::CancellationToken;
