//! Domain objects handed to downstream clients.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cursor::LineEnding;

/// Author or committer identity with timestamp.
///
/// A malformed timestamp field in git output degrades to the unix epoch
/// rather than failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

/// One commit parsed from a log listing. Identity is the hash; within one
/// parse every reference to the same hash resolves to the same `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub hash: String,
    pub tree_hash: String,
    pub parent_hashes: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
    pub subject: String,
    pub body: String,
}

/// One reflog record: a selector plus the commit it points at.
#[derive(Debug, Clone, Serialize)]
pub struct ReflogEntry {
    /// `HEAD@{0}`, `stash@{2}`, ...
    pub selector: String,
    pub revision: Arc<Revision>,
}

/// One stash record, a reflog entry of the stash ref.
#[derive(Debug, Clone, Serialize)]
pub struct StashEntry {
    pub selector: String,
    /// The stash message (`WIP on main: ...` unless given explicitly).
    pub message: String,
    pub revision: Arc<Revision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
}

/// Resolved state of one diff line, and the per-column states of a combined
/// diff. `NotPresent` only ever appears per-column: a line that exists in
/// the output always resolves to one of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    Context,
    Added,
    Removed,
    NotPresent,
}

/// Which side of a hunk header a column's range spec came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAction {
    Remove,
    Add,
}

/// One `start[,count]` range spec from a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub action: ColumnAction,
    pub start_line: u32,
    pub line_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// Resolved state: removed wins over added wins over context.
    pub state: LineState,
    /// Per-column states; same length as the hunk's `columns`.
    pub column_states: Vec<LineState>,
    /// Per-column line numbers; `None` where the line is absent from that
    /// column. Same length as the hunk's `columns`.
    pub column_numbers: Vec<Option<u32>>,
    /// Line content without its state prefix or line ending.
    pub text: String,
    pub line_ending: LineEnding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HunkStats {
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    /// One header per column: `C-1` remove specs plus one add spec. A
    /// unified diff has 2 columns; a combined diff of a P-parent merge has
    /// P+1.
    pub columns: Vec<ColumnHeader>,
    pub lines: Vec<DiffLine>,
    pub stats: HunkStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    /// File/hunk header lines plus opaque binary-patch lines.
    pub header_lines: usize,
    pub binary_files: usize,
}

impl DiffStats {
    pub fn absorb(&mut self, other: &DiffStats) {
        self.added += other.added;
        self.removed += other.removed;
        self.header_lines += other.header_lines;
        self.binary_files += other.binary_files;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffFile {
    pub old_path: String,
    pub new_path: String,
    pub old_id: Option<String>,
    pub new_id: Option<String>,
    pub old_mode: Option<String>,
    pub new_mode: Option<String>,
    pub status: FileStatus,
    pub hunks: Vec<DiffHunk>,
    /// Set both for `Binary files ... differ` markers and for inline binary
    /// patches.
    pub is_binary: bool,
    /// Opaque base85 literal/delta blocks of a `GIT binary patch`.
    pub binary_patch: Option<String>,
    pub stats: DiffStats,
}

/// A parsed diff: files plus aggregate stats across all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub files: Vec<DiffFile>,
    pub stats: DiffStats,
}

/// Commit metadata attributed by blame, cached by hash within one parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameCommit {
    pub hash: String,
    pub author: Signature,
    pub author_tz: String,
    pub committer: Signature,
    pub committer_tz: String,
    pub summary: String,
    /// The commit predates the range given to blame.
    pub boundary: bool,
    /// `previous <hash> <path>` header, when present.
    pub previous: Option<BlamePrevious>,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlamePrevious {
    pub hash: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlameLine {
    pub commit: Arc<BlameCommit>,
    /// 1-based position in the blamed file.
    pub line_number: u32,
    pub text: String,
    pub line_ending: LineEnding,
}

/// A maximal run of consecutive lines attributed to one commit. Boundaries
/// sit exactly where the attributed commit changes.
#[derive(Debug, Clone, Serialize)]
pub struct BlameHunk {
    pub commit: Arc<BlameCommit>,
    pub lines: Vec<BlameLine>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Blame {
    pub hunks: Vec<BlameHunk>,
}

impl Blame {
    pub fn line_count(&self) -> usize {
        self.hunks.iter().map(|h| h.lines.len()).sum()
    }

    pub fn lines(&self) -> impl Iterator<Item = &BlameLine> {
        self.hunks.iter().flat_map(|h| h.lines.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    LocalBranch,
    RemoteBranch { remote: String },
    Tag,
    Other,
}

/// One reference from a `for-each-ref` style listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRef {
    pub hash: String,
    /// Short name (`main`, `origin/main`, `v1.0`).
    pub name: String,
    /// Full name (`refs/heads/main`, ...).
    pub full_name: String,
    pub kind: RefKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRemote {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushFlag {
    FastForward,
    Forced,
    Deleted,
    New,
    Rejected,
    UpToDate,
}

/// One ref-result line from `git push --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub flag: PushFlag,
    pub from: String,
    pub to: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
}

/// One record from `git ls-tree -z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub mode: String,
    pub kind: TreeEntryKind,
    pub hash: String,
    pub name: String,
}

/// One record from `git config --list -z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

/// Parsed entry from `git status --porcelain -z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Single-letter staged status (column X) or '?' for untracked.
    pub staged: char,
    /// Single-letter unstaged status (column Y) or '?' for untracked.
    pub unstaged: char,
    pub path: String,
    /// Original path for renames and copies.
    pub orig_path: Option<String>,
    pub is_untracked: bool,
}

/// Summary plus entries for a working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorktreeStatus {
    pub uncommitted_tracked: usize,
    pub untracked: usize,
    pub entries: Vec<StatusEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadInfo {
    pub branch: String,
    pub oid: String,
}
