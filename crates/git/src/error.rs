//! Typed failure taxonomy and the stderr template classifier.
//!
//! Git reports failures as stable literal templates: a constant prefix, a
//! dynamic interior token (name, path, revision) and a constant suffix.
//! Classification matches whole lines against those templates rather than
//! regular expressions; when the token's value is known in advance the total
//! length must equal `prefix + token + suffix` exactly, which keeps a token
//! that is a substring of another valid message from misclassifying.
//!
//! Rules run in a fixed per-operation order before falling back to a
//! generic failure carrying the verbatim exit code and stderr. An exit code
//! of zero never classifies, regardless of output text.

use exec::{ExecError, ExecOutcome};
use thiserror::Error;

use crate::parse::ParseError;

#[derive(Debug, Error)]
pub enum GitError {
    // Not found.
    #[error("unknown revision: {0}")]
    UnknownRevision(String),
    #[error("reference is not a tree: {0}")]
    NotATree(String),
    #[error("pathspec did not match any files: {0}")]
    UnknownPathspec(String),
    #[error("branch not found: {0}")]
    BranchNotFound(String),
    #[error("tag not found: {0}")]
    TagNotFound(String),

    // Conflicts.
    #[error("unresolved merge in progress")]
    UnresolvedConflicts,
    #[error("operation is not possible with unmerged files")]
    UnmergedFiles,
    #[error("local changes would be overwritten by {operation}")]
    LocalChangesWouldBeOverwritten { operation: String },
    #[error("untracked working tree files would be overwritten")]
    UntrackedWouldBeOverwritten { files: Vec<String> },
    #[error("automatic merge failed; fix conflicts and commit the result")]
    AutomaticMergeFailed,
    #[error("could not apply {0}")]
    CherryPickFailed(String),
    #[error("cherry-pick is empty, possibly due to conflict resolution")]
    CherryPickEmpty,

    // Repository state.
    #[error("repository has no commits yet")]
    RepositoryIsEmpty,
    #[error("no stash entries found")]
    StashIsEmpty,
    #[error("working tree is dirty")]
    DirtyWorkingTree,
    #[error("commit {0} is a merge and no mainline was given")]
    CommitIsMerge(String),

    // Validity.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
    #[error("invalid tag name: {0}")]
    InvalidTagName(String),
    #[error("branch already exists: {0}")]
    BranchAlreadyExists(String),
    #[error("tag already exists: {0}")]
    TagAlreadyExists(String),
    #[error("branch not fully merged: {0}")]
    BranchNotFullyMerged(String),

    // Config subsystem, mapped from exit codes 1-5.
    #[error("invalid config section or key")]
    ConfigInvalidSectionOrKey,
    #[error("no config section or name was provided")]
    ConfigParameterMissing,
    #[error("invalid config file")]
    ConfigInvalidFile,
    #[error("config file is not writable")]
    ConfigFileNotWritable,
    #[error("no such config section or option")]
    ConfigNoSection,

    // Fallbacks.
    #[error("git exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, GitError>;

/// One literal stderr template.
struct Template {
    prefix: &'static str,
    suffix: &'static str,
}

impl Template {
    const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    /// Match `message` and extract the interior token. With a known token
    /// the total length check is exact.
    fn extract(&self, message: &str, known: Option<&str>) -> Option<String> {
        if let Some(token) = known
            && message.len() != self.prefix.len() + token.len() + self.suffix.len()
        {
            return None;
        }
        let token = message
            .strip_prefix(self.prefix)?
            .strip_suffix(self.suffix)?;
        if let Some(expected) = known
            && token != expected
        {
            return None;
        }
        Some(token.to_string())
    }

    fn matches(&self, message: &str) -> bool {
        self.extract(message, None).is_some()
    }
}

const UNKNOWN_REVISION: Template = Template::new(
    "fatal: ambiguous argument '",
    "': unknown revision or path not in the working tree.",
);
const NOT_A_TREE: Template = Template::new("fatal: reference is not a tree: ", "");
const UNKNOWN_PATHSPEC: Template = Template::new(
    "error: pathspec '",
    "' did not match any file(s) known to git",
);
// Older gits capitalize and punctuate these differently.
const BRANCH_EXISTS: [Template; 2] = [
    Template::new("fatal: a branch named '", "' already exists"),
    Template::new("fatal: A branch named '", "' already exists."),
];
const TAG_EXISTS: Template = Template::new("fatal: tag '", "' already exists");
const BRANCH_NOT_FOUND: [Template; 2] = [
    Template::new("error: branch '", "' not found"),
    Template::new("error: branch '", "' not found."),
];
const TAG_NOT_FOUND: Template = Template::new("error: tag '", "' not found.");
const INVALID_BRANCH_NAME: Template = Template::new("fatal: '", "' is not a valid branch name");
const INVALID_TAG_NAME: Template = Template::new("fatal: '", "' is not a valid tag name");
// Two phrasings, depending on git's capitalization era.
const NOT_FULLY_MERGED: [Template; 2] = [
    Template::new("error: the branch '", "' is not fully merged"),
    Template::new("error: The branch '", "' is not fully merged."),
];
const LOCAL_CHANGES_CHECKOUT: Template = Template::new(
    "error: Your local changes to the following files would be overwritten by checkout:",
    "",
);
const LOCAL_CHANGES_MERGE: Template = Template::new(
    "error: Your local changes to the following files would be overwritten by merge:",
    "",
);
const UNTRACKED_CHECKOUT: Template = Template::new(
    "error: The following untracked working tree files would be overwritten by checkout:",
    "",
);
const UNTRACKED_MERGE: Template = Template::new(
    "error: The following untracked working tree files would be overwritten by merge:",
    "",
);
const UNRESOLVED_MERGE: Template = Template::new(
    "fatal: You have not concluded your merge (MERGE_HEAD exists).",
    "",
);
const UNMERGED_FILES: [Template; 4] = [
    Template::new("error: Merging is not possible because you have unmerged files.", ""),
    Template::new("error: Committing is not possible because you have unmerged files.", ""),
    Template::new("error: Pulling is not possible because you have unmerged files.", ""),
    Template::new("error: cherry-pick is impossible because you have unmerged files.", ""),
];
// This one is reported on stdout, not stderr.
const AUTOMATIC_MERGE_FAILED: Template = Template::new(
    "Automatic merge failed; fix conflicts and then commit the result.",
    "",
);
const CHERRY_PICK_EMPTY: Template = Template::new(
    "The previous cherry-pick is now empty, possibly due to conflict resolution.",
    "",
);
const COULD_NOT_APPLY: Template = Template::new("error: could not apply ", "");
const COMMIT_IS_MERGE: Template = Template::new(
    "error: commit ",
    " is a merge but no -m option was given.",
);
const NO_STASH_ENTRIES: Template = Template::new("No stash entries found.", "");
const BAD_REVISION: Template = Template::new("fatal: bad revision '", "'");
const NO_INITIAL_COMMIT: Template = Template::new("fatal: you do not have the initial commit yet", "");

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim_end_matches('\r')
}

/// Indented file names listed under an overwrite warning.
fn listed_files(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .skip(1)
        .map_while(|line| line.strip_prefix('\t'))
        .map(str::to_string)
        .collect()
}

/// `checkout <target>`: unknown revision, not-a-tree, unknown pathspec,
/// then — only when the caller did not force — the local-state conflicts.
pub fn classify_checkout(outcome: &ExecOutcome, target: &str, force: bool) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    if let Some(rev) = UNKNOWN_REVISION.extract(message, Some(target)) {
        return Some(GitError::UnknownRevision(rev));
    }
    if let Some(rev) = NOT_A_TREE.extract(message, Some(target)) {
        return Some(GitError::NotATree(rev));
    }
    if let Some(path) = UNKNOWN_PATHSPEC.extract(message, Some(target)) {
        return Some(GitError::UnknownPathspec(path));
    }
    if !force {
        if LOCAL_CHANGES_CHECKOUT.matches(message) {
            return Some(GitError::LocalChangesWouldBeOverwritten {
                operation: "checkout".to_string(),
            });
        }
        if UNTRACKED_CHECKOUT.matches(message) {
            return Some(GitError::UntrackedWouldBeOverwritten {
                files: listed_files(&outcome.stderr),
            });
        }
        if UNRESOLVED_MERGE.matches(message) {
            return Some(GitError::UnresolvedConflicts);
        }
    }
    None
}

/// `log`/`diff`/`blame` style operations taking a revision argument.
pub fn classify_revision(outcome: &ExecOutcome, revision: Option<&str>) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    if let Some(rev) = UNKNOWN_REVISION.extract(message, revision) {
        return Some(GitError::UnknownRevision(rev));
    }
    if let Some(path) = UNKNOWN_PATHSPEC.extract(message, None) {
        return Some(GitError::UnknownPathspec(path));
    }
    if BAD_REVISION.extract(message, None).as_deref() == Some("HEAD")
        || NO_INITIAL_COMMIT.matches(message)
    {
        return Some(GitError::RepositoryIsEmpty);
    }
    None
}

pub fn classify_merge(outcome: &ExecOutcome) -> Option<GitError> {
    // The conflict summary goes to stdout.
    if outcome
        .stdout
        .lines()
        .any(|line| AUTOMATIC_MERGE_FAILED.matches(line.trim_end_matches('\r')))
    {
        return Some(GitError::AutomaticMergeFailed);
    }
    let message = first_line(&outcome.stderr);
    if LOCAL_CHANGES_MERGE.matches(message) {
        return Some(GitError::LocalChangesWouldBeOverwritten {
            operation: "merge".to_string(),
        });
    }
    if UNTRACKED_MERGE.matches(message) {
        return Some(GitError::UntrackedWouldBeOverwritten {
            files: listed_files(&outcome.stderr),
        });
    }
    if UNMERGED_FILES.iter().any(|t| t.matches(message)) {
        return Some(GitError::UnmergedFiles);
    }
    if UNRESOLVED_MERGE.matches(message) {
        return Some(GitError::UnresolvedConflicts);
    }
    None
}

/// `commit` can only fail on working-tree state here.
pub fn classify_commit(outcome: &ExecOutcome) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    if UNMERGED_FILES.iter().any(|t| t.matches(message)) {
        return Some(GitError::UnmergedFiles);
    }
    if UNRESOLVED_MERGE.matches(message) {
        return Some(GitError::UnresolvedConflicts);
    }
    None
}

pub fn classify_branch_create(outcome: &ExecOutcome, name: &str) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    for template in &BRANCH_EXISTS {
        if let Some(branch) = template.extract(message, Some(name)) {
            return Some(GitError::BranchAlreadyExists(branch));
        }
    }
    if let Some(branch) = INVALID_BRANCH_NAME.extract(message, Some(name)) {
        return Some(GitError::InvalidBranchName(branch));
    }
    if let Some(rev) = UNKNOWN_REVISION.extract(message, None) {
        return Some(GitError::UnknownRevision(rev));
    }
    None
}

pub fn classify_branch_delete(outcome: &ExecOutcome, name: &str) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    for template in &BRANCH_NOT_FOUND {
        if let Some(branch) = template.extract(message, Some(name)) {
            return Some(GitError::BranchNotFound(branch));
        }
    }
    for template in &NOT_FULLY_MERGED {
        if let Some(branch) = template.extract(message, Some(name)) {
            return Some(GitError::BranchNotFullyMerged(branch));
        }
    }
    None
}

pub fn classify_tag_create(outcome: &ExecOutcome, name: &str) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    if let Some(tag) = TAG_EXISTS.extract(message, Some(name)) {
        return Some(GitError::TagAlreadyExists(tag));
    }
    if let Some(tag) = INVALID_TAG_NAME.extract(message, Some(name)) {
        return Some(GitError::InvalidTagName(tag));
    }
    None
}

pub fn classify_tag_delete(outcome: &ExecOutcome, name: &str) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    TAG_NOT_FOUND
        .extract(message, Some(name))
        .map(GitError::TagNotFound)
}

/// Shared by cherry-pick and revert, which fail through the same sequencer.
pub fn classify_cherry_pick(outcome: &ExecOutcome) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    if CHERRY_PICK_EMPTY.matches(message) {
        return Some(GitError::CherryPickEmpty);
    }
    if let Some(commit) = COMMIT_IS_MERGE.extract(message, None) {
        return Some(GitError::CommitIsMerge(commit));
    }
    if UNMERGED_FILES.iter().any(|t| t.matches(message)) {
        return Some(GitError::UnmergedFiles);
    }
    if let Some(what) = COULD_NOT_APPLY.extract(message, None) {
        return Some(GitError::CherryPickFailed(what));
    }
    None
}

/// Stash failures, including the empty-repository bad-revision chain.
pub fn classify_stash(outcome: &ExecOutcome) -> Option<GitError> {
    let message = first_line(&outcome.stderr);
    if NO_STASH_ENTRIES.matches(message) {
        return Some(GitError::StashIsEmpty);
    }
    if let Some(rev) = BAD_REVISION.extract(message, None) {
        // An empty repository reports HEAD as a bad revision; a missing
        // stash ref means there is nothing stashed.
        return Some(if rev == "HEAD" {
            GitError::RepositoryIsEmpty
        } else if rev.starts_with("refs/stash") || rev.starts_with("stash@{") {
            GitError::StashIsEmpty
        } else {
            GitError::UnknownRevision(rev)
        });
    }
    if NO_INITIAL_COMMIT.matches(message) {
        return Some(GitError::RepositoryIsEmpty);
    }
    if LOCAL_CHANGES_MERGE.matches(message) {
        return Some(GitError::DirtyWorkingTree);
    }
    None
}

/// Config exit codes 1-5 map to five distinct failures.
pub fn classify_config(outcome: &ExecOutcome) -> Option<GitError> {
    Some(match outcome.exit_code {
        1 => GitError::ConfigInvalidSectionOrKey,
        2 => GitError::ConfigParameterMissing,
        3 => GitError::ConfigInvalidFile,
        4 => GitError::ConfigFileNotWritable,
        5 => GitError::ConfigNoSection,
        _ => return None,
    })
}

/// The generic fallback: verbatim exit code and stderr, never swallowed.
pub fn generic_failure(outcome: &ExecOutcome) -> GitError {
    GitError::Failed {
        exit_code: outcome.exit_code,
        stderr: outcome.stderr.clone(),
    }
}
