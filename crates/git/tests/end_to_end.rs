//! End-to-end tests against a real git binary in scratch repositories.
//! Every test returns early when no `git` is on PATH.

use std::{
    fs,
    path::{Path, PathBuf},
};

use git::{ConfigScope, Git, GitError, LogRequest, ResetMode};
use tempfile::TempDir;

struct TestRepo {
    _tmp: TempDir,
    path: PathBuf,
    git: Git,
}

fn init_logging() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

impl TestRepo {
    fn new() -> Option<Self> {
        init_logging();
        workspace_utils::shell::resolve_executable("git")?;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo");
        fs::create_dir_all(&path).unwrap();

        let global = Git::global().unwrap();
        global.init(&path).unwrap();

        let git = Git::open(&path).unwrap();
        git.config_set("user.name", "Test User", ConfigScope::Local)
            .unwrap();
        git.config_set("user.email", "test@example.com", ConfigScope::Local)
            .unwrap();
        git.config_set("commit.gpgsign", "false", ConfigScope::Local)
            .unwrap();
        Some(Self {
            _tmp: tmp,
            path,
            git,
        })
    }

    fn write(&self, rel: &str, content: &str) {
        let target = self.path.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, content).unwrap();
    }

    fn commit_all(&self, message: &str) -> String {
        self.git.add(&[]).unwrap();
        self.git.commit(message, false, false).unwrap()
    }
}

#[test]
fn version_reports_something() {
    let Some(repo) = TestRepo::new() else { return };
    let version = repo.git.version().unwrap();
    assert!(version.starts_with("git version"));
}

#[test]
fn log_links_parents_and_shares_cache_objects() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    let first = repo.commit_all("first commit\n\nwith a body\n");
    repo.write("a.txt", "two\n");
    let second = repo.commit_all("second commit");

    let revisions = repo.git.log(&LogRequest::default()).unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0].hash, second);
    assert_eq!(revisions[1].hash, first);
    assert_eq!(revisions[0].parent_hashes, vec![first.clone()]);
    assert!(revisions[1].parent_hashes.is_empty());
    assert_eq!(revisions[1].subject, "first commit");
    assert_eq!(revisions[1].body, "with a body");
    assert_eq!(revisions[0].author.name, "Test User");
}

#[test]
fn commit_info_resolves_single_revision() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    let hash = repo.commit_all("only commit");
    let info = repo.git.commit_info(&hash).unwrap();
    assert_eq!(info.hash, hash);
    assert_eq!(info.subject, "only commit");
    assert!(repo.git.commit_info("0000000000000000000000000000000000000000").is_err());
}

#[test]
fn status_reports_staged_unstaged_and_untracked() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("tracked.txt", "v1\n");
    repo.commit_all("base");

    repo.write("tracked.txt", "v2\n");
    repo.write("new.txt", "fresh\n");
    let status = repo.git.status().unwrap();
    assert_eq!(status.untracked, 1);
    assert_eq!(status.uncommitted_tracked, 1);
    assert!(status.entries.iter().any(|e| e.path == "new.txt" && e.is_untracked));
    assert!(status.entries.iter().any(|e| e.path == "tracked.txt" && !e.is_untracked));
}

#[test]
fn worktree_diff_counts_changed_lines() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\ntwo\nthree\n");
    repo.commit_all("base");
    repo.write("a.txt", "one\nTWO\nthree\n");

    let diff = repo.git.diff_worktree(None).unwrap();
    assert_eq!(diff.files.len(), 1);
    assert_eq!(diff.stats.added, 1);
    assert_eq!(diff.stats.removed, 1);
    assert_eq!(diff.stats.binary_files, 0);
    assert_eq!(diff.files[0].status, git::FileStatus::Modified);
}

#[test]
fn commit_diff_for_initial_commit_is_all_added() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\ntwo\n");
    let hash = repo.commit_all("base");

    let diff = repo.git.diff_commit(&hash).unwrap();
    assert_eq!(diff.files.len(), 1);
    assert_eq!(diff.files[0].status, git::FileStatus::Added);
    assert_eq!(diff.stats.added, 2);
    assert_eq!(diff.stats.removed, 0);
}

#[test]
fn blame_attributes_every_line() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("file.txt", "alpha\nbeta\ngamma\n");
    let hash = repo.commit_all("write three lines");

    let blame = repo.git.blame(Path::new("file.txt"), None).unwrap();
    assert_eq!(blame.line_count(), 3);
    assert_eq!(blame.hunks.len(), 1);
    let commit = &blame.hunks[0].commit;
    assert_eq!(commit.hash, hash);
    assert_eq!(commit.summary, "write three lines");
    let numbers: Vec<u32> = blame.lines().map(|l| l.line_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    let text: Vec<&str> = blame.lines().map(|l| l.text.as_str()).collect();
    assert_eq!(text, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn branch_lifecycle() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    repo.commit_all("base");

    repo.git.create_branch("feature", None).unwrap();
    assert!(matches!(
        repo.git.create_branch("feature", None),
        Err(GitError::BranchAlreadyExists(name)) if name == "feature"
    ));

    let branches = repo.git.branches().unwrap();
    assert!(branches.iter().any(|b| b.name == "feature"));

    repo.git.rename_branch("feature", "renamed").unwrap();
    repo.git.delete_branch("renamed", false).unwrap();
    assert!(repo.git.delete_branch("renamed", false).is_err());
}

#[test]
fn checkout_switches_and_rejects_unknown_targets() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    repo.commit_all("base");
    let original = repo.git.head_info().unwrap();

    repo.git.create_branch("other", None).unwrap();
    repo.git.checkout("other", false).unwrap();
    assert_eq!(repo.git.head_info().unwrap().branch, "other");
    repo.git.checkout(&original.branch, false).unwrap();

    assert!(repo.git.checkout("definitely-missing", false).is_err());
}

#[test]
fn tag_lifecycle() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    repo.commit_all("base");

    repo.git.create_tag("v1.0", None, None).unwrap();
    repo.git
        .create_tag("v1.0-annotated", None, Some("release"))
        .unwrap();
    let tags = repo.git.tags().unwrap();
    assert!(tags.iter().any(|t| t.name == "v1.0"));
    assert!(tags.iter().any(|t| t.name == "v1.0-annotated"));

    assert!(matches!(
        repo.git.create_tag("v1.0", None, None),
        Err(GitError::TagAlreadyExists(name)) if name == "v1.0"
    ));
    repo.git.delete_tag("v1.0").unwrap();
}

#[test]
fn stash_round_trip_recovers_parent_graph() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "committed\n");
    let base = repo.commit_all("base");

    repo.write("a.txt", "dirty\n");
    repo.git.stash_save(Some("work in progress"), false).unwrap();
    assert_eq!(repo.git.status().unwrap().uncommitted_tracked, 0);

    let stashes = repo.git.stash_list().unwrap();
    assert_eq!(stashes.len(), 1);
    assert_eq!(stashes[0].selector, "stash@{0}");
    assert!(stashes[0].message.contains("work in progress"));
    // The raw-format pass attached the stash commit's parents; the first
    // parent is the commit the stash was made on.
    assert_eq!(stashes[0].revision.parent_hashes.first(), Some(&base));

    repo.git.stash_pop(None).unwrap();
    assert_eq!(repo.git.status().unwrap().uncommitted_tracked, 1);
    assert!(repo.git.stash_list().unwrap().is_empty());
}

#[test]
fn reflog_reports_recent_movements() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    repo.commit_all("first");
    repo.write("a.txt", "two\n");
    let second = repo.commit_all("second");

    let entries = repo.git.reflog(None).unwrap();
    assert!(entries.len() >= 2);
    assert_eq!(entries[0].revision.hash, second);
    assert!(entries[0].selector.starts_with("HEAD@{"));
    // Parent recovery ran against the same cache.
    assert_eq!(entries[0].revision.parent_hashes.len(), 1);
}

#[test]
fn reset_moves_head() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    let first = repo.commit_all("first");
    repo.write("a.txt", "two\n");
    repo.commit_all("second");

    repo.git.reset(ResetMode::Hard, Some(&first)).unwrap();
    assert_eq!(repo.git.head_info().unwrap().oid, first);
}

#[test]
fn merge_conflict_classifies_from_stdout() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "base\n");
    repo.commit_all("base");
    let main = repo.git.head_info().unwrap().branch;

    repo.git.create_branch("side", None).unwrap();
    repo.git.checkout("side", false).unwrap();
    repo.write("a.txt", "side change\n");
    repo.commit_all("side edit");

    repo.git.checkout(&main, false).unwrap();
    repo.write("a.txt", "main change\n");
    repo.commit_all("main edit");

    assert!(matches!(
        repo.git.merge("side", false, None),
        Err(GitError::AutomaticMergeFailed)
    ));
    repo.git.merge_abort().unwrap();
}

#[test]
fn ls_tree_and_cat_file() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("dir/inner.txt", "payload\n");
    repo.write("top.txt", "top\n");
    repo.commit_all("tree");

    let entries = repo.git.ls_tree("HEAD", None, false).unwrap();
    assert!(entries.iter().any(|e| e.name == "top.txt"));
    assert!(entries
        .iter()
        .any(|e| e.name == "dir" && e.kind == git::TreeEntryKind::Tree));

    let recursive = repo.git.ls_tree("HEAD", None, true).unwrap();
    assert!(recursive.iter().any(|e| e.name == "dir/inner.txt"));

    let payload = repo.git.cat_file("HEAD", Path::new("dir/inner.txt")).unwrap();
    assert_eq!(payload, "payload\n");
}

#[test]
fn config_round_trip_and_listing() {
    let Some(repo) = TestRepo::new() else { return };
    repo.git
        .config_set("custom.key", "custom value", ConfigScope::Local)
        .unwrap();
    assert_eq!(
        repo.git.config_get("custom.key", ConfigScope::Local).unwrap(),
        "custom value"
    );
    let listing = repo.git.config_list(ConfigScope::Local).unwrap();
    assert!(listing
        .iter()
        .any(|e| e.key == "custom.key" && e.value == "custom value"));

    repo.git.config_unset("custom.key", ConfigScope::Local).unwrap();
    assert!(repo.git.config_get("custom.key", ConfigScope::Local).is_err());
}

#[test]
fn non_ascii_paths_come_through_status_verbatim() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("café.txt", "latte\n");
    let status = repo.git.status().unwrap();
    assert!(status.entries.iter().any(|e| e.path == "café.txt"));
}

#[tokio::test]
async fn async_checkout_completes() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("a.txt", "one\n");
    repo.commit_all("base");
    repo.git.create_branch("async-target", None).unwrap();

    let cancel = git::CancellationToken::new();
    repo.git
        .checkout_async("async-target", false, None, cancel)
        .await
        .unwrap();
    assert_eq!(repo.git.head_info().unwrap().branch, "async-target");
}
