//! The operation surface: one method per git verb.
//!
//! Every operation follows the same shape — build a typed argument list,
//! run it through the chosen executor (global or working-directory-scoped),
//! classify a failing outcome against that operation's stderr templates,
//! and parse a successful one. Long-running operations additionally expose
//! an async variant taking a progress sink and a cancellation token.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use exec::{CancelMode, CommandRunner, ExecError, ExecOutcome, GitArgs, ProgressSender};
use tokio_util::sync::CancellationToken;
use workspace_utils::{shell, text::TextDecoder};

use crate::{
    error::{self, GitError, Result},
    models::{
        Blame, Diff, GitRef, GitRemote, HeadInfo, PushResult, ReflogEntry, Revision, StashEntry,
        TreeEntry, WorktreeStatus,
    },
    parse::{
        BlameCache, RevisionCache,
        blame::parse_blame,
        diff::parse_diff,
        log::{self, parse_log, parse_raw_parents, parse_reflog, parse_stash_list},
        refs::{parse_config_list, parse_push_results, parse_refs, parse_remotes, parse_status},
    },
};

/// How `reset` moves the index and working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Soft,
    Mixed,
    Hard,
}

impl ResetMode {
    fn as_flag(self) -> &'static str {
        match self {
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
            ResetMode::Hard => "--hard",
        }
    }
}

/// Which config file an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigScope {
    #[default]
    Local,
    Global,
}

/// Handle binding a resolved git executable to a working directory. With no
/// working directory the handle runs in git's global scope (init, global
/// config); repository operations require one.
#[derive(Debug, Clone)]
pub struct Git {
    runner: CommandRunner,
    workdir: Option<PathBuf>,
}

impl Git {
    /// Open a handle scoped to a repository working directory.
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_decoder(Some(workdir.into()), TextDecoder::default())
    }

    /// A handle without a working directory, for global operations.
    pub fn global() -> Result<Self> {
        Self::with_decoder(None, TextDecoder::default())
    }

    /// Configure the output decoding explicitly.
    pub fn with_decoder(workdir: Option<PathBuf>, decoder: TextDecoder) -> Result<Self> {
        let program = shell::resolve_executable("git")
            .ok_or_else(|| ExecError::NotAvailable("git".to_string()))?;
        Ok(Self {
            runner: CommandRunner::new(program, decoder),
            workdir,
        })
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn decoder(&self) -> TextDecoder {
        self.runner.decoder()
    }

    fn env() -> Vec<(OsString, OsString)> {
        vec![(
            OsString::from("GIT_TERMINAL_PROMPT"),
            OsString::from("0"),
        )]
    }

    /// Working-directory-scoped execution.
    fn run(&self, args: &GitArgs) -> Result<ExecOutcome> {
        Ok(self
            .runner
            .run(self.workdir.as_deref(), &args.to_argv(), &Self::env(), None)?)
    }

    /// Global execution, ignoring the working directory.
    fn run_global(&self, args: &GitArgs) -> Result<ExecOutcome> {
        Ok(self.runner.run(None, &args.to_argv(), &Self::env(), None)?)
    }

    async fn run_streaming(
        &self,
        args: &GitArgs,
        progress: Option<ProgressSender>,
        cancel: Option<CancellationToken>,
        mode: CancelMode,
    ) -> Result<ExecOutcome> {
        Ok(self
            .runner
            .run_streaming(
                self.workdir.as_deref(),
                &args.to_argv(),
                &Self::env(),
                progress,
                cancel,
                mode,
            )
            .await?)
    }
}

/// Classify a failed outcome with `classify`, falling back to the generic
/// exit-code failure. Success passes through untouched.
fn ensure<F>(outcome: ExecOutcome, classify: F) -> Result<ExecOutcome>
where
    F: FnOnce(&ExecOutcome) -> Option<GitError>,
{
    if outcome.success() {
        return Ok(outcome);
    }
    Err(classify(&outcome).unwrap_or_else(|| error::generic_failure(&outcome)))
}

fn ensure_generic(outcome: ExecOutcome) -> Result<ExecOutcome> {
    ensure(outcome, |_| None)
}

// Repository and revision queries.
impl Git {
    /// `git init <path>`, run through the global executor.
    pub fn init(&self, path: &Path) -> Result<()> {
        let args = GitArgs::new("init").path(path);
        ensure_generic(self.run_global(&args)?)?;
        Ok(())
    }

    pub fn version(&self) -> Result<String> {
        let args = GitArgs::new("--version");
        let outcome = ensure_generic(self.run_global(&args)?)?;
        Ok(outcome.stdout.trim().to_string())
    }

    /// Resolve a revision expression to a full hash.
    pub fn rev_parse(&self, revision: &str) -> Result<String> {
        let args = GitArgs::new("rev-parse").flag("--verify").param(revision);
        let outcome = ensure(self.run(&args)?, |o| {
            error::classify_revision(o, Some(revision))
        })?;
        Ok(outcome.stdout.trim().to_string())
    }

    pub fn head_info(&self) -> Result<HeadInfo> {
        let branch_args = GitArgs::new("rev-parse").flag("--abbrev-ref").param("HEAD");
        let branch = ensure(self.run(&branch_args)?, |o| error::classify_revision(o, None))?;
        let oid = self.rev_parse("HEAD")?;
        Ok(HeadInfo {
            branch: branch.stdout.trim().to_string(),
            oid,
        })
    }

    /// `git log` over the compact record format. A fresh revision cache is
    /// created per call and discarded with it.
    pub fn log(&self, request: &LogRequest) -> Result<Vec<Arc<Revision>>> {
        let mut args = GitArgs::new("log")
            .flag("-z")
            .param(format!("--format={}", log::LOG_FORMAT));
        if let Some(n) = request.max_count {
            args = args.param(format!("--max-count={n}"));
        }
        if request.all {
            args = args.flag("--all");
        }
        args = args.param_opt(request.range.as_deref());
        if let Some(path) = &request.path {
            args = args.no_more_options().path(path);
        }
        let outcome = ensure(self.run(&args)?, |o| {
            error::classify_revision(o, request.range.as_deref())
        })?;
        let mut cache = RevisionCache::new();
        Ok(parse_log(&outcome.stdout, &mut cache)?)
    }

    /// Metadata of a single commit.
    pub fn commit_info(&self, revision: &str) -> Result<Arc<Revision>> {
        let args = GitArgs::new("log")
            .flag("-z")
            .param(format!("--format={}", log::LOG_FORMAT))
            .param("--max-count=1")
            .param(revision);
        let outcome = ensure(self.run(&args)?, |o| {
            error::classify_revision(o, Some(revision))
        })?;
        let mut cache = RevisionCache::new();
        parse_log(&outcome.stdout, &mut cache)?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::UnknownRevision(revision.to_string()))
    }

    /// Reflog of a ref. Two passes against one cache: the compact listing
    /// for metadata, then raw format to recover each entry's parents.
    pub fn reflog(&self, reference: Option<&str>) -> Result<Vec<ReflogEntry>> {
        let reference = reference.unwrap_or("HEAD");
        let mut cache = RevisionCache::new();

        let list_args = GitArgs::new("log")
            .flag("-z")
            .flag("--walk-reflogs")
            .param(format!("--format={}", log::REFLOG_FORMAT))
            .param(reference);
        let listing = ensure(self.run(&list_args)?, |o| error::classify_revision(o, None))?;
        let entries = parse_reflog(&listing.stdout, &mut cache)?;

        let raw_args = GitArgs::new("log")
            .flag("--walk-reflogs")
            .param("--format=raw")
            .param(reference);
        let raw = ensure(self.run(&raw_args)?, |o| error::classify_revision(o, None))?;
        for (hash, parents) in parse_raw_parents(&raw.stdout) {
            cache.attach_parents(&hash, parents);
        }

        Ok(entries
            .into_iter()
            .filter_map(|(selector, hash)| {
                let revision = cache.get(&hash)?;
                Some(ReflogEntry { selector, revision })
            })
            .collect())
    }
}

/// Options for a log query.
#[derive(Debug, Clone, Default)]
pub struct LogRequest {
    pub max_count: Option<u32>,
    pub all: bool,
    /// A revision or range expression (`main`, `v1..v2`).
    pub range: Option<String>,
    pub path: Option<PathBuf>,
}

// Diff and blame.
impl Git {
    /// Changes of one commit against its first parent (`--root` makes the
    /// initial commit diff against the empty tree).
    pub fn diff_commit(&self, revision: &str) -> Result<Diff> {
        let args = GitArgs::new("diff-tree")
            .flag("--patch")
            .flag("--root")
            .param(revision);
        let outcome = ensure(self.run(&args)?, |o| {
            error::classify_revision(o, Some(revision))
        })?;
        Ok(parse_diff(&outcome.stdout, &self.decoder())?)
    }

    /// Combined diff of a merge commit: one column per parent plus the
    /// result.
    pub fn diff_combined(&self, revision: &str) -> Result<Diff> {
        let args = GitArgs::new("diff-tree").flag("--cc").param(revision);
        let outcome = ensure(self.run(&args)?, |o| {
            error::classify_revision(o, Some(revision))
        })?;
        Ok(parse_diff(&outcome.stdout, &self.decoder())?)
    }

    pub fn diff_range(&self, from: &str, to: &str) -> Result<Diff> {
        let range = format!("{from}..{to}");
        let args = GitArgs::new("diff").param(&range);
        let outcome = ensure(self.run(&args)?, |o| error::classify_revision(o, None))?;
        Ok(parse_diff(&outcome.stdout, &self.decoder())?)
    }

    /// Working tree against HEAD (or a given base revision).
    pub fn diff_worktree(&self, base: Option<&str>) -> Result<Diff> {
        let args = GitArgs::new("diff").param_opt(base);
        let outcome = ensure(self.run(&args)?, |o| error::classify_revision(o, base))?;
        Ok(parse_diff(&outcome.stdout, &self.decoder())?)
    }

    /// Index against HEAD.
    pub fn diff_staged(&self) -> Result<Diff> {
        let args = GitArgs::new("diff").flag("--cached");
        let outcome = ensure(self.run(&args)?, |o| error::classify_revision(o, None))?;
        Ok(parse_diff(&outcome.stdout, &self.decoder())?)
    }

    /// Per-line attribution of a file, with a per-call commit cache.
    pub fn blame(&self, path: &Path, revision: Option<&str>) -> Result<Blame> {
        let args = GitArgs::new("blame")
            .flag("--porcelain")
            .param_opt(revision)
            .no_more_options()
            .path(path);
        let outcome = ensure(self.run(&args)?, |o| error::classify_revision(o, revision))?;
        let mut cache = BlameCache::new();
        Ok(parse_blame(&outcome.stdout, &mut cache)?)
    }
}

// Working tree state.
impl Git {
    pub fn status(&self) -> Result<WorktreeStatus> {
        let args = GitArgs::new("status")
            .global_flag("--no-optional-locks")
            .flag("--porcelain")
            .flag("-z")
            .flag("--untracked-files=normal");
        let outcome = ensure_generic(self.run(&args)?)?;
        Ok(parse_status(&outcome.stdout))
    }

    pub fn add(&self, paths: &[PathBuf]) -> Result<()> {
        let mut args = GitArgs::new("add").flag("-A");
        if !paths.is_empty() {
            args = args.no_more_options();
            for path in paths {
                args = args.path(path);
            }
        }
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    pub fn rm(&self, paths: &[PathBuf], cached: bool) -> Result<()> {
        let mut args = GitArgs::new("rm").flag_if(cached, "--cached").no_more_options();
        for path in paths {
            args = args.path(path);
        }
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    /// Commit staged changes; returns the new HEAD hash.
    pub fn commit(&self, message: &str, amend: bool, allow_empty: bool) -> Result<String> {
        let args = GitArgs::new("commit")
            .flag_if(amend, "--amend")
            .flag_if(allow_empty, "--allow-empty")
            .param("-m")
            .param(message);
        ensure(self.run(&args)?, error::classify_commit)?;
        self.rev_parse("HEAD")
    }

    pub fn reset(&self, mode: ResetMode, revision: Option<&str>) -> Result<()> {
        let args = GitArgs::new("reset")
            .flag(mode.as_flag())
            .param_opt(revision);
        ensure(self.run(&args)?, |o| error::classify_revision(o, revision))?;
        Ok(())
    }

    /// Remove untracked files (`-d` descends into directories).
    pub fn clean(&self, directories: bool) -> Result<()> {
        let args = GitArgs::new("clean")
            .flag("-f")
            .flag_if(directories, "-d");
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    pub fn checkout(&self, target: &str, force: bool) -> Result<()> {
        let args = GitArgs::new("checkout")
            .flag_if(force, "--force")
            .param(target);
        ensure(self.run(&args)?, |o| {
            error::classify_checkout(o, target, force)
        })?;
        Ok(())
    }

    /// Cancellable checkout reporting `Checking out files: (n/m)` progress.
    pub async fn checkout_async(
        &self,
        target: &str,
        force: bool,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let args = GitArgs::new("checkout")
            .flag("--progress")
            .flag_if(force, "--force")
            .param(target);
        let outcome = self
            .run_streaming(&args, progress, Some(cancel), CancelMode::Kill)
            .await?;
        ensure(outcome, |o| error::classify_checkout(o, target, force))?;
        Ok(())
    }
}

// Branches, tags and refs.
impl Git {
    pub fn branches(&self) -> Result<Vec<GitRef>> {
        self.for_each_ref(&["refs/heads", "refs/remotes"])
    }

    pub fn tags(&self) -> Result<Vec<GitRef>> {
        self.for_each_ref(&["refs/tags"])
    }

    pub fn refs(&self) -> Result<Vec<GitRef>> {
        self.for_each_ref(&[])
    }

    fn for_each_ref(&self, patterns: &[&str]) -> Result<Vec<GitRef>> {
        let mut args = GitArgs::new("for-each-ref").param("--format=%(objectname) %(refname)");
        for pattern in patterns {
            args = args.param(*pattern);
        }
        let outcome = ensure_generic(self.run(&args)?)?;
        Ok(parse_refs(&outcome.stdout))
    }

    pub fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<()> {
        let args = GitArgs::new("branch").param(name).param_opt(start_point);
        ensure(self.run(&args)?, |o| error::classify_branch_create(o, name))?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let args = GitArgs::new("branch")
            .flag(if force { "-D" } else { "-d" })
            .param(name);
        ensure(self.run(&args)?, |o| error::classify_branch_delete(o, name))?;
        Ok(())
    }

    pub fn rename_branch(&self, old: &str, new: &str) -> Result<()> {
        let args = GitArgs::new("branch").flag("-m").param(old).param(new);
        ensure(self.run(&args)?, |o| error::classify_branch_create(o, new))?;
        Ok(())
    }

    pub fn create_tag(&self, name: &str, revision: Option<&str>, message: Option<&str>) -> Result<()> {
        let mut args = GitArgs::new("tag");
        if let Some(message) = message {
            args = args.flag("-a").param("-m").param(message);
        }
        args = args.param(name).param_opt(revision);
        ensure(self.run(&args)?, |o| error::classify_tag_create(o, name))?;
        Ok(())
    }

    pub fn delete_tag(&self, name: &str) -> Result<()> {
        let args = GitArgs::new("tag").flag("-d").param(name);
        ensure(self.run(&args)?, |o| error::classify_tag_delete(o, name))?;
        Ok(())
    }
}

// Merging and history surgery.
impl Git {
    pub fn merge(&self, revision: &str, no_fast_forward: bool, message: Option<&str>) -> Result<()> {
        let mut args = GitArgs::new("merge").flag_if(no_fast_forward, "--no-ff");
        if let Some(message) = message {
            args = args.param("-m").param(message);
        }
        args = args.param(revision);
        ensure(self.run(&args)?, error::classify_merge)?;
        Ok(())
    }

    pub fn merge_abort(&self) -> Result<()> {
        ensure_generic(self.run(&GitArgs::new("merge").flag("--abort"))?)?;
        Ok(())
    }

    pub fn cherry_pick(
        &self,
        revision: &str,
        no_commit: bool,
        mainline: Option<u32>,
    ) -> Result<()> {
        let mut args = GitArgs::new("cherry-pick").flag_if(no_commit, "--no-commit");
        if let Some(parent) = mainline {
            args = args.param("-m").param(parent.to_string());
        }
        args = args.param(revision);
        ensure(self.run(&args)?, error::classify_cherry_pick)?;
        Ok(())
    }

    /// Reverts share the cherry-pick sequencer and its failure templates.
    pub fn revert(&self, revision: &str, no_commit: bool, mainline: Option<u32>) -> Result<()> {
        let mut args = GitArgs::new("revert").flag_if(no_commit, "--no-commit");
        if let Some(parent) = mainline {
            args = args.param("-m").param(parent.to_string());
        }
        args = args.param(revision);
        ensure(self.run(&args)?, error::classify_cherry_pick)?;
        Ok(())
    }
}

// Stashes.
impl Git {
    /// Stash listing over the compact record format plus a raw-format pass
    /// recovering each stash commit's parents, sharing one cache so the two
    /// passes resolve to identical objects.
    pub fn stash_list(&self) -> Result<Vec<StashEntry>> {
        let mut cache = RevisionCache::new();

        let list_args = GitArgs::new("stash")
            .param("list")
            .flag("-z")
            .param(format!("--format={}", log::STASH_FORMAT));
        let listing = ensure(self.run(&list_args)?, error::classify_stash)?;
        let entries = parse_stash_list(&listing.stdout, &mut cache)?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let raw_args = GitArgs::new("log")
            .flag("--walk-reflogs")
            .param("--format=raw")
            .param("refs/stash");
        let raw = ensure(self.run(&raw_args)?, error::classify_stash)?;
        for (hash, parents) in parse_raw_parents(&raw.stdout) {
            cache.attach_parents(&hash, parents);
        }

        Ok(entries
            .into_iter()
            .filter_map(|(selector, message, hash)| {
                let revision = cache.get(&hash)?;
                Some(StashEntry {
                    selector,
                    message,
                    revision,
                })
            })
            .collect())
    }

    pub fn stash_save(&self, message: Option<&str>, include_untracked: bool) -> Result<()> {
        let mut args = GitArgs::new("stash")
            .param("push")
            .flag_if(include_untracked, "--include-untracked");
        if let Some(message) = message {
            args = args.param("-m").param(message);
        }
        ensure(self.run(&args)?, error::classify_stash)?;
        Ok(())
    }

    pub fn stash_pop(&self, selector: Option<&str>) -> Result<()> {
        self.stash_op("pop", selector)
    }

    pub fn stash_apply(&self, selector: Option<&str>) -> Result<()> {
        self.stash_op("apply", selector)
    }

    pub fn stash_drop(&self, selector: Option<&str>) -> Result<()> {
        self.stash_op("drop", selector)
    }

    fn stash_op(&self, verb: &str, selector: Option<&str>) -> Result<()> {
        let args = GitArgs::new("stash")
            .param(verb)
            .param_opt(selector);
        ensure(self.run(&args)?, error::classify_stash)?;
        Ok(())
    }
}

// Remotes and transport.
impl Git {
    pub fn remotes(&self) -> Result<Vec<GitRemote>> {
        let outcome = ensure_generic(self.run(&GitArgs::new("remote").flag("-v"))?)?;
        Ok(parse_remotes(&outcome.stdout))
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        let args = GitArgs::new("remote").param("add").param(name).param(url);
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    pub fn remove_remote(&self, name: &str) -> Result<()> {
        let args = GitArgs::new("remote").param("remove").param(name);
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    pub fn set_remote_url(&self, name: &str, url: &str) -> Result<()> {
        let args = GitArgs::new("remote").param("set-url").param(name).param(url);
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    pub fn fetch(&self, remote: Option<&str>, refspec: Option<&str>) -> Result<()> {
        let args = GitArgs::new("fetch").param_opt(remote).param_opt(refspec);
        ensure_generic(self.run(&args)?)?;
        Ok(())
    }

    pub async fn fetch_async(
        &self,
        remote: Option<&str>,
        refspec: Option<&str>,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let args = GitArgs::new("fetch")
            .flag("--progress")
            .param_opt(remote)
            .param_opt(refspec);
        let outcome = self
            .run_streaming(&args, progress, Some(cancel), CancelMode::Kill)
            .await?;
        ensure_generic(outcome)?;
        Ok(())
    }

    pub fn pull(&self, remote: Option<&str>, branch: Option<&str>) -> Result<()> {
        let args = GitArgs::new("pull").param_opt(remote).param_opt(branch);
        ensure(self.run(&args)?, error::classify_merge)?;
        Ok(())
    }

    pub async fn pull_async(
        &self,
        remote: Option<&str>,
        branch: Option<&str>,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let args = GitArgs::new("pull")
            .flag("--progress")
            .param_opt(remote)
            .param_opt(branch);
        let outcome = self
            .run_streaming(&args, progress, Some(cancel), CancelMode::Kill)
            .await?;
        ensure(outcome, error::classify_merge)?;
        Ok(())
    }

    /// Push with porcelain ref results. A failing push whose output still
    /// carries per-ref results returns them (the flags mark rejections);
    /// otherwise the failure is classified.
    pub fn push(&self, remote: &str, refspec: &str, force: bool) -> Result<Vec<PushResult>> {
        let args = GitArgs::new("push")
            .flag("--porcelain")
            .flag_if(force, "--force")
            .param(remote)
            .param(refspec);
        let outcome = self.run(&args)?;
        self.push_results(outcome)
    }

    pub async fn push_async(
        &self,
        remote: &str,
        refspec: &str,
        force: bool,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<Vec<PushResult>> {
        let args = GitArgs::new("push")
            .flag("--porcelain")
            .flag("--progress")
            .flag_if(force, "--force")
            .param(remote)
            .param(refspec);
        let outcome = self
            .run_streaming(&args, progress, Some(cancel), CancelMode::Kill)
            .await?;
        self.push_results(outcome)
    }

    fn push_results(&self, outcome: ExecOutcome) -> Result<Vec<PushResult>> {
        let results = parse_push_results(&outcome.stdout);
        if outcome.success() || !results.is_empty() {
            Ok(results)
        } else {
            Err(error::generic_failure(&outcome))
        }
    }
}

// Trees, blobs and config.
impl Git {
    pub fn ls_tree(&self, revision: &str, path: Option<&Path>, recursive: bool) -> Result<Vec<TreeEntry>> {
        let mut args = GitArgs::new("ls-tree")
            .flag("-z")
            .flag_if(recursive, "-r")
            .param(revision);
        if let Some(path) = path {
            args = args.no_more_options().path(path);
        }
        let outcome = ensure(self.run(&args)?, |o| {
            error::classify_revision(o, Some(revision))
        })?;
        Ok(crate::parse::refs::parse_tree(&outcome.stdout)?)
    }

    /// Raw text payload of `<revision>:<path>`.
    pub fn cat_file(&self, revision: &str, path: &Path) -> Result<String> {
        let spec = format!("{revision}:{}", path.display());
        let args = GitArgs::new("show").param(&spec);
        let outcome = ensure(self.run(&args)?, |o| error::classify_revision(o, None))?;
        Ok(outcome.stdout)
    }

    pub fn config_get(&self, key: &str, scope: ConfigScope) -> Result<String> {
        let args = self
            .config_args(scope)
            .param("--get")
            .param(key);
        let outcome = ensure(self.run_config(&args, scope)?, error::classify_config)?;
        Ok(outcome.stdout.trim_end_matches(['\r', '\n']).to_string())
    }

    pub fn config_set(&self, key: &str, value: &str, scope: ConfigScope) -> Result<()> {
        let args = self.config_args(scope).param(key).param(value);
        ensure(self.run_config(&args, scope)?, error::classify_config)?;
        Ok(())
    }

    pub fn config_unset(&self, key: &str, scope: ConfigScope) -> Result<()> {
        let args = self.config_args(scope).param("--unset").param(key);
        ensure(self.run_config(&args, scope)?, error::classify_config)?;
        Ok(())
    }

    pub fn config_list(&self, scope: ConfigScope) -> Result<Vec<crate::models::ConfigEntry>> {
        let args = self.config_args(scope).param("--list").flag("-z");
        let outcome = ensure(self.run_config(&args, scope)?, error::classify_config)?;
        Ok(parse_config_list(&outcome.stdout))
    }

    fn config_args(&self, scope: ConfigScope) -> GitArgs {
        let args = GitArgs::new("config");
        match scope {
            ConfigScope::Local => args,
            ConfigScope::Global => args.flag("--global"),
        }
    }

    /// Global config addresses the user's file and needs no repository.
    fn run_config(&self, args: &GitArgs, scope: ConfigScope) -> Result<ExecOutcome> {
        match scope {
            ConfigScope::Local => self.run(args),
            ConfigScope::Global => self.run_global(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_code_never_classifies() {
        // Even with a known error template in stderr, a successful exit
        // passes through untouched.
        let outcome = ExecOutcome {
            exit_code: 0,
            stdout: String::new(),
            stderr: "fatal: ambiguous argument 'deadbeef': unknown revision or path not in the working tree.\n".to_string(),
        };
        assert!(ensure(outcome, |o| error::classify_revision(o, None)).is_ok());
    }

    #[test]
    fn unmatched_failure_falls_back_to_generic() {
        let outcome = ExecOutcome {
            exit_code: 129,
            stdout: String::new(),
            stderr: "usage: git nonsense\n".to_string(),
        };
        assert!(matches!(
            ensure(outcome, |o| error::classify_revision(o, None)),
            Err(GitError::Failed { exit_code: 129, .. })
        ));
    }
}
