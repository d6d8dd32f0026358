//! Fixed-field-order listing grammars: references, push results, remotes,
//! tree listings, config listings and working-tree status.

use crate::{
    cursor::Cursor,
    models::{
        ConfigEntry, GitRef, GitRemote, PushFlag, PushResult, RefKind, StatusEntry, TreeEntry,
        TreeEntryKind, WorktreeStatus,
    },
    parse::{ParseError, is_hex_hash},
};

/// Parse `for-each-ref --format='%(objectname) %(refname)'` output.
pub fn parse_refs(output: &str) -> Vec<GitRef> {
    let mut refs = Vec::new();
    let mut cursor = Cursor::new(output);
    while !cursor.is_at_end() {
        let (line, _) = cursor.read_line();
        let Some((hash, full_name)) = line.split_once(' ') else {
            continue;
        };
        if !is_hex_hash(hash) {
            continue;
        }
        let (name, kind) = classify_ref(full_name.trim());
        refs.push(GitRef {
            hash: hash.to_string(),
            name,
            full_name: full_name.trim().to_string(),
            kind,
        });
    }
    refs
}

fn classify_ref(full_name: &str) -> (String, RefKind) {
    if let Some(name) = full_name.strip_prefix("refs/heads/") {
        (name.to_string(), RefKind::LocalBranch)
    } else if let Some(name) = full_name.strip_prefix("refs/remotes/") {
        let remote = name.split('/').next().unwrap_or("").to_string();
        (name.to_string(), RefKind::RemoteBranch { remote })
    } else if let Some(name) = full_name.strip_prefix("refs/tags/") {
        (name.to_string(), RefKind::Tag)
    } else {
        (full_name.to_string(), RefKind::Other)
    }
}

/// Parse the ref-result lines of `git push --porcelain`. The surrounding
/// `To <url>` and `Done` lines are skipped.
pub fn parse_push_results(output: &str) -> Vec<PushResult> {
    let mut results = Vec::new();
    let mut cursor = Cursor::new(output);
    while !cursor.is_at_end() {
        let (line, _) = cursor.read_line();
        let mut chars = line.chars();
        let flag = match chars.next() {
            Some(' ') => PushFlag::FastForward,
            Some('+') => PushFlag::Forced,
            Some('-') => PushFlag::Deleted,
            Some('*') => PushFlag::New,
            Some('!') => PushFlag::Rejected,
            Some('=') => PushFlag::UpToDate,
            _ => continue,
        };
        // The flag is followed by a tab, then tab-separated fields.
        let rest = chars.as_str();
        let Some(rest) = rest.strip_prefix('\t') else {
            continue;
        };
        let mut fields = rest.split('\t');
        let Some(refspec) = fields.next() else {
            continue;
        };
        let Some((from, to)) = refspec.split_once(':') else {
            continue;
        };
        results.push(PushResult {
            flag,
            from: from.to_string(),
            to: to.to_string(),
            summary: fields.next().unwrap_or("").to_string(),
        });
    }
    results
}

/// Parse `git remote -v`: `name\turl (fetch)` / `name\turl (push)` pairs,
/// deduplicated by remote name.
pub fn parse_remotes(output: &str) -> Vec<GitRemote> {
    let mut seen = std::collections::HashSet::new();
    let mut remotes = Vec::new();
    let mut cursor = Cursor::new(output);
    while !cursor.is_at_end() {
        let (line, _) = cursor.read_line();
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, rest)) = line.split_once('\t') else {
            continue;
        };
        let url = rest
            .strip_suffix(" (fetch)")
            .or_else(|| rest.strip_suffix(" (push)"))
            .unwrap_or(rest);
        if seen.insert(name.to_string()) {
            remotes.push(GitRemote {
                name: name.to_string(),
                url: url.to_string(),
            });
        }
    }
    remotes
}

/// Parse `git ls-tree -z`: `<mode> <type> <hash>\t<name>` NUL-terminated.
pub fn parse_tree(output: &str) -> Result<Vec<TreeEntry>, ParseError> {
    let mut entries = Vec::new();
    let mut offset = 0;
    for record in output.split('\0') {
        if record.is_empty() {
            offset += 1;
            continue;
        }
        let entry = parse_tree_record(record)
            .ok_or_else(|| ParseError::new(format!("malformed tree record {record:?}"), offset))?;
        entries.push(entry);
        offset += record.len() + 1;
    }
    Ok(entries)
}

fn parse_tree_record(record: &str) -> Option<TreeEntry> {
    let (meta, name) = record.split_once('\t')?;
    let mut fields = meta.split(' ');
    let mode = fields.next()?;
    let kind = match fields.next()? {
        "blob" => TreeEntryKind::Blob,
        "tree" => TreeEntryKind::Tree,
        "commit" => TreeEntryKind::Commit,
        _ => return None,
    };
    let hash = fields.next()?;
    Some(TreeEntry {
        mode: mode.to_string(),
        kind,
        hash: hash.to_string(),
        name: name.to_string(),
    })
}

/// Parse `git config --list -z`: `key\nvalue` NUL-terminated records. A
/// record without a newline is a key set with no value.
pub fn parse_config_list(output: &str) -> Vec<ConfigEntry> {
    output
        .split('\0')
        .filter(|record| !record.is_empty())
        .map(|record| match record.split_once('\n') {
            Some((key, value)) => ConfigEntry {
                key: key.to_string(),
                value: value.to_string(),
            },
            None => ConfigEntry {
                key: record.to_string(),
                value: String::new(),
            },
        })
        .collect()
}

/// Parse `git status --porcelain -z`: `XY <path>` records, with the
/// original path as a separate following record for renames and copies.
/// `-z` output carries paths verbatim, so no unquoting happens here.
pub fn parse_status(output: &str) -> WorktreeStatus {
    let mut status = WorktreeStatus::default();
    let mut records = output.split('\0');
    while let Some(record) = records.next() {
        if record.len() < 4 {
            continue;
        }
        let bytes = record.as_bytes();
        let staged = bytes[0] as char;
        let unstaged = bytes[1] as char;
        let path = record[3..].to_string();

        let mut orig_path = None;
        if staged == 'R' || unstaged == 'R' || staged == 'C' || unstaged == 'C' {
            if let Some(old) = records.next()
                && !old.is_empty()
            {
                orig_path = Some(old.to_string());
            }
        }

        let is_untracked = staged == '?' && unstaged == '?';
        if is_untracked {
            status.untracked += 1;
        } else if staged != ' ' || unstaged != ' ' {
            status.uncommitted_tracked += 1;
        }
        status.entries.push(StatusEntry {
            staged,
            unstaged,
            path,
            orig_path,
            is_untracked,
        });
    }
    status
}
