//! Revision, reflog and stash record parsing.
//!
//! The compact wire format is requested with [`LOG_FORMAT`] and NUL-separated
//! records (`-z`): hash, tree hash, parent list, author triple, committer
//! triple, then the raw body. Reflog and stash listings prepend selector
//! (and message) lines to the same record shape and recover the true parent
//! graph with a second, raw-format pass against the same cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    cursor::Cursor,
    models::{Revision, Signature},
    parse::{ParseError, RevisionCache, is_hex_hash},
};

/// `--format` value producing one compact record per commit.
pub const LOG_FORMAT: &str = "%H%n%T%n%P%n%an%n%ae%n%at%n%cn%n%ce%n%ct%n%B";

/// Reflog variant: selector line first. Carries no parent list; the parent
/// graph is recovered by the raw-format pass.
pub const REFLOG_FORMAT: &str = "%gd%n%H%n%T%n%an%n%ae%n%at%n%cn%n%ce%n%ct%n%B";

/// Stash variant: selector line, then the reflog subject (stash message).
pub const STASH_FORMAT: &str = "%gd%n%gs%n%H%n%T%n%an%n%ae%n%at%n%cn%n%ce%n%ct%n%B";

/// Width of one hash plus its separator in a parent list.
const HASH_FIELD_WIDTH: usize = 41;

/// Parse a NUL-separated compact log listing. Every record is interned in
/// `cache`; the returned order is the output order.
pub fn parse_log(output: &str, cache: &mut RevisionCache) -> Result<Vec<Arc<Revision>>, ParseError> {
    let mut revisions = Vec::new();
    for_each_record(output, |record, offset| {
        let mut cursor = Cursor::new(record);
        revisions.push(parse_record(&mut cursor, cache, offset, true)?);
        Ok(())
    })?;
    Ok(revisions)
}

/// Parse a reflog listing ([`REFLOG_FORMAT`]) into `(selector, hash)` pairs,
/// interning each record. Parents are recovered separately by
/// [`parse_raw_parents`] before the entries are materialized.
pub fn parse_reflog(
    output: &str,
    cache: &mut RevisionCache,
) -> Result<Vec<(String, String)>, ParseError> {
    let mut entries = Vec::new();
    for_each_record(output, |record, offset| {
        let mut cursor = Cursor::new(record);
        let (selector, _) = cursor.read_line();
        let revision = parse_record(&mut cursor, cache, offset, false)?;
        entries.push((selector.to_string(), revision.hash.clone()));
        Ok(())
    })?;
    Ok(entries)
}

/// Parse a stash listing ([`STASH_FORMAT`]) into `(selector, message, hash)`
/// triples, interning each record.
pub fn parse_stash_list(
    output: &str,
    cache: &mut RevisionCache,
) -> Result<Vec<(String, String, String)>, ParseError> {
    let mut entries = Vec::new();
    for_each_record(output, |record, offset| {
        let mut cursor = Cursor::new(record);
        let (selector, _) = cursor.read_line();
        let (message, _) = cursor.read_line();
        let revision = parse_record(&mut cursor, cache, offset, false)?;
        entries.push((
            selector.to_string(),
            message.to_string(),
            revision.hash.clone(),
        ));
        Ok(())
    })?;
    Ok(entries)
}

/// Parse `--format=raw` output into `(hash, parents)` pairs. Used to
/// recover the parent graph for listings whose compact format does not
/// carry it.
pub fn parse_raw_parents(output: &str) -> Vec<(String, Vec<String>)> {
    let mut result: Vec<(String, Vec<String>)> = Vec::new();
    let mut cursor = Cursor::new(output);
    while !cursor.is_at_end() {
        let (line, _) = cursor.read_line();
        if let Some(rest) = line.strip_prefix("commit ") {
            let hash = rest.trim();
            if is_hex_hash(hash) {
                result.push((hash.to_string(), Vec::new()));
            }
        } else if let Some(rest) = line.strip_prefix("parent ")
            && let Some((_, parents)) = result.last_mut()
        {
            let parent = rest.trim();
            if is_hex_hash(parent) {
                parents.push(parent.to_string());
            }
        }
    }
    result
}

/// Split a buffer into NUL-separated records and run `f` on each non-empty
/// one, passing the record's byte offset for error positions.
fn for_each_record(
    output: &str,
    mut f: impl FnMut(&str, usize) -> Result<(), ParseError>,
) -> Result<(), ParseError> {
    let mut offset = 0;
    for record in output.split('\0') {
        if !record.is_empty() {
            f(record, offset)?;
        }
        offset += record.len() + 1;
    }
    Ok(())
}

/// Parse one compact record at the cursor. `base` is the record's offset in
/// the original buffer, used only for error positions. `with_parents` says
/// whether the format carried a parent list line.
fn parse_record(
    cursor: &mut Cursor<'_>,
    cache: &mut RevisionCache,
    base: usize,
    with_parents: bool,
) -> Result<Arc<Revision>, ParseError> {
    let hash = read_hash_line(cursor, base, "commit hash")?;

    if let Some(cached) = cache.get(&hash) {
        return Ok(cached);
    }

    let tree_hash = read_hash_line(cursor, base, "tree hash")?;
    let parent_hashes = if with_parents {
        read_parent_list(cursor, base)?
    } else {
        Vec::new()
    };

    let author = read_signature(cursor);
    let committer = read_signature(cursor);

    let (subject, body) = split_subject_body(cursor.remaining());

    Ok(cache.intern(Revision {
        hash,
        tree_hash,
        parent_hashes,
        author,
        committer,
        subject,
        body,
    }))
}

fn read_hash_line(cursor: &mut Cursor<'_>, base: usize, what: &str) -> Result<String, ParseError> {
    let position = base + cursor.position();
    let (line, _) = cursor.read_line();
    if !is_hex_hash(line) {
        return Err(ParseError::new(format!("malformed {what} {line:?}"), position));
    }
    Ok(line.to_string())
}

/// The parent list is a single line of 40-character hashes separated by
/// single spaces; the count falls out of the line width.
fn read_parent_list(cursor: &mut Cursor<'_>, base: usize) -> Result<Vec<String>, ParseError> {
    let line_end = cursor.find_line_end();
    let width = line_end.content_end - cursor.position();
    if width == 0 {
        cursor.skip(line_end.ending.len());
        return Ok(Vec::new());
    }

    let count = (width + 1) / HASH_FIELD_WIDTH;
    let mut parents = Vec::with_capacity(count);
    for _ in 0..count {
        let position = base + cursor.position();
        let end = (cursor.position() + 40).min(line_end.content_end);
        let hash = cursor.read_up_to(end, 1);
        if !is_hex_hash(hash) {
            return Err(ParseError::new(
                format!("malformed parent hash {hash:?}"),
                position,
            ));
        }
        parents.push(hash.to_string());
    }
    // read_up_to skipped the last separator or the `\n`; consume a dangling
    // `\n` left by a `\r\n` ending.
    if line_end.ending == crate::cursor::LineEnding::CrLf {
        cursor.skip(1);
    }
    Ok(parents)
}

fn read_signature(cursor: &mut Cursor<'_>) -> Signature {
    let (name, _) = cursor.read_line();
    let (email, _) = cursor.read_line();
    let (timestamp, _) = cursor.read_line();
    Signature {
        name: name.to_string(),
        email: email.to_string(),
        when: parse_timestamp(timestamp),
    }
}

/// Empty or non-numeric timestamps degrade to the unix epoch.
fn parse_timestamp(field: &str) -> DateTime<Utc> {
    match field.trim().parse::<i64>().ok().and_then(|secs| {
        DateTime::from_timestamp(secs, 0)
    }) {
        Some(when) => when,
        None => {
            tracing::debug!(field, "malformed timestamp, substituting epoch");
            DateTime::UNIX_EPOCH
        }
    }
}

/// Split a raw body at the first fully-empty line. Without one, the whole
/// text (trimmed of trailing line endings) is the subject and the body is
/// empty.
fn split_subject_body(text: &str) -> (String, String) {
    let mut cursor = Cursor::new(text);
    while !cursor.is_at_end() {
        let line_start = cursor.save();
        let (line, ending) = cursor.read_line();
        if line.is_empty() && !ending.is_none() {
            let subject = trim_line_endings(&text[..line_start]);
            let body = trim_line_endings(cursor.remaining());
            return (subject.to_string(), body.to_string());
        }
    }
    (trim_line_endings(text).to_string(), String::new())
}

fn trim_line_endings(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "cccccccccccccccccccccccccccccccccccccccc";
    const T: &str = "1111111111111111111111111111111111111111";

    fn record(hash: &str, parents: &[&str], body: &str) -> String {
        format!(
            "{hash}\n{T}\n{}\nAlice\nalice@example.com\n1700000000\nBob\nbob@example.com\n1700000100\n{body}",
            parents.join(" ")
        )
    }

    /// Reflog/stash records carry no parent list line.
    fn short_record(hash: &str, body: &str) -> String {
        format!(
            "{hash}\n{T}\nAlice\nalice@example.com\n1700000000\nBob\nbob@example.com\n1700000100\n{body}"
        )
    }

    #[test]
    fn single_record_round_trip() {
        let mut cache = RevisionCache::new();
        let output = record(A, &[B], "Fix the frobnicator\n\nLonger explanation.\n");
        let revisions = parse_log(&output, &mut cache).unwrap();
        assert_eq!(revisions.len(), 1);
        let rev = &revisions[0];
        assert_eq!(rev.hash, A);
        assert_eq!(rev.tree_hash, T);
        assert_eq!(rev.parent_hashes, vec![B.to_string()]);
        assert_eq!(rev.author.name, "Alice");
        assert_eq!(rev.committer.email, "bob@example.com");
        assert_eq!(rev.subject, "Fix the frobnicator");
        assert_eq!(rev.body, "Longer explanation.");
        assert_eq!(rev.author.when.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parent_count_follows_line_width() {
        let mut cache = RevisionCache::new();
        let output = record(A, &[B, C], "merge\n");
        let revisions = parse_log(&output, &mut cache).unwrap();
        assert_eq!(
            revisions[0].parent_hashes,
            vec![B.to_string(), C.to_string()]
        );

        let mut cache = RevisionCache::new();
        let root = record(A, &[], "root commit\n");
        let revisions = parse_log(&root, &mut cache).unwrap();
        assert!(revisions[0].parent_hashes.is_empty());
    }

    #[test]
    fn same_hash_resolves_to_identical_object() {
        let mut cache = RevisionCache::new();
        let output = format!("{}\0{}", record(A, &[], "one\n"), record(A, &[], "one\n"));
        let revisions = parse_log(&output, &mut cache).unwrap();
        assert_eq!(revisions.len(), 2);
        assert!(Arc::ptr_eq(&revisions[0], &revisions[1]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn malformed_timestamp_degrades_to_epoch() {
        let mut cache = RevisionCache::new();
        let output = format!(
            "{A}\n{T}\n\nAlice\nalice@example.com\nnot-a-number\nBob\nbob@example.com\n\nsubject\n"
        );
        let revisions = parse_log(&output, &mut cache).unwrap();
        assert_eq!(revisions[0].author.when, DateTime::UNIX_EPOCH);
        assert_eq!(revisions[0].committer.when, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn body_without_empty_line_is_all_subject() {
        let mut cache = RevisionCache::new();
        let output = record(A, &[], "only a subject line\n");
        let revisions = parse_log(&output, &mut cache).unwrap();
        assert_eq!(revisions[0].subject, "only a subject line");
        assert_eq!(revisions[0].body, "");
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let mut cache = RevisionCache::new();
        let err = parse_log("not-a-hash\n", &mut cache).unwrap_err();
        assert!(err.message.contains("commit hash"));
    }

    #[test]
    fn reflog_selectors_and_raw_parent_recovery() {
        let mut cache = RevisionCache::new();
        let output = format!(
            "HEAD@{{0}}\n{}\0HEAD@{{1}}\n{}",
            short_record(A, "newest\n"),
            short_record(B, "older\n")
        );
        let entries = parse_reflog(&output, &mut cache).unwrap();
        assert_eq!(entries[0].0, "HEAD@{0}");
        assert_eq!(entries[1].1, B);
        assert!(cache.get(A).unwrap().parent_hashes.is_empty());

        let raw = format!(
            "commit {A}\ntree {T}\nparent {B}\nauthor Alice <a@e> 1700000000 +0000\n\n    newest\n\ncommit {B}\ntree {T}\n\n    older\n"
        );
        for (hash, parents) in parse_raw_parents(&raw) {
            cache.attach_parents(&hash, parents);
        }
        assert_eq!(cache.get(A).unwrap().parent_hashes, vec![B.to_string()]);
        assert!(cache.get(B).unwrap().parent_hashes.is_empty());
    }

    #[test]
    fn reflog_identity_is_preserved_across_both_passes() {
        let mut cache = RevisionCache::new();
        let output = format!(
            "HEAD@{{0}}\n{}\0HEAD@{{1}}\n{}",
            short_record(A, "same commit\n"),
            short_record(A, "same commit\n")
        );
        let entries = parse_reflog(&output, &mut cache).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(cache.len(), 1);
        let first = cache.get(&entries[0].1).unwrap();
        let second = cache.get(&entries[1].1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn stash_list_carries_selector_and_message() {
        let mut cache = RevisionCache::new();
        let output = format!(
            "stash@{{0}}\nWIP on main: 1234abc fix\n{}",
            short_record(A, "WIP\n")
        );
        let entries = parse_stash_list(&output, &mut cache).unwrap();
        assert_eq!(
            entries[0],
            (
                "stash@{0}".to_string(),
                "WIP on main: 1234abc fix".to_string(),
                A.to_string()
            )
        );
    }
}
