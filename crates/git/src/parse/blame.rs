//! `git blame --porcelain` parsing.
//!
//! Commit metadata appears once per commit; later records for the same hash
//! carry only the hash line and the attributed content, so the per-parse
//! cache is what makes a second sighting resolve to the same object. Hunks
//! are formed wherever the attributed commit changes, compared by object
//! identity through the cache rather than by re-comparing hashes.

use std::sync::Arc;

use chrono::DateTime;

use crate::{
    cursor::Cursor,
    models::{Blame, BlameCommit, BlameHunk, BlameLine, BlamePrevious, Signature},
    parse::{BlameCache, ParseError, is_hex_hash},
};

pub fn parse_blame(output: &str, cache: &mut BlameCache) -> Result<Blame, ParseError> {
    let mut cursor = Cursor::new(output);
    let mut blame = Blame::default();
    let mut line_number: u32 = 0;

    while !cursor.is_at_end() {
        let position = cursor.position();
        let (header, _) = cursor.read_line();
        let hash = header.split(' ').next().unwrap_or("");
        if !is_hex_hash(hash) {
            return Err(ParseError::new(
                format!("malformed blame record header {header:?}"),
                position,
            ));
        }

        let commit = match cache.get(hash) {
            Some(cached) => {
                skip_to_content_line(&mut cursor);
                cached
            }
            None => read_commit_headers(&mut cursor, cache, hash, position)?,
        };

        let position = cursor.position();
        if !cursor.skip_if_matches("\t") {
            return Err(ParseError::new("missing blame content line", position));
        }
        let (text, line_ending) = cursor.read_line();
        line_number += 1;

        let line = BlameLine {
            commit: commit.clone(),
            line_number,
            text: text.to_string(),
            line_ending,
        };

        // A new hunk starts exactly when the attributed commit changes.
        match blame.hunks.last_mut() {
            Some(hunk) if Arc::ptr_eq(&hunk.commit, &commit) => hunk.lines.push(line),
            _ => blame.hunks.push(BlameHunk {
                commit,
                lines: vec![line],
            }),
        }
    }

    Ok(blame)
}

/// For a cached commit git emits no headers, but skipping to the `\t` line
/// also tolerates repeated `filename` headers.
fn skip_to_content_line(cursor: &mut Cursor<'_>) {
    while !cursor.is_at_end() && !cursor.starts_with("\t") {
        cursor.read_line();
    }
}

fn read_commit_headers(
    cursor: &mut Cursor<'_>,
    cache: &mut BlameCache,
    hash: &str,
    position: usize,
) -> Result<Arc<BlameCommit>, ParseError> {
    let mut author_name = String::new();
    let mut author_mail = String::new();
    let mut author_time = 0i64;
    let mut author_tz = String::new();
    let mut committer_name = String::new();
    let mut committer_mail = String::new();
    let mut committer_time = 0i64;
    let mut committer_tz = String::new();
    let mut summary = String::new();
    let mut boundary = false;
    let mut previous = None;
    let mut filename = None;

    while !cursor.is_at_end() && !cursor.starts_with("\t") {
        let (line, _) = cursor.read_line();
        if let Some(rest) = line.strip_prefix("author ") {
            author_name = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("author-mail ") {
            author_mail = strip_angle_brackets(rest);
        } else if let Some(rest) = line.strip_prefix("author-time ") {
            author_time = parse_time(rest);
        } else if let Some(rest) = line.strip_prefix("author-tz ") {
            author_tz = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("committer ") {
            committer_name = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("committer-mail ") {
            committer_mail = strip_angle_brackets(rest);
        } else if let Some(rest) = line.strip_prefix("committer-time ") {
            committer_time = parse_time(rest);
        } else if let Some(rest) = line.strip_prefix("committer-tz ") {
            committer_tz = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("summary ") {
            summary = rest.to_string();
        } else if line == "boundary" {
            boundary = true;
        } else if let Some(rest) = line.strip_prefix("previous ") {
            let (prev_hash, path) = rest.split_once(' ').unwrap_or((rest, ""));
            previous = Some(BlamePrevious {
                hash: prev_hash.to_string(),
                path: path.to_string(),
            });
        } else if let Some(rest) = line.strip_prefix("filename ") {
            filename = Some(rest.to_string());
            break;
        } else {
            tracing::trace!(line, "unrecognized blame header");
        }
    }

    let Some(filename) = filename else {
        return Err(ParseError::new(
            format!("blame record {hash} has no filename header"),
            position,
        ));
    };

    Ok(cache.insert(BlameCommit {
        hash: hash.to_string(),
        author: Signature {
            name: author_name,
            email: author_mail,
            when: DateTime::from_timestamp(author_time, 0).unwrap_or(DateTime::UNIX_EPOCH),
        },
        author_tz,
        committer: Signature {
            name: committer_name,
            email: committer_mail,
            when: DateTime::from_timestamp(committer_time, 0).unwrap_or(DateTime::UNIX_EPOCH),
        },
        committer_tz,
        summary,
        boundary,
        previous,
        filename,
    }))
}

fn strip_angle_brackets(mail: &str) -> String {
    mail.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

fn parse_time(field: &str) -> i64 {
    field.trim().parse().unwrap_or_else(|_| {
        tracing::debug!(field, "malformed blame timestamp, substituting epoch");
        0
    })
}
