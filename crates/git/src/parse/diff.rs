//! Unified and combined (N-way) diff parsing.
//!
//! A unified diff has two columns (old/new); a combined diff for a merge of
//! P parents has P+1 (one per parent plus the result). Every content line
//! carries C-1 leading state characters; the per-line state machine resolves
//! them with removed > added > context precedence and keeps one running line
//! counter per column.

use workspace_utils::text::TextDecoder;

use crate::{
    cursor::{Cursor, LineEnding},
    escape,
    models::{
        ColumnAction, ColumnHeader, Diff, DiffFile, DiffHunk, DiffLine, DiffStats, FileStatus,
        HunkStats, LineState,
    },
    parse::ParseError,
};

pub fn parse_diff(output: &str, decoder: &TextDecoder) -> Result<Diff, ParseError> {
    let mut cursor = Cursor::new(output);
    let mut diff = Diff::default();

    skip_until_file_header(&mut cursor);
    while !cursor.is_at_end() {
        let file = parse_file(&mut cursor, decoder)?;
        diff.stats.absorb(&file.stats);
        diff.files.push(file);
        skip_until_file_header(&mut cursor);
    }
    Ok(diff)
}

fn is_at_file_header(cursor: &Cursor<'_>) -> bool {
    cursor.starts_with("diff --git ")
        || cursor.starts_with("diff --cc ")
        || cursor.starts_with("diff --combined ")
}

fn skip_until_file_header(cursor: &mut Cursor<'_>) {
    while !cursor.is_at_end() && !is_at_file_header(cursor) {
        let (line, _) = cursor.read_line();
        tracing::trace!(line, "skipping non-diff line");
    }
}

/// Header lines recognized once per diff file. A combined diff repeats
/// nothing per parent here, so each is guarded by its own seen flag.
#[derive(Default)]
struct SeenHeaders {
    old_mode: bool,
    new_mode: bool,
    deleted_file: bool,
    new_file: bool,
    copy_from: bool,
    copy_to: bool,
    rename_from: bool,
    rename_to: bool,
    similarity: bool,
    dissimilarity: bool,
    index: bool,
    combined_mode: bool,
}

fn parse_file(cursor: &mut Cursor<'_>, decoder: &TextDecoder) -> Result<DiffFile, ParseError> {
    let mut file = DiffFile {
        old_path: String::new(),
        new_path: String::new(),
        old_id: None,
        new_id: None,
        old_mode: None,
        new_mode: None,
        status: FileStatus::Modified,
        hunks: Vec::new(),
        is_binary: false,
        binary_patch: None,
        stats: DiffStats::default(),
    };

    parse_intro_line(cursor, decoder, &mut file);
    file.stats.header_lines += 1;

    let mut seen = SeenHeaders::default();
    let mut binary_marker_line: Option<String> = None;

    while !cursor.is_at_end() && !cursor.starts_with("@@") && !is_at_file_header(cursor) {
        if cursor.starts_with("GIT binary patch") {
            cursor.read_line();
            file.stats.header_lines += 1;
            file.is_binary = true;
            file.binary_patch = Some(read_binary_patch(cursor, &mut file.stats));
            continue;
        }

        let (line, _) = cursor.read_line();
        file.stats.header_lines += 1;

        if let Some(rest) = line.strip_prefix("old mode ") {
            if !seen.old_mode {
                seen.old_mode = true;
                file.old_mode = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("new mode ") {
            if !seen.new_mode {
                seen.new_mode = true;
                file.new_mode = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("deleted file mode ") {
            if !seen.deleted_file {
                seen.deleted_file = true;
                file.status = FileStatus::Deleted;
                file.old_mode = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("new file mode ") {
            if !seen.new_file {
                seen.new_file = true;
                file.status = FileStatus::Added;
                file.new_mode = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("copy from ") {
            if !seen.copy_from {
                seen.copy_from = true;
                file.status = FileStatus::Copied;
                file.old_path = escape::decode_path(rest, decoder);
            }
        } else if let Some(rest) = line.strip_prefix("copy to ") {
            if !seen.copy_to {
                seen.copy_to = true;
                file.new_path = escape::decode_path(rest, decoder);
            }
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            if !seen.rename_from {
                seen.rename_from = true;
                file.status = FileStatus::Renamed;
                file.old_path = escape::decode_path(rest, decoder);
            }
        } else if let Some(rest) = line.strip_prefix("rename to ") {
            if !seen.rename_to {
                seen.rename_to = true;
                file.new_path = escape::decode_path(rest, decoder);
            }
        } else if line.starts_with("similarity index ") {
            seen.similarity = true;
        } else if line.starts_with("dissimilarity index ") {
            seen.dissimilarity = true;
        } else if let Some(rest) = line.strip_prefix("index ") {
            if !seen.index {
                seen.index = true;
                parse_index_line(rest, &mut file);
            }
        } else if let Some(rest) = line.strip_prefix("mode ") {
            // Combined diff mode line: `mode <old>,<old>..<new>`.
            if !seen.combined_mode
                && let Some((old, new)) = rest.split_once("..")
            {
                seen.combined_mode = true;
                file.old_mode = Some(
                    old.split(',').next().unwrap_or(old).trim().to_string(),
                );
                file.new_mode = Some(new.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("--- ") {
            file.old_path = header_path(rest, "a/", decoder);
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            file.new_path = header_path(rest, "b/", decoder);
        } else if line.starts_with("Binary files ") && line.ends_with(" differ") {
            file.is_binary = true;
            binary_marker_line = Some(line.to_string());
        } else {
            tracing::trace!(line, "unrecognized diff header line");
        }
    }

    if let Some(marker) = binary_marker_line {
        // A binary file becomes a single-hunk pseudo-diff: the marker text,
        // no columns, no add/remove content.
        file.hunks.push(DiffHunk {
            columns: Vec::new(),
            lines: vec![DiffLine {
                state: LineState::Context,
                column_states: Vec::new(),
                column_numbers: Vec::new(),
                text: marker,
                line_ending: LineEnding::None,
            }],
            stats: HunkStats::default(),
        });
        file.stats.binary_files += 1;
        return Ok(file);
    }
    if file.binary_patch.is_some() {
        file.stats.binary_files += 1;
        return Ok(file);
    }

    while cursor.starts_with("@@") {
        let hunk = parse_hunk(cursor, &mut file.stats)?;
        file.stats.added += hunk.stats.added;
        file.stats.removed += hunk.stats.removed;
        file.hunks.push(hunk);
    }

    Ok(file)
}

/// `diff --git a/<old> b/<new>`, `diff --cc <path>` or
/// `diff --combined <path>`. Quoted paths go through the escape decoder;
/// the `---`/`+++` header lines override whatever is read here.
fn parse_intro_line(cursor: &mut Cursor<'_>, decoder: &TextDecoder, file: &mut DiffFile) {
    if cursor.skip_if_matches("diff --git ") {
        let (line, _) = cursor.read_line();
        let (old, new) = split_git_paths(line, decoder);
        file.old_path = old;
        file.new_path = new;
        return;
    }
    for marker in ["diff --cc ", "diff --combined "] {
        if cursor.skip_if_matches(marker) {
            let (line, _) = cursor.read_line();
            let path = escape::decode_path(line.trim(), decoder);
            file.old_path = path.clone();
            file.new_path = path;
            return;
        }
    }
    cursor.read_line();
}

fn split_git_paths(line: &str, decoder: &TextDecoder) -> (String, String) {
    let mut cursor = Cursor::new(line);
    let old = if cursor.starts_with("\"") {
        let old = escape::decode_quoted(&mut cursor, decoder);
        cursor.skip_if_matches(" ");
        old
    } else {
        // Unquoted paths contain no spaces, so ` b/` is unambiguous.
        cursor.find_str(" b/").map(|at| {
            let old = cursor.read_up_to(at, 1).to_string();
            old
        })
    };
    let new = if cursor.starts_with("\"") {
        escape::decode_quoted(&mut cursor, decoder)
    } else {
        Some(cursor.remaining().to_string())
    };

    let strip = |p: String, prefix: &str| -> String {
        p.strip_prefix(prefix).map(str::to_string).unwrap_or(p)
    };
    (
        strip(old.unwrap_or_default(), "a/"),
        strip(new.unwrap_or_default(), "b/"),
    )
}

fn header_path(rest: &str, prefix: &str, decoder: &TextDecoder) -> String {
    let decoded = escape::decode_path(rest.trim_end(), decoder);
    decoded
        .strip_prefix(prefix)
        .map(str::to_string)
        .unwrap_or(decoded)
}

/// `index <old>..<new>[ <mode>]`; a combined variant lists several old ids
/// separated by commas, of which the first is kept.
fn parse_index_line(rest: &str, file: &mut DiffFile) {
    let (ids, mode) = match rest.split_once(' ') {
        Some((ids, mode)) => (ids, Some(mode.trim())),
        None => (rest, None),
    };
    if let Some((old, new)) = ids.split_once("..") {
        file.old_id = Some(old.split(',').next().unwrap_or(old).to_string());
        file.new_id = Some(new.to_string());
    }
    if let Some(mode) = mode
        && !mode.is_empty()
        && file.new_mode.is_none()
    {
        file.new_mode = Some(mode.to_string());
    }
}

/// Opaque `literal <n>` / `delta <n>` base85 blocks. Each block runs to an
/// empty line; a second block (the reverse patch) may follow directly.
fn read_binary_patch(cursor: &mut Cursor<'_>, stats: &mut DiffStats) -> String {
    let mut patch = String::new();
    while cursor.starts_with("literal ") || cursor.starts_with("delta ") {
        loop {
            if cursor.is_at_end() {
                return patch;
            }
            let (line, ending) = cursor.read_line();
            stats.header_lines += 1;
            patch.push_str(line);
            patch.push_str(ending.as_str());
            if line.is_empty() {
                break;
            }
        }
    }
    patch
}

fn parse_hunk(cursor: &mut Cursor<'_>, file_stats: &mut DiffStats) -> Result<DiffHunk, ParseError> {
    let columns = parse_hunk_header(cursor)?;
    file_stats.header_lines += 1;

    let column_count = columns.len();
    let state_chars = column_count - 1;
    let mut counters: Vec<u32> = columns.iter().map(|c| c.start_line).collect();
    let mut remaining: Vec<i64> = columns.iter().map(|c| i64::from(c.line_count)).collect();

    let mut lines: Vec<DiffLine> = Vec::new();
    let mut stats = HunkStats::default();

    while remaining.iter().any(|r| *r > 0) {
        if cursor.is_at_end() || cursor.starts_with("@@") || is_at_file_header(cursor) {
            break;
        }
        if cursor.starts_with("\\") {
            absorb_no_newline_marker(cursor, &mut lines, file_stats);
            continue;
        }

        let position = cursor.position();
        let (line, line_ending) = cursor.read_line();
        if line.len() < state_chars || !line.is_char_boundary(state_chars) {
            return Err(ParseError::new("short diff line", position));
        }
        let markers: Vec<char> = line[..state_chars].chars().collect();
        if markers.iter().any(|c| !matches!(c, ' ' | '+' | '-')) {
            return Err(ParseError::new(
                format!("unexpected diff line state {:?}", &line[..state_chars]),
                position,
            ));
        }
        let text = line[state_chars..].to_string();

        let mut column_states = vec![LineState::Context; column_count];
        let mut column_numbers = vec![None; column_count];
        let result = column_count - 1;

        // Removed wins over added wins over context.
        let state = if markers.contains(&'-') {
            for (k, marker) in markers.iter().enumerate() {
                if *marker == '-' {
                    column_states[k] = LineState::Removed;
                    column_numbers[k] = Some(counters[k]);
                    counters[k] += 1;
                    remaining[k] -= 1;
                } else {
                    // Not present in this parent either; the counter stands.
                    column_states[k] = LineState::NotPresent;
                }
            }
            column_states[result] = LineState::NotPresent;
            LineState::Removed
        } else if markers.contains(&'+') {
            for (k, marker) in markers.iter().enumerate() {
                if *marker == '+' {
                    column_states[k] = LineState::Added;
                } else {
                    column_numbers[k] = Some(counters[k]);
                    counters[k] += 1;
                    remaining[k] -= 1;
                }
            }
            column_states[result] = LineState::Added;
            column_numbers[result] = Some(counters[result]);
            counters[result] += 1;
            remaining[result] -= 1;
            LineState::Added
        } else {
            for k in 0..column_count {
                column_numbers[k] = Some(counters[k]);
                counters[k] += 1;
                remaining[k] -= 1;
            }
            LineState::Context
        };

        match state {
            LineState::Added => stats.added += 1,
            LineState::Removed => stats.removed += 1,
            _ => {}
        }

        lines.push(DiffLine {
            state,
            column_states,
            column_numbers,
            text,
            line_ending,
        });
    }

    if cursor.starts_with("\\") {
        absorb_no_newline_marker(cursor, &mut lines, file_stats);
    }

    Ok(DiffHunk {
        columns,
        lines,
        stats,
    })
}

/// `\ No newline at end of file`: the preceding line had no terminator.
fn absorb_no_newline_marker(
    cursor: &mut Cursor<'_>,
    lines: &mut [DiffLine],
    file_stats: &mut DiffStats,
) {
    cursor.read_line();
    file_stats.header_lines += 1;
    if let Some(last) = lines.last_mut() {
        last.line_ending = LineEnding::None;
    }
}

/// `@@ -a[,b] +c[,d] @@ ...` for unified, `@@@ -a,b -c,d +e,f @@@ ...` for
/// combined: the number of leading `@`s is the column count; `C-1` remove
/// specs and exactly one add spec follow. A missing count defaults to 1.
fn parse_hunk_header(cursor: &mut Cursor<'_>) -> Result<Vec<ColumnHeader>, ParseError> {
    let position = cursor.position();
    let mut column_count = 0usize;
    while cursor.skip_if_matches("@") {
        column_count += 1;
    }
    if column_count < 2 {
        return Err(ParseError::new("malformed hunk header", position));
    }

    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        cursor.skip_if_matches(" ");
        let action = if cursor.skip_if_matches("-") {
            ColumnAction::Remove
        } else if cursor.skip_if_matches("+") {
            ColumnAction::Add
        } else {
            return Err(ParseError::new("missing hunk range spec", cursor.position()));
        };
        let start_line = read_u32(cursor)
            .ok_or_else(|| ParseError::new("missing hunk start line", cursor.position()))?;
        let line_count = if cursor.skip_if_matches(",") {
            read_u32(cursor)
                .ok_or_else(|| ParseError::new("missing hunk line count", cursor.position()))?
        } else {
            1
        };
        columns.push(ColumnHeader {
            action,
            start_line,
            line_count,
        });
    }

    let removes = columns
        .iter()
        .filter(|c| c.action == ColumnAction::Remove)
        .count();
    if removes != column_count - 1 || columns.last().map(|c| c.action) != Some(ColumnAction::Add) {
        return Err(ParseError::new("inconsistent hunk range specs", position));
    }

    // The closing delimiter and any function context are display-only.
    cursor.read_line();
    Ok(columns)
}

fn read_u32(cursor: &mut Cursor<'_>) -> Option<u32> {
    let mut value: Option<u32> = None;
    while let Some(c) = cursor.peek() {
        let Some(digit) = c.to_digit(10) else { break };
        cursor.skip(1);
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
    }
    value
}
