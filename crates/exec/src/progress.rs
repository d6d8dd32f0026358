//! Progress-line decoding for long-running operations.
//!
//! Git reports progress on stderr as lines shaped like
//! `Receiving objects:  42% (123/290)`. The decoder recognizes that shape
//! and turns it into a range event; anything else degrades to an
//! indeterminate event rather than an error.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Receiver half is owned by the caller of an async invocation.
pub type ProgressSender = UnboundedSender<ProgressEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// `<stage>: ... (<current>/<max>)`
    Range {
        stage: String,
        current: u64,
        max: u64,
    },
    /// A stderr line that does not carry a parsable range.
    Indeterminate { line: String },
}

/// Decode one stderr line into a progress event.
pub fn parse_progress_line(line: &str) -> ProgressEvent {
    match parse_range(line) {
        Some((stage, current, max)) => ProgressEvent::Range {
            stage,
            current,
            max,
        },
        None => ProgressEvent::Indeterminate {
            line: line.to_string(),
        },
    }
}

fn parse_range(line: &str) -> Option<(String, u64, u64)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let colon = line.find(':')?;
    let stage = line[..colon].trim();
    if stage.is_empty() {
        return None;
    }

    let open = line.rfind('(')?;
    if open < colon {
        return None;
    }
    let rest = &line[open + 1..];
    let close = rest.find(')')?;
    let (current, max) = rest[..close].split_once('/')?;
    let current = current.trim().parse().ok()?;
    let max = max.trim().parse().ok()?;
    Some((stage.to_string(), current, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiving_objects_line() {
        assert_eq!(
            parse_progress_line("Receiving objects:  42% (123/290)"),
            ProgressEvent::Range {
                stage: "Receiving objects".to_string(),
                current: 123,
                max: 290,
            }
        );
    }

    #[test]
    fn done_suffix_still_parses() {
        assert_eq!(
            parse_progress_line("Resolving deltas: 100% (10/10), done."),
            ProgressEvent::Range {
                stage: "Resolving deltas".to_string(),
                current: 10,
                max: 10,
            }
        );
    }

    #[test]
    fn missing_range_degrades_to_indeterminate() {
        for line in [
            "Compressing objects",
            "remote: Enumerating objects: 5, done.",
            ": (1/2)",
            "Counting objects: (x/y)",
            "Counting objects: (12)",
        ] {
            assert!(matches!(
                parse_progress_line(line),
                ProgressEvent::Indeterminate { .. }
            ));
        }
    }

    #[test]
    fn crlf_terminated_line() {
        assert_eq!(
            parse_progress_line("Checking out files:  7% (14/200)\r"),
            ProgressEvent::Range {
                stage: "Checking out files".to_string(),
                current: 14,
                max: 200,
            }
        );
    }
}
