//! Quoted-string decoding for paths in git output.
//!
//! With `core.quotepath` left at its default, git wraps filenames that
//! contain special or non-ASCII bytes in double quotes, interleaving
//! printable characters, two-character C-style escapes, and runs of
//! three-digit octal byte escapes. Octal runs are raw bytes: consecutive
//! runs may jointly encode one multi-byte character, so they accumulate in
//! a byte buffer that is flushed through the configured decoder whenever a
//! printable or two-character escape follows.

use workspace_utils::text::TextDecoder;

use crate::cursor::Cursor;

/// Decode a possibly-quoted value. Unquoted input is returned as-is.
pub fn decode_path(raw: &str, decoder: &TextDecoder) -> String {
    if !raw.starts_with('"') {
        return raw.to_string();
    }
    let mut cursor = Cursor::new(raw);
    decode_quoted(&mut cursor, decoder).unwrap_or_else(|| raw.to_string())
}

/// Decode a quoted string starting at the cursor's position, which must be
/// the opening quote. On success the cursor is left one past the closing
/// quote. Returns `None` when no closing quote exists; the cursor is
/// restored in that case.
pub fn decode_quoted(cursor: &mut Cursor<'_>, decoder: &TextDecoder) -> Option<String> {
    let saved = cursor.save();
    if !cursor.skip_if_matches("\"") {
        return None;
    }

    let mut out = String::new();
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let c = match cursor.read_char() {
            Some(c) => c,
            None => {
                cursor.restore(saved);
                return None;
            }
        };
        match c {
            '"' => break,
            '\\' => {
                let escaped = match cursor.read_char() {
                    Some(e) => e,
                    None => {
                        cursor.restore(saved);
                        return None;
                    }
                };
                if escaped.is_digit(8) {
                    // One octal run is exactly one byte; it joins the
                    // pending buffer rather than the character output.
                    let mut value = escaped as u32 - '0' as u32;
                    for _ in 0..2 {
                        match cursor.peek() {
                            Some(d) if d.is_digit(8) => {
                                cursor.skip(1);
                                value = value * 8 + (d as u32 - '0' as u32);
                            }
                            _ => break,
                        }
                    }
                    pending.push(value as u8);
                } else {
                    flush(&mut out, &mut pending, decoder);
                    out.push(match escaped {
                        'a' => '\x07',
                        'b' => '\x08',
                        't' => '\t',
                        'n' => '\n',
                        'v' => '\x0B',
                        'f' => '\x0C',
                        'r' => '\r',
                        other => other,
                    });
                }
            }
            literal => {
                flush(&mut out, &mut pending, decoder);
                out.push(literal);
            }
        }
    }

    flush(&mut out, &mut pending, decoder);
    Some(out)
}

fn flush(out: &mut String, pending: &mut Vec<u8>, decoder: &TextDecoder) {
    if !pending.is_empty() {
        out.push_str(&decoder.decode(pending));
        pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> String {
        decode_path(input, &TextDecoder::default())
    }

    #[test]
    fn unquoted_passes_through() {
        assert_eq!(decode("src/main.rs"), "src/main.rs");
    }

    #[test]
    fn two_character_escapes() {
        assert_eq!(decode(r#""a\tb\\c\"d""#), "a\tb\\c\"d");
    }

    #[test]
    fn octal_runs_join_into_multibyte_characters() {
        // é is 0xC3 0xA9 in UTF-8: two consecutive octal runs, one char.
        assert_eq!(decode(r#""caf\303\251.txt""#), "café.txt");
    }

    #[test]
    fn octal_runs_interleave_with_literals() {
        assert_eq!(decode(r#""a\303\251b\tc\303\251""#), "aéb\tcé");
        assert_eq!(decode(r#""x\303\251\303\251y""#), "xééy");
    }

    #[test]
    fn invalid_byte_run_uses_fallback_codepage() {
        // 0xE9 alone is invalid UTF-8; windows-1252 maps it to é.
        assert_eq!(decode(r#""\351.txt""#), "é.txt");
    }

    #[test]
    fn reference_decoding_matches_independent_construction() {
        // Build the same byte sequence independently and compare.
        let bytes: Vec<u8> = [b"prefix ".as_slice(), "日本".as_bytes(), b" suffix"].concat();
        let quoted = {
            let mut q = String::from('"');
            for &b in &bytes {
                if b.is_ascii_graphic() || b == b' ' {
                    q.push(b as char);
                } else {
                    q.push_str(&format!("\\{b:03o}"));
                }
            }
            q.push('"');
            q
        };
        assert_eq!(decode(&quoted), String::from_utf8(bytes).unwrap());
    }

    #[test]
    fn unterminated_quote_is_left_untouched() {
        let raw = "\"no closing quote";
        assert_eq!(decode(raw), raw);
        let mut cursor = Cursor::new(raw);
        assert!(decode_quoted(&mut cursor, &TextDecoder::default()).is_none());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn cursor_stops_after_closing_quote() {
        let mut cursor = Cursor::new(r#""a b" -> rest"#);
        let decoded = decode_quoted(&mut cursor, &TextDecoder::default()).unwrap();
        assert_eq!(decoded, "a b");
        assert_eq!(cursor.remaining(), " -> rest");
    }
}
