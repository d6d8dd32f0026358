//! Byte-to-text decoding for subprocess output.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Decodes raw output bytes with a configurable primary encoding, falling
/// back to a single-byte codepage for byte sequences the primary cannot
/// represent. The fallback is total: every byte maps to some character, so
/// `decode` never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDecoder {
    primary: &'static Encoding,
    fallback: &'static Encoding,
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self {
            primary: UTF_8,
            fallback: WINDOWS_1252,
        }
    }
}

impl TextDecoder {
    pub fn new(primary: &'static Encoding, fallback: &'static Encoding) -> Self {
        Self { primary, fallback }
    }

    /// Look up an encoding by its WHATWG label ("utf-8", "windows-1251", ...).
    pub fn with_labels(primary: &str, fallback: &str) -> Option<Self> {
        Some(Self {
            primary: Encoding::for_label(primary.as_bytes())?,
            fallback: Encoding::for_label(fallback.as_bytes())?,
        })
    }

    pub fn primary(&self) -> &'static Encoding {
        self.primary
    }

    /// Decode `bytes` with the primary encoding; if any sequence is malformed,
    /// re-decode the whole slice with the fallback codepage instead. Callers
    /// that need finer granularity pass smaller slices (the escape decoder
    /// flushes one pending byte run at a time).
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self
            .primary
            .decode_without_bom_handling_and_without_replacement(bytes)
        {
            Some(text) => text.into_owned(),
            None => {
                tracing::debug!(
                    len = bytes.len(),
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "primary decode failed, substituting fallback codepage"
                );
                let (text, _, _) = self.fallback.decode(bytes);
                text.into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        let d = TextDecoder::default();
        assert_eq!(d.decode("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn invalid_utf8_falls_back_to_codepage() {
        let d = TextDecoder::default();
        // 0xE9 alone is not valid UTF-8; windows-1252 maps it to é.
        assert_eq!(d.decode(&[0x61, 0xE9, 0x62]), "aéb");
    }

    #[test]
    fn labels_resolve() {
        let d = TextDecoder::with_labels("utf-8", "windows-1251").unwrap();
        // 0xE9 in windows-1251 is CYRILLIC SMALL LETTER SHCHA.
        assert_eq!(d.decode(&[0xE9]), "й");
        assert!(TextDecoder::with_labels("no-such-encoding", "utf-8").is_none());
    }

    #[test]
    fn empty_input() {
        assert_eq!(TextDecoder::default().decode(b""), "");
    }
}
