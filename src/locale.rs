//! Minimal locale descriptor: the core only needs to know whether it is
//! running in a UTF-8 (or otherwise multibyte) locale, since that changes
//! how the exact-keyword shortcut (spec.md §4.1 step 2) validates a hit
//! doesn't begin inside a continuation byte. Full ICU-style wide-character
//! classification is not reimplemented; Rust's native `char`/`str` already
//! does UTF-8 decoding, so the only thing this module supplies is the
//! locale's "am I multibyte, and is it UTF-8" flags, built from the
//! `LC_ALL`/`LC_CTYPE`/`LANG` environment variables.

use std::env;

/// Character classification mode a compiled matcher operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// A single byte is always one character; no continuation-byte checks
    /// are needed.
    SingleByte,
    /// UTF-8: `str`/`char` boundary checks apply.
    Utf8,
    /// Some other multibyte encoding we don't decode; treated conservatively
    /// like UTF-8 for continuation-byte purposes.
    OtherMultibyte,
}

#[derive(Debug, Clone, Copy)]
pub struct Locale {
    pub encoding: Encoding,
}

impl Locale {
    /// Reads `LC_ALL`, then `LC_CTYPE`, then `LANG`, in POSIX precedence
    /// order, and classifies the result.
    #[must_use]
    pub fn from_env() -> Self {
        let raw = env::var("LC_ALL")
            .or_else(|_| env::var("LC_CTYPE"))
            .or_else(|_| env::var("LANG"))
            .unwrap_or_default();
        Self::classify(&raw)
    }

    fn classify(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        let encoding = if lower.is_empty() || lower == "c" || lower == "posix" {
            Encoding::SingleByte
        } else if lower.contains("utf-8") || lower.contains("utf8") {
            Encoding::Utf8
        } else {
            Encoding::OtherMultibyte
        };
        Self { encoding }
    }

    #[must_use]
    pub fn is_multibyte(&self) -> bool {
        !matches!(self.encoding, Encoding::SingleByte)
    }

    /// True when `buf[pos]` is the start of a character rather than a UTF-8
    /// continuation byte. Single-byte locales always return true.
    #[must_use]
    pub fn is_char_boundary(&self, buf: &[u8], pos: usize) -> bool {
        match self.encoding {
            Encoding::SingleByte => true,
            Encoding::Utf8 | Encoding::OtherMultibyte => {
                pos == 0 || pos >= buf.len() || (buf[pos] & 0xC0) != 0x80
            }
        }
    }

    /// Advances `pos` to the next character boundary at or after `pos`,
    /// used by the exact-keyword shortcut when a hit lands mid-character
    /// (spec.md §4.1 step 2).
    #[must_use]
    pub fn next_char_boundary(&self, buf: &[u8], mut pos: usize) -> usize {
        if matches!(self.encoding, Encoding::SingleByte) {
            return pos;
        }
        while pos < buf.len() && !self.is_char_boundary(buf, pos) {
            pos += 1;
        }
        pos
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self { encoding: Encoding::SingleByte }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_locale_is_single_byte() {
        assert_eq!(Locale::classify("C").encoding, Encoding::SingleByte);
        assert_eq!(Locale::classify("").encoding, Encoding::SingleByte);
    }

    #[test]
    fn utf8_locale_is_detected() {
        assert_eq!(Locale::classify("en_US.UTF-8").encoding, Encoding::Utf8);
    }

    #[test]
    fn char_boundary_check_rejects_continuation_bytes() {
        let locale = Locale { encoding: Encoding::Utf8 };
        let buf = "a\u{00e9}b".as_bytes(); // 'a', two-byte 'é', 'b'
        assert!(locale.is_char_boundary(buf, 0));
        assert!(locale.is_char_boundary(buf, 1));
        assert!(!locale.is_char_boundary(buf, 2));
        assert_eq!(locale.next_char_boundary(buf, 2), 3);
    }
}
