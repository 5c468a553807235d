//! Parses the `GREP_COLORS`/`GREP_COLOR` environment variables into a
//! `ColorSpec` consumed by `printer.rs`. This is the "color-attribute
//! environment parsing" external collaborator named in spec.md §1, supplied
//! here so the binary is runnable end to end.

use std::collections::HashMap;
use std::env;

/// Default SGR parameters, matching GNU grep's `"ms=01;31:mc=01;31:sl=:cx=:\
/// fn=35:ln=32:se=36:bn=32:rv"` (with `mt` unset so `ms`/`mc` take over).
const DEFAULTS: &[(&str, &str)] = &[
    ("sl", ""),
    ("cx", ""),
    ("rv", ""),
    ("mt", "01;31"),
    ("ms", "01;31"),
    ("mc", "01;31"),
    ("fn", "35"),
    ("ln", "32"),
    ("se", "36"),
    ("bn", "32"),
    ("ne", ""),
];

/// The set of SGR codes the printer uses for each field of a match line.
#[derive(Debug, Clone)]
pub struct ColorSpec {
    codes: HashMap<&'static str, String>,
    /// `ne`: when present (any value, including empty), suppress the
    /// `ESC[K` erase-to-end-of-line sequence after each color escape.
    pub no_erase: bool,
}

impl ColorSpec {
    /// Builds the spec from `GREP_COLORS`, falling back to legacy
    /// `GREP_COLOR` (a single value used for both `ms` and `mc`), then to
    /// GNU grep's compiled-in defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut codes: HashMap<&'static str, String> =
            DEFAULTS.iter().map(|(k, v)| (*k, (*v).to_string())).collect();

        if let Ok(legacy) = env::var("GREP_COLOR") {
            codes.insert("ms", legacy.clone());
            codes.insert("mc", legacy);
        }

        let mut no_erase = false;
        if let Ok(spec) = env::var("GREP_COLORS") {
            for entry in spec.split(':') {
                let mut parts = entry.splitn(2, '=');
                let key = parts.next().unwrap_or("").trim();
                if key.is_empty() {
                    continue;
                }
                if key == "ne" {
                    no_erase = true;
                    continue;
                }
                let value = parts.next().unwrap_or("").trim();
                if let Some(slot) = DEFAULTS.iter().find(|(k, _)| *k == key).map(|(k, _)| *k) {
                    codes.insert(slot, value.to_string());
                }
            }
            // `mt` overrides both `ms` and `mc` when present in the spec.
            if let Some(mt) = spec.split(':').find_map(|e| {
                let mut p = e.splitn(2, '=');
                (p.next()?.trim() == "mt").then(|| p.next().unwrap_or("").trim().to_string())
            }) {
                codes.insert("ms", mt.clone());
                codes.insert("mc", mt);
            }
        }

        Self { codes, no_erase }
    }

    #[must_use]
    pub fn code(&self, field: &str) -> &str {
        self.codes.get(field).map(String::as_str).unwrap_or("")
    }

    /// Wraps `text` in the SGR escape for `field`, honoring `ne`. Returns
    /// `text` unmodified if the field has no code configured.
    #[must_use]
    pub fn wrap(&self, field: &str, text: &str) -> String {
        let code = self.code(field);
        if code.is_empty() {
            return text.to_string();
        }
        let erase = if self.no_erase { "" } else { "\u{1b}[K" };
        format!("\u{1b}[{code}m{erase}{text}\u{1b}[m{erase}")
    }
}

impl Default for ColorSpec {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_grep_color_sets_both_match_fields() {
        // SAFETY: single-threaded test, no concurrent env access.
        unsafe {
            env::remove_var("GREP_COLORS");
            env::set_var("GREP_COLOR", "01;32");
        }
        let spec = ColorSpec::from_env();
        assert_eq!(spec.code("ms"), "01;32");
        assert_eq!(spec.code("mc"), "01;32");
        unsafe {
            env::remove_var("GREP_COLOR");
        }
    }

    #[test]
    fn ne_capability_suppresses_erase() {
        // SAFETY: single-threaded test, no concurrent env access.
        unsafe {
            env::set_var("GREP_COLORS", "ms=01;31:ne");
        }
        let spec = ColorSpec::from_env();
        assert!(spec.no_erase);
        assert_eq!(spec.wrap("ms", "hit"), "\u{1b}[01;31mhit\u{1b}[m");
        unsafe {
            env::remove_var("GREP_COLORS");
        }
    }

    #[test]
    fn empty_field_passes_text_through() {
        // SAFETY: single-threaded test, no concurrent env access.
        unsafe {
            env::remove_var("GREP_COLORS");
            env::remove_var("GREP_COLOR");
        }
        let spec = ColorSpec::from_env();
        assert_eq!(spec.wrap("sl", "plain"), "plain");
    }
}
