use regex::Regex;

/// Regex-driven string rewriter shared by the `replace` and `labelmap`
/// actions. The pattern is anchored at construction; the replacement may
/// reference capture groups (`$1`, `${1}`, `$name`).
#[derive(Debug, Clone)]
pub(crate) struct StringReplacer {
    regex_anchored: Regex,
    replacement: String,
    has_capture_group_in_replacement: bool,
}

impl StringReplacer {
    pub fn new(regex_anchored: Regex, replacement: String) -> Self {
        let has_capture_group_in_replacement = replacement.contains('$');
        StringReplacer {
            regex_anchored,
            replacement,
            has_capture_group_in_replacement,
        }
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex_anchored.is_match(s)
    }

    pub fn has_capture_group_in_replacement(&self) -> bool {
        self.has_capture_group_in_replacement
    }

    /// Expands the replacement template against `s` if the whole of `s`
    /// matches the pattern. Returns `None` on mismatch.
    pub fn replace_full(&self, s: &str) -> Option<String> {
        let captures = self.regex_anchored.captures(s)?;
        if !self.has_capture_group_in_replacement {
            // Fast path: literal replacement.
            return Some(self.replacement.clone());
        }
        let mut dst = String::with_capacity(self.replacement.len() + 16);
        captures.expand(&self.replacement, &mut dst);
        Some(dst)
    }
}
