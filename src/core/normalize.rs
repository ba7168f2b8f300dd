//! Label and entity-name normalisation

use crate::config::OeRule;

/// Marker used in workbook entity names for group-level entities
pub const GROUP_MARKER: char = 'Ⓖ';

/// Normalise a header or entity label: NBSP → space, en/em dash → `-`,
/// whitespace runs collapsed, trimmed.
pub fn clean_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for ch in s.chars() {
        let ch = match ch {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// Cleaned label with the group marker removed
pub fn strip_group_marker(s: &str) -> String {
    clean_label(&s.replace(GROUP_MARKER, ""))
}

/// First-match-wins substring matcher from free-text entity names to codes.
///
/// Rules are evaluated in the order given; they are never re-sorted.
#[derive(Debug, Clone)]
pub struct OeMatcher {
    rules: Vec<(String, String)>,
}

impl OeMatcher {
    pub fn new(rules: &[OeRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| (r.pattern.to_lowercase(), r.code.clone()))
                .collect(),
        }
    }

    /// Code for `raw`, considering only the text before the first comma
    pub fn match_code(&self, raw: &str) -> Option<&str> {
        let lowered = raw.to_lowercase();
        let head = lowered.split(',').next().unwrap_or("").trim();
        if head.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|(pattern, _)| head.contains(pattern.as_str()))
            .map(|(_, code)| code.as_str())
    }
}
