//! Compiled pattern reuse for LIKE and MATCHES

use regex::Regex;

/// The last compiled pattern of one node.
///
/// Recompiles only when the pattern text changes, so a static pattern is
/// compiled once per node. An invalid pattern is cached as `None`.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Option<(String, Option<Regex>)>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The regex for `pattern`, translating it to regex syntax on a miss
    pub(crate) fn compile(&mut self, pattern: &str, translate: fn(&str) -> String) -> Option<&Regex> {
        let stale = match &self.compiled {
            Some((cached, _)) => cached != pattern,
            None => true,
        };
        if stale {
            let regex = Regex::new(&translate(pattern)).ok();
            self.compiled = Some((pattern.to_string(), regex));
        }
        self.compiled.as_ref().and_then(|(_, regex)| regex.as_ref())
    }

    /// Pattern text currently compiled, if any
    pub fn cached_pattern(&self) -> Option<&str> {
        self.compiled.as_ref().map(|(pattern, _)| pattern.as_str())
    }
}

/// `%` matches any run of characters, `_` exactly one
pub(crate) fn like_to_regex(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');
    source
}

/// Anchors a regular expression to the whole input
pub(crate) fn anchored(pattern: &str) -> String {
    format!("^(?:{})$", pattern)
}
