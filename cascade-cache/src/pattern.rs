//! Key patterns for `delete_matching`.

use crate::error::{CacheError, CacheResult};
use regex::Regex;

/// A key matcher.
///
/// Matching is always done with the regex. The optional glob is a hint that
/// networked stores can hand to the server to narrow a key scan before the
/// regex is applied.
///
/// A namespaced pattern only accepts keys starting with its `namespace:`
/// prefix and runs the regex on the rest of the key.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
    glob: Option<String>,
    prefix: Option<String>,
}

impl KeyPattern {
    /// Compile a regular expression. Like a search, it matches anywhere in
    /// the key unless anchored.
    pub fn regex(pattern: &str) -> CacheResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| CacheError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            regex,
            glob: None,
            prefix: None,
        })
    }

    /// Build a pattern from a Redis-style glob (`*`, `?`, `[...]`), matched
    /// against the whole key.
    pub fn glob(glob: &str) -> CacheResult<Self> {
        let regex = Regex::new(&glob_to_regex(glob))
            .map_err(|e| CacheError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            regex,
            glob: Some(glob.to_string()),
            prefix: None,
        })
    }

    pub fn is_match(&self, key: &str) -> bool {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| self.regex.is_match(rest)),
            None => self.regex.is_match(key),
        }
    }

    /// The regex, applied after the namespace prefix when there is one.
    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    /// The `namespace:` prefix keys must carry, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Server-side scan hint, `*` when the pattern is a plain regex.
    pub fn scan_hint(&self) -> &str {
        self.glob.as_deref().unwrap_or("*")
    }

    /// Restrict the pattern to keys under `namespace:`.
    ///
    /// The regex keeps its meaning relative to the un-namespaced key: `^`
    /// anchors right after the namespace, in every alternation branch.
    pub fn within_namespace(&self, namespace: &str) -> Self {
        let prefix = format!("{}:{}", namespace, self.prefix.as_deref().unwrap_or(""));
        let glob = match &self.glob {
            Some(glob) => format!("{}:{}", escape_glob(namespace), glob),
            None => format!("{}:*", escape_glob(namespace)),
        };
        Self {
            regex: self.regex.clone(),
            glob: Some(glob),
            prefix: Some(prefix),
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    if c == '\\' {
                        out.push_str("\\\\");
                    } else {
                        out.push(c);
                    }
                }
                out.push(']');
            }
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str("\\\\"),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

fn escape_glob(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
