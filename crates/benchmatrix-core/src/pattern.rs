//! Wildcard patterns for source globs and bench/unit name filters.
//!
//! Both pattern kinds compile to an anchored [`Regex`]:
//!
//! | Token      | [`PathGlob`]                    | [`NamePattern`]     |
//! |------------|---------------------------------|---------------------|
//! | `*`        | any run within one component    | any run             |
//! | `**`       | any run across components       | any run             |
//! | `?`        | one character except `/`        | one character       |
//! | `[ab]`     | character class (`[!ab]` negates) | same              |

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{MatrixError, MatrixResult};

const WILDCARDS: &[char] = &['*', '?', '['];

/// Translate a wildcard pattern into an anchored regex source string.
fn translate(pattern: &str, path_aware: bool) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if path_aware && chars.peek() == Some(&'/') {
                        chars.next();
                        out.push_str("(?:.*/)?");
                    } else {
                        out.push_str(".*");
                    }
                } else if path_aware {
                    out.push_str("[^/]*");
                } else {
                    out.push_str(".*");
                }
            }
            '?' => out.push_str(if path_aware { "[^/]" } else { "." }),
            '[' => {
                let mut class = String::new();
                let mut negate = false;
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    negate = true;
                }
                let mut closed = false;
                let mut first = true;
                while let Some(ch) = chars.next() {
                    if ch == ']' && !first {
                        closed = true;
                        break;
                    }
                    first = false;
                    if ch == '-' {
                        class.push('-');
                    } else {
                        class.push_str(&regex::escape(&ch.to_string()));
                    }
                }
                if !closed {
                    return Err("unterminated character class".to_string());
                }
                out.push('[');
                if negate {
                    out.push('^');
                }
                out.push_str(&class);
                out.push(']');
            }
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => return Err("dangling escape at end of pattern".to_string()),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    Ok(out)
}

fn compile(pattern: &str, path_aware: bool) -> MatrixResult<Regex> {
    let source = translate(pattern, path_aware).map_err(|reason| MatrixError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    })?;
    Regex::new(&source).map_err(|e| MatrixError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Wildcard pattern matched against bench ids and run-unit names.
#[derive(Debug, Clone)]
pub struct NamePattern {
    raw: String,
    matcher: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> MatrixResult<Self> {
        Ok(Self {
            raw: pattern.to_string(),
            matcher: compile(pattern, false)?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for NamePattern {}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Filesystem glob split into a literal walk root and a relative matcher.
#[derive(Debug, Clone)]
pub struct PathGlob {
    raw: String,
    root: PathBuf,
    matcher: Regex,
    max_depth: Option<usize>,
}

impl PathGlob {
    /// Compile `pattern`. The walk root is the longest directory prefix that
    /// contains no wildcard; a wildcard-free pattern names a single file.
    pub fn new(pattern: &str) -> MatrixResult<Self> {
        if pattern.is_empty() {
            return Err(MatrixError::InvalidPattern {
                pattern: String::new(),
                reason: "pattern is empty".to_string(),
            });
        }

        let components: Vec<&str> = pattern.split('/').collect();
        let split = components
            .iter()
            .position(|c| c.contains(WILDCARDS))
            .unwrap_or(components.len() - 1);

        let root_str = components[..split].join("/");
        let root = if root_str.is_empty() {
            if pattern.starts_with('/') {
                PathBuf::from("/")
            } else {
                PathBuf::from(".")
            }
        } else {
            PathBuf::from(root_str)
        };

        let rest = components[split..].join("/");
        if rest.is_empty() {
            return Err(MatrixError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern names a directory, not files".to_string(),
            });
        }

        let max_depth = if rest.contains("**") {
            None
        } else {
            Some(components.len() - split)
        };

        Ok(Self {
            raw: pattern.to_string(),
            root,
            matcher: compile(&rest, true)?,
            max_depth,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deepest directory level the walk needs to visit, `None` for `**`.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Match a path relative to [`PathGlob::root`].
    pub fn matches_relative(&self, relative: &Path) -> bool {
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.matcher.is_match(&normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
