use crate::UrlError;
use regex::Regex;

/// A compiled URL glob pattern
///
/// Patterns are matched against the whole URL string:
/// - `**` matches any sequence of characters, including `/`
/// - `*` matches any sequence of characters except `/`
/// - `?` matches exactly one character except `/`
/// - everything else matches itself
///
/// # Examples
///
/// ```
/// use sumi_scribe::url::Glob;
///
/// let glob = Glob::new("https://docs.example.com/**").unwrap();
/// assert!(glob.matches("https://docs.example.com/guide/intro"));
/// assert!(!glob.matches("https://blog.example.com/post"));
///
/// let shallow = Glob::new("https://docs.example.com/*").unwrap();
/// assert!(shallow.matches("https://docs.example.com/intro"));
/// assert!(!shallow.matches("https://docs.example.com/guide/intro"));
/// ```
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    /// Compiles a glob pattern into an anchored regex
    ///
    /// # Returns
    ///
    /// * `Ok(Glob)` - The compiled pattern
    /// * `Err(UrlError::InvalidGlob)` - The pattern is empty or contains whitespace
    pub fn new(pattern: &str) -> Result<Self, UrlError> {
        if pattern.is_empty() {
            return Err(invalid(pattern, "pattern cannot be empty"));
        }

        if pattern.chars().any(char::is_whitespace) {
            return Err(invalid(pattern, "pattern cannot contain whitespace"));
        }

        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| invalid(pattern, &e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Returns the source pattern
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Checks whether the candidate string matches this glob in full
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

fn invalid(pattern: &str, message: &str) -> UrlError {
    UrlError::InvalidGlob {
        pattern: pattern.to_string(),
        message: message.to_string(),
    }
}

/// Translates glob syntax into an anchored regex source
fn glob_to_regex(pattern: &str) -> String {
    let mut source = String::from("(?s)^");
    let mut chars = pattern.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                // `**`, `***`, ... all cross segments
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                source.push_str(".*");
            }
            '*' => source.push_str("[^/]*"),
            '?' => source.push_str("[^/]"),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }

    source.push('$');
    source
}
