//! Migration identifiers derived from labels.
//!
//! A label is the fully qualified type name of a migration, for example
//! `app::migrations::Migration1765073576565CreateUsersTable`. The identifier is
//! the `(name, version)` pair embedded in it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Optional `::` or `\` separated namespace, the `Migration` marker, exactly
/// 13 ASCII digits, then a letter/underscore-led name.
const LABEL_PATTERN: &str =
    r"^(?:.*(?:::|\\))?Migration(?P<version>[0-9]{13})(?P<name>[\p{L}_][\p{L}\p{N}_]*)$";

static LABEL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(LABEL_PATTERN).ok());

/// The `(name, version)` pair that identifies a migration in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    /// Millisecond timestamp, or 0 when the label did not parse.
    pub version: i64,
}

impl Identifier {
    /// Parse a migration label.
    ///
    /// Never fails: a label that does not follow the naming convention becomes
    /// `{ name: label, version: 0 }`.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let captures = LABEL_RE.as_ref().and_then(|re| re.captures(label));

        if let Some(caps) = captures {
            let version = caps
                .name("version")
                .and_then(|m| m.as_str().parse::<i64>().ok());
            if let (Some(version), Some(name)) = (version, caps.name("name")) {
                return Self {
                    name: name.as_str().to_string(),
                    version,
                };
            }
        }

        Self {
            name: label.to_string(),
            version: 0,
        }
    }

    /// Whether the label carried a version.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.version != 0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_versioned() {
            write!(f, "{} ({})", self.name, self.version)
        } else {
            f.write_str(&self.name)
        }
    }
}
