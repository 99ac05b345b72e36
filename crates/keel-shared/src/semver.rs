//! Host version gating
//!
//! Versions and ranges as reported by runtimes are often partial (`v7`,
//! `10.1`), so parsing is loose: missing minor and patch components read as
//! zero. Ranges combine constraints with whitespace (all must hold) and
//! `||` (any alternative may hold).

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Errors that can occur during version parsing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemverError {
    /// Invalid version format
    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    /// Invalid constraint format
    #[error("Invalid constraint format: {0}")]
    InvalidConstraint(String),
}

/// Semantic version (MAJOR.MINOR.PATCH)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

/// Single version constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Exact version (=1.2.3 or 1.2.3)
    Exact(Version),

    /// Caret range (^1.2.3 → >=1.2.3 <2.0.0)
    Caret(Version),

    /// Tilde range (~1.2.3 → >=1.2.3 <1.3.0)
    Tilde(Version),

    GreaterThan(Version),
    GreaterThanOrEqual(Version),
    LessThan(Version),
    LessThanOrEqual(Version),

    /// Wildcard (1.2.*, 1.x)
    Wildcard(u64, Option<u64>),

    /// Any version (*)
    Any,
}

/// Disjunction of conjunctions of constraints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    alternatives: Vec<Vec<Constraint>>,
}

impl Version {
    /// Parse a possibly partial version string
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);

        // Build metadata does not take part in ordering
        let s = s.split('+').next().unwrap_or(s);

        let (core, prerelease) = match s.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(SemverError::InvalidVersion(s.to_string())),
            None => (s, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(SemverError::InvalidVersion(format!(
                "Expected MAJOR[.MINOR[.PATCH]], got '{}'",
                s
            )));
        }

        let component = |index: usize| -> Result<u64, SemverError> {
            match parts.get(index) {
                None => Ok(0),
                Some(part) => part.parse().map_err(|_| {
                    SemverError::InvalidVersion(format!("Invalid component '{}' in '{}'", part, s))
                }),
            }
        };

        Ok(Version {
            major: component(0)?,
            minor: component(1)?,
            patch: component(2)?,
            prerelease,
        })
    }

    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn bump_major(&self) -> Self {
        Version::new(self.major + 1, 0, 0)
    }

    fn bump_minor(&self) -> Self {
        Version::new(self.major, self.minor + 1, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl Constraint {
    /// Parse a single constraint such as `>=10`, `^1.2`, `7.x` or `*`
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let s = s.trim();

        if s.is_empty() || s == "*" || s == "x" || s == "X" {
            return Ok(Constraint::Any);
        }

        let operators: [(&str, fn(Version) -> Constraint); 7] = [
            (">=", Constraint::GreaterThanOrEqual),
            ("<=", Constraint::LessThanOrEqual),
            (">", Constraint::GreaterThan),
            ("<", Constraint::LessThan),
            ("^", Constraint::Caret),
            ("~", Constraint::Tilde),
            ("=", Constraint::Exact),
        ];
        for (prefix, build) in operators {
            if let Some(rest) = s.strip_prefix(prefix) {
                let version = Version::parse(rest)
                    .map_err(|_| SemverError::InvalidConstraint(s.to_string()))?;
                return Ok(build(version));
            }
        }

        if s.contains(['*', 'x', 'X']) {
            return Self::parse_wildcard(s);
        }

        let version = Version::parse(s)?;
        Ok(Constraint::Exact(version))
    }

    fn parse_wildcard(s: &str) -> Result<Self, SemverError> {
        let s = s.strip_prefix('v').unwrap_or(s);
        let is_wild = |part: &str| matches!(part, "*" | "x" | "X");
        let invalid = || SemverError::InvalidConstraint(format!("Invalid wildcard: {}", s));
        let parts: Vec<&str> = s.split('.').collect();

        match parts.as_slice() {
            [major, minor] if is_wild(*minor) => {
                Ok(Constraint::Wildcard(major.parse().map_err(|_| invalid())?, None))
            }
            [major, minor, patch] if is_wild(*minor) && is_wild(*patch) => {
                Ok(Constraint::Wildcard(major.parse().map_err(|_| invalid())?, None))
            }
            [major, minor, patch] if is_wild(*patch) => Ok(Constraint::Wildcard(
                major.parse().map_err(|_| invalid())?,
                Some(minor.parse().map_err(|_| invalid())?),
            )),
            _ => Err(invalid()),
        }
    }

    /// Check if a version satisfies this constraint
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Exact(v) => version == v,
            Constraint::Caret(v) => {
                let upper = if v.major > 0 {
                    v.bump_major()
                } else if v.minor > 0 {
                    v.bump_minor()
                } else {
                    Version::new(0, 0, v.patch + 1)
                };
                version >= v && *version < upper
            }
            Constraint::Tilde(v) => version >= v && *version < v.bump_minor(),
            Constraint::GreaterThan(v) => version > v,
            Constraint::GreaterThanOrEqual(v) => version >= v,
            Constraint::LessThan(v) => version < v,
            Constraint::LessThanOrEqual(v) => version <= v,
            Constraint::Wildcard(major, minor) => {
                version.major == *major && minor.map_or(true, |m| version.minor == m)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => write!(f, "*"),
            Constraint::Exact(v) => write!(f, "{}", v),
            Constraint::Caret(v) => write!(f, "^{}", v),
            Constraint::Tilde(v) => write!(f, "~{}", v),
            Constraint::GreaterThan(v) => write!(f, ">{}", v),
            Constraint::GreaterThanOrEqual(v) => write!(f, ">={}", v),
            Constraint::LessThan(v) => write!(f, "<{}", v),
            Constraint::LessThanOrEqual(v) => write!(f, "<={}", v),
            Constraint::Wildcard(major, Some(minor)) => write!(f, "{}.{}.*", major, minor),
            Constraint::Wildcard(major, None) => write!(f, "{}.*", major),
        }
    }
}

impl Range {
    /// Parse a range such as `>=10 <12 || ^14`
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let alternatives = s
            .split("||")
            .map(|alternative| {
                let mut constraints = Vec::new();
                // `>= 10` is written with a space after the operator
                let mut pending: Option<String> = None;
                for token in alternative.split_whitespace() {
                    let token = match pending.take() {
                        Some(op) => op + token,
                        None => token.to_string(),
                    };
                    if matches!(token.as_str(), ">" | ">=" | "<" | "<=" | "=" | "^" | "~") {
                        pending = Some(token);
                        continue;
                    }
                    constraints.push(Constraint::parse(&token)?);
                }
                if let Some(op) = pending {
                    return Err(SemverError::InvalidConstraint(op));
                }
                if constraints.is_empty() {
                    constraints.push(Constraint::Any);
                }
                Ok(constraints)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Range { alternatives })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|all| all.iter().all(|constraint| constraint.matches(version)))
    }

    /// Highest of `versions` that satisfies the range
    pub fn max_satisfying<'a>(&self, versions: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
        versions.into_iter().filter(|v| self.matches(v)).max()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, all) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            for (j, constraint) in all.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", constraint)?;
            }
        }
        Ok(())
    }
}
