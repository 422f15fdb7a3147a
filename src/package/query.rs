//! Version queries such as `"abc >=1.0.0,<2.0.0"`.
//!
//! A query names one package and carries zero or more comparison
//! constraints that must all hold. The same constraint grammar is used for
//! the host compatibility ranges declared in package metadata.

use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::PackageError;

/// Comparison operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Op {
    /// Two-character operators are tried before one-character ones so that
    /// `>=` is never read as `>` followed by `=1.0.0`.
    const PREFIXES: [(&'static str, Op); 6] = [
        ("==", Op::Eq),
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("!=", Op::Ne),
        (">", Op::Gt),
        ("<", Op::Lt),
    ];

    /// Split a token into its operator and the remaining version text.
    /// A token without an operator prefix is an exact match.
    fn split(token: &str) -> (Op, &str) {
        Self::PREFIXES
            .iter()
            .find_map(|(prefix, op)| token.strip_prefix(prefix).map(|rest| (*op, rest)))
            .unwrap_or((Op::Eq, token))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Ge => ord != Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Lt => ord == Ordering::Less,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semver precedence: numeric major.minor.patch, then pre-release.
/// Build metadata does not take part in the ordering.
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// One `<op><version>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Op,
    pub version: Version,
}

impl Constraint {
    pub fn allows(&self, version: &Version) -> bool {
        self.op.holds(precedence(version, &self.version))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// Parse a constraint list separated by commas and/or whitespace.
///
/// An operator standing alone (`">= 1.0.0"`) binds to the following token.
pub fn parse_constraints(text: &str) -> Result<Vec<Constraint>, String> {
    let mut constraints = Vec::new();
    let mut pending: Option<&str> = None;

    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let (op, version) = match pending.take() {
            Some(prefix) => (Op::split(prefix).0, token),
            None => Op::split(token),
        };

        if version.is_empty() {
            pending = Some(token);
            continue;
        }

        let version = Version::parse(version)
            .map_err(|e| format!("invalid version {:?}: {}", version, e))?;
        constraints.push(Constraint { op, version });
    }

    if let Some(op) = pending {
        return Err(format!("operator {:?} has no version", op));
    }

    Ok(constraints)
}

/// A package name plus the constraints a version must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionQuery {
    name: String,
    constraints: Vec<Constraint>,
}

impl VersionQuery {
    pub fn parse(text: &str) -> Result<Self, PackageError> {
        let invalid = |reason: String| PackageError::InvalidQuery {
            query: text.to_string(),
            reason,
        };

        let text_trimmed = text.trim();
        let (name, rest) = match text_trimmed.find(char::is_whitespace) {
            Some(at) => (&text_trimmed[..at], &text_trimmed[at..]),
            None => (text_trimmed, ""),
        };

        if name.is_empty() {
            return Err(invalid("package name is empty".into()));
        }

        let constraints = parse_constraints(rest).map_err(invalid)?;

        Ok(Self {
            name: name.to_string(),
            constraints,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// True when `name` is this query's package and every constraint holds.
    pub fn matches(&self, name: &str, version: &Version) -> bool {
        self.name == name && self.constraints.iter().all(|c| c.allows(version))
    }
}

impl FromStr for VersionQuery {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for constraint in &self.constraints {
            write!(f, " {}", constraint)?;
        }
        Ok(())
    }
}
