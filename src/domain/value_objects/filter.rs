use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while compiling a filter string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterCompileError {
    #[error("Unknown filter clause '{token}'")]
    UnknownFilterClause { token: String },

    #[error("Filter clause '{key}:' needs a value")]
    EmptyClauseValue { key: String },
}

/// One atomic filter predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterClause {
    NameContains(String),
    NameExcludes(String),
    Dirty,
    NotDirty,
    Untracked,
    NotUntracked,
    HasStashes,
    NoStashes,
    HasRemotes,
    NoRemotes,
    /// Some local branch name contains the value.
    BranchContains(String),
    /// The checked-out branch is exactly the value.
    ActiveBranch(String),
    NotActiveBranch(String),
}

impl FilterClause {
    /// Whether evaluating this clause requires asking git about the repository.
    pub fn needs_inspection(&self) -> bool {
        !matches!(self, Self::NameContains(_) | Self::NameExcludes(_))
    }

    fn parse_token(token: &str) -> Result<Self, FilterCompileError> {
        if let Some((key, value)) = token.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            let build: fn(String) -> Self = match key {
                "name" => Self::NameContains,
                "not-name" => Self::NameExcludes,
                "branch" => Self::BranchContains,
                "active-branch" => Self::ActiveBranch,
                "not-active-branch" => Self::NotActiveBranch,
                _ => {
                    return Err(FilterCompileError::UnknownFilterClause {
                        token: token.to_string(),
                    })
                }
            };
            if value.is_empty() {
                return Err(FilterCompileError::EmptyClauseValue {
                    key: key.to_string(),
                });
            }
            return Ok(build(value.to_string()));
        }

        match token {
            "dirty" => Ok(Self::Dirty),
            "no-dirty" => Ok(Self::NotDirty),
            "untracked" => Ok(Self::Untracked),
            "no-untracked" => Ok(Self::NotUntracked),
            "stashes" => Ok(Self::HasStashes),
            "no-stashes" => Ok(Self::NoStashes),
            "remotes" => Ok(Self::HasRemotes),
            "no-remotes" => Ok(Self::NoRemotes),
            _ => Err(FilterCompileError::UnknownFilterClause {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameContains(s) => write!(f, "name:{s}"),
            Self::NameExcludes(s) => write!(f, "not-name:{s}"),
            Self::Dirty => f.write_str("dirty"),
            Self::NotDirty => f.write_str("no-dirty"),
            Self::Untracked => f.write_str("untracked"),
            Self::NotUntracked => f.write_str("no-untracked"),
            Self::HasStashes => f.write_str("stashes"),
            Self::NoStashes => f.write_str("no-stashes"),
            Self::HasRemotes => f.write_str("remotes"),
            Self::NoRemotes => f.write_str("no-remotes"),
            Self::BranchContains(s) => write!(f, "branch:{s}"),
            Self::ActiveBranch(s) => write!(f, "active-branch:{s}"),
            Self::NotActiveBranch(s) => write!(f, "not-active-branch:{s}"),
        }
    }
}

/// A compiled filter: the logical AND of its clauses.
///
/// The empty expression selects every repository. Configuration files carry
/// filters as strings; serde goes through [`FromStr`] so a malformed filter
/// fails when the file is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterExpression {
    clauses: Vec<FilterClause>,
}

impl FilterExpression {
    /// Expression that selects everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(clauses: Vec<FilterClause>) -> Self {
        let mut expression = Self::default();
        for clause in clauses {
            expression.push(clause);
        }
        expression
    }

    /// Compile a comma-separated filter string.
    ///
    /// ```
    /// use multigit::domain::value_objects::filter::{FilterClause, FilterExpression};
    ///
    /// let filter = FilterExpression::compile("dirty, not-name:scratch").unwrap();
    /// assert_eq!(
    ///     filter.clauses(),
    ///     &[FilterClause::Dirty, FilterClause::NameExcludes("scratch".into())]
    /// );
    /// assert!(FilterExpression::compile("dirt").is_err());
    /// ```
    pub fn compile(source: &str) -> Result<Self, FilterCompileError> {
        let mut expression = Self::default();
        for token in source.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            expression.push(FilterClause::parse_token(token)?);
        }
        Ok(expression)
    }

    fn push(&mut self, clause: FilterClause) {
        // Duplicates cannot change an AND, keep the first occurrence.
        if !self.clauses.contains(&clause) {
            self.clauses.push(clause);
        }
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses answerable from the record alone, in declaration order.
    pub fn name_clauses(&self) -> impl Iterator<Item = &FilterClause> {
        self.clauses.iter().filter(|c| !c.needs_inspection())
    }

    /// Clauses that need git, in declaration order.
    pub fn inspection_clauses(&self) -> impl Iterator<Item = &FilterClause> {
        self.clauses.iter().filter(|c| c.needs_inspection())
    }

    /// Copy of this expression without the clause at `index`.
    pub fn without(&self, index: usize) -> Self {
        let mut clauses = self.clauses.clone();
        if index < clauses.len() {
            clauses.remove(index);
        }
        Self { clauses }
    }
}

impl FromStr for FilterExpression {
    type Err = FilterCompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl TryFrom<String> for FilterExpression {
    type Error = FilterCompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::compile(&value)
    }
}

impl From<FilterExpression> for String {
    fn from(value: FilterExpression) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}
