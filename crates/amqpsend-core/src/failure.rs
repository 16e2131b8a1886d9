//! Failure classification.

use std::fmt;

/// Which endpoint an error condition was raised on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Transport,
    Connection,
    Session,
    Link,
}

impl Scope {
    /// Transport and connection failures end the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Scope::Transport | Scope::Connection)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Transport => "transport",
            Scope::Connection => "connection",
            Scope::Session => "session",
            Scope::Link => "link",
        })
    }
}

/// An AMQP error condition: symbolic name plus optional description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCondition {
    pub name: String,
    pub description: Option<String>,
}

impl ErrorCondition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.name, description),
            None => f.write_str(&self.name),
        }
    }
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub scope: Scope,
    pub condition_name: String,
    pub description: Option<String>,
}

impl FailureRecord {
    pub fn classify(scope: Scope, condition: &ErrorCondition) -> Self {
        Self {
            scope,
            condition_name: condition.name.clone(),
            description: condition.description.clone(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.scope.is_fatal()
    }

    /// Description or the placeholder the diagnostics print when the peer
    /// sent none.
    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error {}: {}",
            self.scope,
            self.condition_name,
            self.description_or_default()
        )
    }
}
