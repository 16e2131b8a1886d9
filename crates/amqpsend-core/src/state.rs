//! Connection and link lifecycle states.
//!
//! Both machines only move forward. `can_transition_to` encodes the legal
//! edges; the controller refuses anything else.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    /// Open requested, transport not yet bound.
    Initializing,
    /// Transport bound; TLS and SASL in progress.
    Bound,
    /// AMQP open exchanged.
    Open,
    /// Close requested locally.
    Closing,
    Closed,
    /// A transport or connection failure was recorded.
    Failed,
}

impl ConnectionState {
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Bound)
                | (Bound, Open)
                | (Open, Closing)
                | (Closing, Closed)
                | (Uninitialized | Initializing | Bound | Open | Closing, Failed)
        )
    }

    /// Closed and Failed accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    pub fn transition(self, next: ConnectionState) -> Result<ConnectionState, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                machine: "connection",
                from: format!("{self:?}"),
                to: format!("{next:?}"),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LinkState {
    #[default]
    Unattached,
    Attaching,
    Open,
    /// The one message is being transferred.
    Sending,
    Closing,
    Closed,
}

impl LinkState {
    pub fn can_transition_to(&self, next: LinkState) -> bool {
        use LinkState::*;
        matches!(
            (self, next),
            (Unattached, Attaching)
                | (Attaching, Open)
                | (Open, Sending)
                | (Attaching | Open | Sending, Closing)
                | (Closing, Closed)
        )
    }

    pub fn transition(self, next: LinkState) -> Result<LinkState, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                machine: "link",
                from: format!("{self:?}"),
                to: format!("{next:?}"),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal {machine} transition {from} -> {to}")]
pub struct IllegalTransition {
    pub machine: &'static str,
    pub from: String,
    pub to: String,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
