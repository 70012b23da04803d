use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::ResourceKind;

/// Lifecycle status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Pending,
    Available,
    Failed,
}

impl LifecycleState {
    /// A terminal state expects no further asynchronous transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Available | LifecycleState::Failed)
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Available => "available",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Provider-owned identifier for a live resource, with the lifecycle state
/// the provider reported when the handle was returned.
///
/// Handles are never fabricated for created resources and never cached
/// across runs; `state` is a point-in-time observation, re-queried through
/// `Provider::status` when freshness matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub id: String,
    pub state: LifecycleState,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, id: impl Into<String>, state: LifecycleState) -> Self {
        Self {
            kind,
            id: id.into(),
            state,
        }
    }

    /// A handle for a resource this software did not create and does not
    /// manage: pre-existing route tables, subnets, managed policy ARNs,
    /// CIDR blocks named in configuration.
    pub fn external(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::new(kind, id, LifecycleState::Available)
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }
}

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
