use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The stable identifying tuple for a resource: a name plus an optional
/// enclosing scope (e.g. a security group name is only unique per VPC).
///
/// Resolves to at most one live resource within its scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub name: String,
    pub scope: Option<String>,
}

impl ResourceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    pub fn scoped(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Some(scope.into()),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}@{}", self.name, scope),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_scope_when_present() {
        assert_eq!(ResourceKey::new("web-sg").to_string(), "web-sg");
        assert_eq!(
            ResourceKey::scoped("web-sg", "vpc-1").to_string(),
            "web-sg@vpc-1"
        );
    }

    #[test]
    fn keys_with_different_scopes_differ() {
        assert_ne!(
            ResourceKey::scoped("web-sg", "vpc-1"),
            ResourceKey::scoped("web-sg", "vpc-2")
        );
    }
}
