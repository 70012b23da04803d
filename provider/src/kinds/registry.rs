use serde::{Deserialize, Serialize};

/// Desired image repository attributes. The handle id of a created
/// repository is its pullable URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub scan_on_push: bool,
}
