use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A block-list entry. At most one entry per bundle identifier may exist
/// in the settings store at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedApp {
    pub id: Uuid,
    pub bundle_identifier: String,
    pub display_name: String,
}

impl BlockedApp {
    pub fn new(bundle_identifier: &str, display_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            bundle_identifier: bundle_identifier.to_string(),
            display_name: display_name.to_string(),
        }
    }
}
