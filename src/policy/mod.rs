use std::collections::HashSet;

/// Consistent view of the policy inputs, taken once per activation event.
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    pub protection_enabled: bool,
    pub blocked: HashSet<String>,
}

impl PolicySnapshot {
    /// Fail-safe value used when the configuration cannot be read: never
    /// block on inputs we could not load.
    pub fn disabled() -> Self {
        Self {
            protection_enabled: false,
            blocked: HashSet::new(),
        }
    }
}

/// Decide whether a newly focused application must be blocked.
///
/// Rules, in order: protection off never blocks; an app without a bundle
/// identifier can never match the block list; otherwise block iff the
/// identifier is in the set.
pub fn should_block(bundle_id: Option<&str>, snapshot: &PolicySnapshot) -> bool {
    if !snapshot.protection_enabled {
        return false;
    }

    match bundle_id {
        Some(id) => snapshot.blocked.contains(id),
        None => false,
    }
}
