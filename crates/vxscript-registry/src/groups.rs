//! Config groups.
//!
//! A host can bracket registrations in a named group and then decide, per
//! module, whether scripts may see what the group contains. Lookups that
//! fail the check behave exactly like lookups of an unknown name.

use rustc_hash::FxHashMap;
use vxscript_core::GroupId;

/// A named set of host registrations with per-module access rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigGroup {
    pub id: GroupId,
    pub name: String,
    /// Access for modules without an explicit entry.
    pub default_access: bool,
    module_access: FxHashMap<String, bool>,
}

impl ConfigGroup {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            default_access: true,
            module_access: FxHashMap::default(),
        }
    }

    pub fn set_module_access(&mut self, module: impl Into<String>, allowed: bool) {
        self.module_access.insert(module.into(), allowed);
    }

    pub fn allows(&self, module: &str) -> bool {
        self.module_access.get(module).copied().unwrap_or(self.default_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_access_applies_to_unlisted_modules() {
        let mut group = ConfigGroup::new(GroupId(0), "io");
        assert!(group.allows("main"));
        group.default_access = false;
        assert!(!group.allows("main"));
        group.set_module_access("main", true);
        assert!(group.allows("main"));
        assert!(!group.allows("other"));
    }
}
