//! Mutual-exclusion groups: at most one member may be `true`.

use pdv_core::{ToggleKey, ToggleSet};

/// A named set of toggle keys of which at most one may be enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutualExclusionGroup {
    name: &'static str,
    members: &'static [ToggleKey],
}

impl MutualExclusionGroup {
    /// Define a group.
    pub const fn new(name: &'static str, members: &'static [ToggleKey]) -> Self {
        Self { name, members }
    }

    /// Receipt print width: 80mm or 50mm.
    pub const fn print_format() -> Self {
        Self::new(
            "print_format",
            &[ToggleKey::TipoImpressao80mm, ToggleKey::TipoImpressao50mm],
        )
    }

    /// Group name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Member keys.
    pub fn members(&self) -> &'static [ToggleKey] {
        self.members
    }

    /// Whether `key` belongs to this group.
    pub fn contains(&self, key: ToggleKey) -> bool {
        self.members.contains(&key)
    }

    /// Writes that enable `key` and disable every other member.
    pub fn enable_writes(&self, key: ToggleKey) -> ToggleSet {
        self.members
            .iter()
            .map(|member| (*member, *member == key))
            .collect()
    }

    /// Whether `toggles` satisfies the group (at most one member on).
    pub fn is_satisfied_by(&self, toggles: &ToggleSet) -> bool {
        self.members.iter().filter(|m| toggles.get(**m)).count() <= 1
    }
}
