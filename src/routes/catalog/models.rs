use std::collections::{BTreeMap, BTreeSet};

/// One family's slice of the root `linkedAttributes` join table.
#[derive(Debug, Clone, Default)]
pub struct FamilyBinding {
    pub fields: Vec<String>,
    pub model_fields: Vec<String>,
    pub inventory_labels: Vec<String>,
    /// Values of `<family>:linkedSubcategory`: node ids, or the `ALL` marker.
    pub generic_targets: Vec<String>,
    /// Values of `<family>:<label>:linkedSubcategory`, grouped per label.
    pub specific_targets: Vec<SpecificTarget>,
}

#[derive(Debug, Clone)]
pub struct SpecificTarget {
    pub label: String,
    pub node_ids: Vec<String>,
}

pub const ALL_SUBCATEGORIES: &str = "ALL";

impl FamilyBinding {
    pub fn has_subcategory_mapping(&self) -> bool {
        !self.generic_targets.is_empty() || !self.specific_targets.is_empty()
    }

    /// Whether this family applies at `node_id`. Specific label mappings win
    /// over the family-level entry; once any specific mapping exists the
    /// generic `ALL` marker no longer applies, though a generic entry naming
    /// an exact node id is still honored. A family with no mapping at all
    /// applies everywhere.
    pub fn applies_to(&self, node_id: &str) -> bool {
        if !self.specific_targets.is_empty() {
            return self
                .specific_targets
                .iter()
                .any(|target| target.node_ids.iter().any(|id| id == node_id))
                || self.generic_targets.iter().any(|id| id == node_id);
        }
        if !self.generic_targets.is_empty() {
            return self
                .generic_targets
                .iter()
                .any(|id| id == ALL_SUBCATEGORIES || id == node_id);
        }
        true
    }

    /// Whether the mapping names this exact node, which is where inventory
    /// leaves are synthesized. The `ALL` marker is not an explicit anchor.
    pub fn anchors_node(&self, node_id: &str) -> bool {
        self.specific_targets
            .iter()
            .any(|target| target.node_ids.iter().any(|id| id == node_id))
            || self.generic_targets.iter().any(|id| id == node_id)
    }
}

/// Which inventory families may be consulted at a given node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyScope {
    /// No subcategory mapping is configured anywhere: all inventory is
    /// considered rather than hiding data over missing configuration.
    Unconstrained,
    Only(BTreeSet<String>),
}

impl FamilyScope {
    pub fn allows(&self, family: &str) -> bool {
        match self {
            FamilyScope::Unconstrained => true,
            FamilyScope::Only(families) => families.contains(family),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FamilyIndex {
    pub bindings: BTreeMap<String, FamilyBinding>,
}

impl FamilyIndex {
    pub fn families_for_node(&self, node_id: &str) -> FamilyScope {
        if self
            .bindings
            .values()
            .all(|binding| !binding.has_subcategory_mapping())
        {
            return FamilyScope::Unconstrained;
        }
        FamilyScope::Only(
            self.bindings
                .iter()
                .filter(|(_, binding)| binding.applies_to(node_id))
                .map(|(family, _)| family.clone())
                .collect(),
        )
    }

    pub fn anchors_node(&self, node_id: &str) -> bool {
        self.bindings
            .values()
            .any(|binding| binding.anchors_node(node_id))
    }
}
