use std::collections::{HashMap, HashSet};

use bigdecimal::BigDecimal;

use super::models::{FamilyBinding, FamilyIndex, FamilyScope, SpecificTarget};
use super::schemas::{
    is_active_status, CategoryNode, ComboPackage, DisplayMode, FamilyDescriptor, InventoryEntry,
    PriceQuote, PricingMode, SelectionState, VendorComboPricing,
};

/// Builds the family index from the root node's `linkedAttributes` map.
///
/// Key shapes, as authored in category documents:
/// `<family>`, `<family>:modelFields`, `<family>:linkedSubcategory`,
/// `<family>:<label>:linkedSubcategory`, `<family>:inventoryLabels`.
/// Unrecognized keys are ignored.
pub fn build_family_index(linked_attributes: Option<&HashMap<String, Vec<String>>>) -> FamilyIndex {
    let mut index = FamilyIndex::default();
    let Some(linked_attributes) = linked_attributes else {
        return index;
    };
    for (key, values) in linked_attributes {
        let parts: Vec<&str> = key.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [family] if !family.is_empty() => {
                binding_mut(&mut index, family).fields = clean_values(values);
            }
            [family, "modelFields"] if !family.is_empty() => {
                binding_mut(&mut index, family).model_fields = clean_values(values);
            }
            [family, "inventoryLabels"] if !family.is_empty() => {
                binding_mut(&mut index, family).inventory_labels = clean_values(values);
            }
            [family, "linkedSubcategory"] if !family.is_empty() => {
                binding_mut(&mut index, family)
                    .generic_targets
                    .extend(clean_values(values));
            }
            [family, label, "linkedSubcategory"] if !family.is_empty() => {
                binding_mut(&mut index, family)
                    .specific_targets
                    .push(SpecificTarget {
                        label: label.to_string(),
                        node_ids: clean_values(values),
                    });
            }
            _ => {}
        }
    }
    index
}

fn binding_mut<'a>(index: &'a mut FamilyIndex, family: &str) -> &'a mut FamilyBinding {
    index.bindings.entry(family.to_string()).or_default()
}

fn clean_values(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Flattens the index into the picker metadata the rendering layer needs,
/// in family name order.
pub fn family_descriptors(index: &FamilyIndex) -> Vec<FamilyDescriptor> {
    index
        .bindings
        .iter()
        .map(|(family, binding)| FamilyDescriptor {
            family: family.clone(),
            fields: binding.fields.clone(),
            model_fields: binding.model_fields.clone(),
            inventory_labels: binding.inventory_labels.clone(),
            labels: binding
                .specific_targets
                .iter()
                .map(|target| target.label.clone())
                .collect(),
        })
        .collect()
}

/// Which inventory families apply at `node_id`, per the precedence rules of
/// the `linkedSubcategory` join table.
#[tracing::instrument(name = "Resolve families for node", skip(index))]
pub fn resolve_families_for_node(node_id: &str, index: &FamilyIndex) -> FamilyScope {
    index.families_for_node(node_id)
}

/// Candidate leaves synthesized from inventory, deduplicated by attribute
/// combination keeping the cheapest representative, appended to the node's
/// static children and sorted ascending by price (unpriced last).
pub fn synthesize_leaves(
    node: &CategoryNode,
    scope: &FamilyScope,
    entries: &[InventoryEntry],
) -> Vec<CategoryNode> {
    let mut children = node.children.clone();

    let mut best: HashMap<String, &InventoryEntry> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for entry in entries {
        if !scope.allows(&entry.scope_family) {
            continue;
        }
        let Some(attribute_key) = entry.attribute_key() else {
            continue;
        };
        match best.get(&attribute_key) {
            Some(current) => {
                let cheaper = match (current.representative_price(), entry.representative_price())
                {
                    (None, Some(_)) => true,
                    (Some(current_price), Some(candidate)) => candidate < current_price,
                    _ => false,
                };
                if cheaper {
                    best.insert(attribute_key, entry);
                }
            }
            None => {
                best.insert(attribute_key.clone(), entry);
                order.push(attribute_key);
            }
        }
    }

    let existing_ids: HashSet<&str> = children.iter().map(|child| child.id.as_str()).collect();
    let mut synthesized = Vec::new();
    for attribute_key in &order {
        let entry = best[attribute_key];
        let id = synthetic_leaf_id(attribute_key);
        if existing_ids.contains(id.as_str()) {
            // Already synthesized on a previous enrichment pass.
            continue;
        }
        synthesized.push(CategoryNode::synthetic(
            id,
            entry.display_label(),
            entry.representative_price().cloned(),
            entry.images.first().cloned(),
        ));
    }
    children.extend(synthesized);
    sort_children_by_price(&mut children);
    children
}

const SYNTHETIC_LEAF_PREFIX: &str = "inv-";

pub fn synthetic_leaf_id(attribute_key: &str) -> String {
    format!("{}{}", SYNTHETIC_LEAF_PREFIX, attribute_key)
}

/// Stable ascending price sort; nodes without any price sort last and keep
/// their relative order.
pub fn sort_children_by_price(children: &mut [CategoryNode]) {
    children.sort_by(|a, b| match (a.sort_price(), b.sort_price()) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Merges vendor inventory into the static category tree. Inventory leaves
/// are attached at nodes the family mapping explicitly anchors, or at static
/// leaves when no anchor names them; synthesized subtrees are never
/// re-enriched, which keeps the operation idempotent.
#[tracing::instrument(name = "Enrich category tree", skip(root, entries), fields(node_id = %root.id))]
pub fn enrich_tree(root: &CategoryNode, entries: &[InventoryEntry]) -> CategoryNode {
    let index = build_family_index(root.linked_attributes.as_ref());
    let mut enriched = root.clone();
    enrich_node(&mut enriched, &index, entries);
    enriched
}

fn enrich_node(node: &mut CategoryNode, index: &FamilyIndex, entries: &[InventoryEntry]) {
    if node.id.starts_with(SYNTHETIC_LEAF_PREFIX) {
        return;
    }
    for child in node.children.iter_mut() {
        enrich_node(child, index, entries);
    }
    if index.anchors_node(&node.id) || node.children.is_empty() {
        let scope = index.families_for_node(&node.id);
        node.children = synthesize_leaves(node, &scope, entries);
    }
}

/// Node lookup returning the ancestor chain `root..=node`.
pub fn find_path<'a>(root: &'a CategoryNode, node_id: &str) -> Option<Vec<&'a CategoryNode>> {
    if root.id == node_id {
        return Some(vec![root]);
    }
    for child in &root.children {
        if let Some(mut path) = find_path(child, node_id) {
            path.insert(0, root);
            return Some(path);
        }
    }
    None
}

pub fn find_node<'a>(root: &'a CategoryNode, node_id: &str) -> Option<&'a CategoryNode> {
    find_path(root, node_id).map(|path| *path.last().expect("path is never empty"))
}

/// Render-mode lookup order: node, then nearest ancestor, then the tree
/// root, then the `card` default. `path` is `root..=node`.
pub fn resolve_display_mode(path: &[&CategoryNode]) -> DisplayMode {
    for node in path.iter().rev() {
        if let Some(mode) = node.own_display_mode() {
            return mode;
        }
    }
    DisplayMode::Card
}

fn collect_ids<'a>(node: &'a CategoryNode, acc: &mut HashSet<&'a str>) {
    acc.insert(node.id.as_str());
    for child in &node.children {
        collect_ids(child, acc);
    }
}

/// Resolves the displayed price and active state for `node` given the
/// current path and attribute selections.
#[tracing::instrument(
    name = "Resolve price",
    skip(node, entries, selections),
    fields(node_id = %node.id)
)]
pub fn resolve_price(
    node: &CategoryNode,
    path_ids: &[String],
    entries: &[InventoryEntry],
    selections: &SelectionState,
    mode: PricingMode,
) -> PriceQuote {
    let mut targets: HashSet<&str> = path_ids.iter().map(String::as_str).collect();
    targets.insert(node.id.as_str());
    let wanted = selections.normalized_attributes();

    let mut found_active_row = false;
    let mut best: Option<BigDecimal> = None;
    let mut any_status_info = false;
    for entry in entries {
        if entry.has_status_info() {
            any_status_info = true;
        }
        if entry.all_rows_inactive() {
            continue;
        }
        if !entry_matches_selections(entry, &wanted) {
            continue;
        }
        for row_key in entry.row_keys() {
            if !row_matches_targets(row_key, &targets) {
                continue;
            }
            if !entry.row_is_active(row_key, mode) {
                continue;
            }
            found_active_row = true;
            if let Some(price) = entry.prices_by_row.get(row_key) {
                if best.as_ref().map_or(true, |current| price < current) {
                    best = Some(price.clone());
                }
            }
        }
    }

    let price = best
        .or_else(|| node.vendor_price.clone())
        .or_else(|| node.price.clone());
    let active = found_active_row
        || (mode == PricingMode::Permissive && {
            let mut subtree: HashSet<&str> = HashSet::new();
            collect_ids(node, &mut subtree);
            subtree.extend(targets.iter());
            any_status_active_for(&subtree, entries) || !any_status_info
        });
    PriceQuote { price, active }
}

fn row_matches_targets(row_key: &str, targets: &HashSet<&str>) -> bool {
    row_key
        .split('|')
        .any(|node_id| targets.contains(node_id.trim()))
}

/// Row-level attribute narrowing: every attribute the user has chosen must
/// match the entry exactly (trimmed, family-agnostic keys).
fn entry_matches_selections(entry: &InventoryEntry, wanted: &HashMap<String, String>) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let Some(attrs) = entry.selections.get(&entry.scope_family) else {
        return false;
    };
    let normalized: HashMap<String, String> = attrs
        .iter()
        .map(|(key, value)| {
            (
                super::schemas::normalize_attribute_key(key),
                value.trim().to_string(),
            )
        })
        .filter(|(_, value)| !value.is_empty())
        .collect();
    wanted
        .iter()
        .all(|(key, value)| normalized.get(key).map(|found| found == value).unwrap_or(false))
}

fn any_status_active_for(node_ids: &HashSet<&str>, entries: &[InventoryEntry]) -> bool {
    entries.iter().any(|entry| {
        entry.pricing_status_by_row.iter().any(|(row_key, status)| {
            is_active_status(status) && row_matches_targets(row_key, node_ids)
        })
    })
}

/// Lowest-price child, ties broken by original order; `None` prices lose to
/// any priced sibling.
pub fn cheapest_child(node: &CategoryNode) -> Option<&CategoryNode> {
    let mut best: Option<&CategoryNode> = None;
    for child in &node.children {
        let replace = match best {
            None => true,
            Some(current) => match (current.sort_price(), child.sort_price()) {
                (None, Some(_)) => true,
                (Some(current_price), Some(candidate)) => candidate < current_price,
                _ => false,
            },
        };
        if replace {
            best = Some(child);
        }
    }
    best
}

/// First-render defaults: the lowest-price candidate at every level, so the
/// UI never opens on an unresolvable combination.
#[tracing::instrument(name = "Default selections", skip(root), fields(node_id = %root.id))]
pub fn default_selections(root: &CategoryNode) -> SelectionState {
    let mut state = SelectionState::default();
    let mut cursor = root;
    while let Some(child) = cheapest_child(cursor) {
        state.chosen.insert(cursor.id.clone(), child.id.clone());
        cursor = child;
    }
    state
}

/// The deepest selected-or-defaulted chain from `root`, used both as the
/// display node and as the target id set for price resolution.
pub fn displayed_path<'a>(root: &'a CategoryNode, state: &SelectionState) -> Vec<&'a CategoryNode> {
    let mut path = vec![root];
    let mut cursor = root;
    while !cursor.children.is_empty() {
        let next = state
            .chosen
            .get(&cursor.id)
            .and_then(|chosen_id| cursor.children.iter().find(|child| &child.id == chosen_id))
            .or_else(|| cheapest_child(cursor));
        match next {
            Some(child) => {
                path.push(child);
                cursor = child;
            }
            None => break,
        }
    }
    path
}

pub fn displayed_node<'a>(root: &'a CategoryNode, state: &SelectionState) -> &'a CategoryNode {
    *displayed_path(root, state)
        .last()
        .expect("displayed path always contains the root")
}

/// Records a child choice at `node_id` and cascade-resets every selection
/// below it, plus the attribute choices of the families scoped to that
/// subtree, so no stale combination survives a level-up change.
pub fn apply_child_selection(
    state: &mut SelectionState,
    root: &CategoryNode,
    index: &FamilyIndex,
    node_id: &str,
    child_id: &str,
) {
    let Some(node) = find_node(root, node_id) else {
        return;
    };
    if !node.children.iter().any(|child| child.id == child_id) {
        return;
    }
    let mut below: HashSet<&str> = HashSet::new();
    for child in &node.children {
        collect_ids(child, &mut below);
    }
    state.chosen.retain(|id, _| !below.contains(id.as_str()));
    state.chosen.insert(node_id.to_string(), child_id.to_string());
    match index.families_for_node(node_id) {
        FamilyScope::Unconstrained => state.attributes.clear(),
        FamilyScope::Only(families) => {
            for family in families {
                state.attributes.remove(&family);
            }
        }
    }
}

/// Vendor-specific combo price overrides, matched by combo id. Overrides
/// without a usable price leave the catalog price in place.
pub fn apply_combo_overrides(combos: &mut [ComboPackage], overrides: &[VendorComboPricing]) {
    for combo in combos.iter_mut() {
        let replacement = overrides
            .iter()
            .find(|pricing| pricing.combo_id == combo.id)
            .and_then(|pricing| pricing.price.clone());
        if replacement.is_some() {
            combo.price = replacement;
        }
    }
}
