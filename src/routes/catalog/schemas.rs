use std::collections::HashMap;

use actix_http::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use bigdecimal::BigDecimal;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::GenericError;
use crate::utils::parse_decimal;

/// Render mode for a node's children. The backend stores these as free
/// text, so parsing is case-insensitive and tolerates the singular and
/// `select` spellings used by older category documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Card,
    Dropdown,
    Buttons,
}

impl DisplayMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "card" => Some(DisplayMode::Card),
            "dropdown" | "select" => Some(DisplayMode::Dropdown),
            "buttons" | "button" => Some(DisplayMode::Buttons),
            _ => None,
        }
    }
}

/// Dummy (preview/demo) vendors fail closed: a row without an explicit
/// Active status never contributes a price. Accepted vendors fail open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    Strict,
    Permissive,
}

pub fn is_active_status(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("active")
}

/// Bike documents use `bikeBrand`/`bikeTransmission` style attribute keys
/// while car documents use `brand`/`transmission`. Both are folded into one
/// lowercase family-agnostic key before any comparison.
pub fn normalize_attribute_key(key: &str) -> String {
    let lowered = key.trim().to_ascii_lowercase();
    match lowered.strip_prefix("bike") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lowered,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_lenient_children")]
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
    #[serde(default, deserialize_with = "deserialize_lenient_string_list")]
    pub display_type: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_lenient_price")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_price")]
    #[schema(value_type = Option<f64>)]
    pub vendor_price: Option<BigDecimal>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub parent_selector_label: Option<String>,
    /// Present on the tree root only: the join table between inventory
    /// families and tree nodes.
    #[serde(default)]
    pub linked_attributes: Option<HashMap<String, Vec<String>>>,
}

impl CategoryNode {
    pub fn synthetic(id: String, name: String, price: Option<BigDecimal>, image_url: Option<String>) -> Self {
        Self {
            id,
            name,
            vendor_price: price,
            image_url,
            ..Self::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Vendor override wins over the category default.
    pub fn sort_price(&self) -> Option<&BigDecimal> {
        self.vendor_price.as_ref().or(self.price.as_ref())
    }

    pub fn own_display_mode(&self) -> Option<DisplayMode> {
        self.display_type
            .as_ref()
            .and_then(|list| list.first())
            .and_then(|raw| DisplayMode::parse(raw))
    }

    pub fn terms_list(&self) -> Vec<String> {
        self.terms
            .as_deref()
            .unwrap_or("")
            .split(|c| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_opt_string")]
    pub at: Option<String>,
    #[serde(default)]
    pub scope_family: String,
    #[serde(default)]
    pub scope_label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_selections")]
    pub selections: HashMap<String, HashMap<String, String>>,
    #[serde(default, deserialize_with = "deserialize_lenient_price_map")]
    #[schema(value_type = HashMap<String, f64>)]
    pub prices_by_row: HashMap<String, BigDecimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_status_map")]
    pub pricing_status_by_row: HashMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_lenient_images")]
    pub images: Vec<String>,
}

impl InventoryEntry {
    /// Stable identity for UI keying: `_id`, then the creation marker, then
    /// the attribute combination.
    pub fn stable_key(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| self.at.clone())
            .or_else(|| self.attribute_key())
    }

    /// Canonical key of this entry's non-empty attribute pairs, sorted by
    /// attribute name so that identical combinations deduplicate.
    pub fn attribute_key(&self) -> Option<String> {
        let attrs = self.selections.get(&self.scope_family)?;
        let mut pairs: Vec<(&str, &str)> = attrs
            .iter()
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        Some(
            pairs
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join("|"),
        )
    }

    /// Price used when this entry stands in as a synthesized leaf.
    pub fn representative_price(&self) -> Option<&BigDecimal> {
        self.prices_by_row.values().min()
    }

    pub fn display_label(&self) -> String {
        if let Some(attrs) = self.selections.get(&self.scope_family) {
            let mut pairs: Vec<(&str, &str)> = attrs
                .iter()
                .map(|(key, value)| (key.trim(), value.trim()))
                .filter(|(key, value)| !key.is_empty() && !value.is_empty())
                .collect();
            pairs.sort();
            if !pairs.is_empty() {
                return pairs
                    .iter()
                    .map(|(_, value)| *value)
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
        self.scope_label
            .clone()
            .unwrap_or_else(|| self.scope_family.clone())
    }

    pub fn has_status_info(&self) -> bool {
        !self.pricing_status_by_row.is_empty()
    }

    /// First-pass coarse exclusion: an entry where every row is explicitly
    /// inactive is dropped before any row-level matching.
    pub fn all_rows_inactive(&self) -> bool {
        !self.pricing_status_by_row.is_empty()
            && self
                .pricing_status_by_row
                .values()
                .all(|status| !is_active_status(status))
    }

    /// Row keys to consult for pricing: the price map, or the status map
    /// when no prices were recorded.
    pub fn row_keys(&self) -> Vec<&str> {
        if !self.prices_by_row.is_empty() {
            self.prices_by_row.keys().map(String::as_str).collect()
        } else {
            self.pricing_status_by_row
                .keys()
                .map(String::as_str)
                .collect()
        }
    }

    pub fn row_is_active(&self, row_key: &str, mode: PricingMode) -> bool {
        match self.pricing_status_by_row.get(row_key) {
            Some(status) => is_active_status(status),
            None => mode == PricingMode::Permissive,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorDocument {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Inventory entries keyed by category id.
    #[serde(default, deserialize_with = "deserialize_lenient_inventory")]
    pub inventory: HashMap<String, Vec<InventoryEntry>>,
}

impl VendorDocument {
    pub fn entries_for_category(&self, category_id: &str) -> &[InventoryEntry] {
        self.inventory
            .get(category_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComboPackage {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_lenient_price")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorComboPricing {
    #[serde(default)]
    pub combo_id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_price")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
}

/// The user's ephemeral drill-down state: chosen child per node, plus
/// chosen attribute values per family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionState {
    pub chosen: HashMap<String, String>,
    pub attributes: HashMap<String, HashMap<String, String>>,
}

impl SelectionState {
    /// Records an attribute choice. Choosing a brand invalidates the
    /// dependent model/transmission/body-type choices for that family.
    pub fn set_attribute(&mut self, family: &str, key: &str, value: &str) {
        let family_attrs = self.attributes.entry(family.to_string()).or_default();
        if normalize_attribute_key(key) == "brand" {
            family_attrs.retain(|existing, _| {
                !matches!(
                    normalize_attribute_key(existing).as_str(),
                    "model" | "transmission" | "bodytype"
                )
            });
        }
        family_attrs.insert(key.to_string(), value.to_string());
    }

    /// Model pickers stay disabled until a brand is chosen for the family.
    pub fn model_enabled(&self, family: &str) -> bool {
        self.attributes
            .get(family)
            .map(|attrs| {
                attrs.iter().any(|(key, value)| {
                    normalize_attribute_key(key) == "brand" && !value.trim().is_empty()
                })
            })
            .unwrap_or(false)
    }

    /// Non-empty attribute choices with family-agnostic keys and trimmed
    /// values, the shape every matching step works on.
    pub fn normalized_attributes(&self) -> HashMap<String, String> {
        let mut normalized = HashMap::new();
        for attrs in self.attributes.values() {
            for (key, value) in attrs {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                normalized.insert(normalize_attribute_key(key), value.to_string());
            }
        }
        normalized
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshotRequest {
    pub vendor_id: String,
    pub category_id: String,
    #[serde(default)]
    pub preview: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub tree: Option<CategoryNode>,
    pub default_selections: SelectionState,
    pub families: Vec<FamilyDescriptor>,
    pub combos: Vec<ComboPackage>,
    pub mode: PricingMode,
}

/// Which attribute pickers the rendering layer should offer per inventory
/// family.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDescriptor {
    pub family: String,
    pub fields: Vec<String>,
    pub model_fields: Vec<String>,
    pub inventory_labels: Vec<String>,
    /// Labels that carry their own subcategory mapping.
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceResolveRequest {
    pub vendor_id: String,
    pub category_id: String,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub node_path: Vec<String>,
    #[serde(default)]
    pub selections: SelectionState,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// `null` renders as "Contact for Price".
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibleChildrenRequest {
    pub vendor_id: String,
    pub category_id: String,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub selections: SelectionState,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibleChildren {
    pub children: Vec<CategoryNode>,
    pub display_mode: DisplayMode,
    pub selector_label: Option<String>,
}

impl FromRequest for CatalogSnapshotRequest {
    type Error = GenericError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = web::Json::<Self>::from_request(req, payload);

        Box::pin(async move {
            match fut.await {
                Ok(json) => Ok(json.into_inner()),
                Err(e) => Err(GenericError::ValidationError(e.to_string())),
            }
        })
    }
}

impl FromRequest for PriceResolveRequest {
    type Error = GenericError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = web::Json::<Self>::from_request(req, payload);

        Box::pin(async move {
            match fut.await {
                Ok(json) => Ok(json.into_inner()),
                Err(e) => Err(GenericError::ValidationError(e.to_string())),
            }
        })
    }
}

impl FromRequest for VisibleChildrenRequest {
    type Error = GenericError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = web::Json::<Self>::from_request(req, payload);

        Box::pin(async move {
            match fut.await {
                Ok(json) => Ok(json.into_inner()),
                Err(e) => Err(GenericError::ValidationError(e.to_string())),
            }
        })
    }
}

fn deserialize_lenient_children<'de, D>(deserializer: D) -> Result<Vec<CategoryNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        // Non-array children degrade to an empty list.
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<CategoryNode>(item).ok())
        .filter(|child| !child.id.trim().is_empty())
        .collect())
}

fn deserialize_lenient_price<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal))
}

fn deserialize_lenient_price_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mut prices = HashMap::new();
    if let Value::Object(map) = value {
        for (row_key, raw) in map {
            if let Some(price) = parse_decimal(&raw) {
                prices.insert(row_key, price);
            }
        }
    }
    Ok(prices)
}

fn deserialize_lenient_status_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mut statuses = HashMap::new();
    if let Value::Object(map) = value {
        for (row_key, raw) in map {
            if let Value::String(status) = raw {
                statuses.insert(row_key, status);
            }
        }
    }
    Ok(statuses)
}

fn deserialize_lenient_selections<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, HashMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mut selections = HashMap::new();
    if let Value::Object(families) = value {
        for (family, attrs) in families {
            let Value::Object(attrs) = attrs else {
                continue;
            };
            let mut parsed = HashMap::new();
            for (key, raw) in attrs {
                match raw {
                    Value::String(text) => {
                        parsed.insert(key, text);
                    }
                    Value::Number(number) => {
                        parsed.insert(key, number.to_string());
                    }
                    Value::Bool(flag) => {
                        parsed.insert(key, flag.to_string());
                    }
                    _ => {}
                }
            }
            selections.insert(family, parsed);
        }
    }
    Ok(selections)
}

fn deserialize_lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(single)) => Some(vec![single]),
        _ => None,
    })
}

fn deserialize_lenient_images<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    // The inventory modal caps uploads at five images per row.
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(url),
            _ => None,
        })
        .take(5)
        .collect())
}

fn deserialize_lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn deserialize_lenient_inventory<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, Vec<InventoryEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mut inventory = HashMap::new();
    if let Value::Object(categories) = value {
        for (category_id, raw_entries) in categories {
            let Value::Array(raw_entries) = raw_entries else {
                continue;
            };
            let entries: Vec<InventoryEntry> = raw_entries
                .into_iter()
                .filter_map(|raw| serde_json::from_value::<InventoryEntry>(raw).ok())
                .collect();
            inventory.insert(category_id, entries);
        }
    }
    Ok(inventory)
}
