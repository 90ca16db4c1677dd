use actix_web::web;
use utoipa::TupleUnit;

use crate::backend_client::CatalogSource;
use crate::errors::GenericError;
use crate::schemas::GenericResponse;

use super::schemas::{
    CatalogSnapshot, CatalogSnapshotRequest, CategoryNode, ComboPackage, DisplayMode,
    InventoryEntry, PriceQuote, PriceResolveRequest, PricingMode, VendorDocument,
    VisibleChildren, VisibleChildrenRequest,
};
use super::utils::{
    apply_combo_overrides, build_family_index, default_selections, displayed_node, displayed_path,
    enrich_tree, family_descriptors, find_node, find_path, resolve_display_mode, resolve_price,
    sort_children_by_price,
};

fn pricing_mode(preview: bool) -> PricingMode {
    if preview {
        PricingMode::Strict
    } else {
        PricingMode::Permissive
    }
}

/// Non-critical backend reads degrade to empty defaults; only a diagnostic
/// is emitted.
async fn load_tree(client: &dyn CatalogSource, category_id: &str) -> Option<CategoryNode> {
    match client.get_category_tree(category_id).await {
        Ok(tree) => tree,
        Err(err) => {
            tracing::warn!("Failed to fetch category tree {}: {:?}", category_id, err);
            None
        }
    }
}

async fn load_vendor(
    client: &dyn CatalogSource,
    vendor_id: &str,
    preview: bool,
) -> Option<VendorDocument> {
    match client.get_vendor_document(vendor_id, preview).await {
        Ok(vendor) => vendor,
        Err(err) => {
            tracing::warn!("Failed to fetch vendor document {}: {:?}", vendor_id, err);
            None
        }
    }
}

async fn load_combos(
    client: &dyn CatalogSource,
    vendor_id: &str,
    category_id: &str,
    preview: bool,
) -> Vec<ComboPackage> {
    let mut combos = match client.get_combos(category_id, preview).await {
        Ok(combos) => combos,
        Err(err) => {
            tracing::warn!("Failed to fetch combos for {}: {:?}", category_id, err);
            return Vec::new();
        }
    };
    if combos.is_empty() {
        return combos;
    }
    match client.get_vendor_combo_pricing(vendor_id, category_id).await {
        Ok(overrides) => apply_combo_overrides(&mut combos, &overrides),
        Err(err) => {
            tracing::warn!("Failed to fetch combo pricing for {}: {:?}", vendor_id, err);
        }
    }
    combos
}

fn category_entries(vendor: Option<&VendorDocument>, category_id: &str) -> Vec<InventoryEntry> {
    vendor
        .map(|vendor| vendor.entries_for_category(category_id).to_vec())
        .unwrap_or_default()
}

#[utoipa::path(
    post,
    path = "/catalog/snapshot",
    tag = "Catalog",
    description = "Fetches the category tree and vendor inventory, merges them and returns the enriched tree with default selections and combo packages.",
    summary = "Catalog Snapshot",
    request_body(content = CatalogSnapshotRequest, description = "Request Body"),
    responses(
        (status=200, description= "Catalog Snapshot", body= GenericResponse<CatalogSnapshot>),
        (status=400, description= "Invalid Request body", body= GenericResponse<TupleUnit>),
        (status=500, description= "Internal Server Error", body= GenericResponse<TupleUnit>)
    )
)]
#[tracing::instrument(
    name = "Catalog Snapshot",
    skip(client),
    fields(vendor_id = %body.vendor_id, category_id = %body.category_id)
)]
pub async fn catalog_snapshot(
    body: CatalogSnapshotRequest,
    client: web::Data<dyn CatalogSource>,
) -> Result<web::Json<GenericResponse<CatalogSnapshot>>, GenericError> {
    let mode = pricing_mode(body.preview);
    let (tree, vendor) = futures::future::join(
        load_tree(client.get_ref(), &body.category_id),
        load_vendor(client.get_ref(), &body.vendor_id, body.preview),
    )
    .await;
    let entries = category_entries(vendor.as_ref(), &body.category_id);
    let tree = tree.map(|tree| enrich_tree(&tree, &entries));
    let default_selections = tree.as_ref().map(default_selections).unwrap_or_default();
    let families = tree
        .as_ref()
        .map(|tree| family_descriptors(&build_family_index(tree.linked_attributes.as_ref())))
        .unwrap_or_default();
    let combos = load_combos(
        client.get_ref(),
        &body.vendor_id,
        &body.category_id,
        body.preview,
    )
    .await;
    Ok(web::Json(GenericResponse::success(
        "Successfully fetched catalog snapshot",
        Some(CatalogSnapshot {
            tree,
            default_selections,
            families,
            combos,
            mode,
        }),
    )))
}

#[utoipa::path(
    post,
    path = "/catalog/price",
    tag = "Catalog",
    description = "Resolves the displayed price and active state for a tree path and the current attribute selections.",
    summary = "Resolve Price",
    request_body(content = PriceResolveRequest, description = "Request Body"),
    responses(
        (status=200, description= "Resolved Price", body= GenericResponse<PriceQuote>),
        (status=400, description= "Invalid Request body", body= GenericResponse<TupleUnit>),
        (status=500, description= "Internal Server Error", body= GenericResponse<TupleUnit>)
    )
)]
#[tracing::instrument(
    name = "Resolve Node Price",
    skip(client),
    fields(vendor_id = %body.vendor_id, category_id = %body.category_id)
)]
pub async fn resolve_node_price(
    body: PriceResolveRequest,
    client: web::Data<dyn CatalogSource>,
) -> Result<web::Json<GenericResponse<PriceQuote>>, GenericError> {
    let mode = pricing_mode(body.preview);
    let (tree, vendor) = futures::future::join(
        load_tree(client.get_ref(), &body.category_id),
        load_vendor(client.get_ref(), &body.vendor_id, body.preview),
    )
    .await;
    let entries = category_entries(vendor.as_ref(), &body.category_id);
    let Some(root) = tree.map(|tree| enrich_tree(&tree, &entries)) else {
        // Missing or malformed tree renders as "Contact for Price".
        return Ok(web::Json(GenericResponse::success(
            "Successfully resolved price",
            Some(PriceQuote {
                price: None,
                active: mode == PricingMode::Permissive,
            }),
        )));
    };
    let node = body
        .node_path
        .last()
        .and_then(|node_id| find_node(&root, node_id))
        .unwrap_or(&root);
    let display = displayed_node(node, &body.selections);
    let mut path_ids = body.node_path.clone();
    path_ids.push(display.id.clone());
    let quote = resolve_price(node, &path_ids, &entries, &body.selections, mode);
    Ok(web::Json(GenericResponse::success(
        "Successfully resolved price",
        Some(quote),
    )))
}

#[utoipa::path(
    post,
    path = "/catalog/children",
    tag = "Catalog",
    description = "Returns the visible children of a node together with its resolved render mode.",
    summary = "Visible Children",
    request_body(content = VisibleChildrenRequest, description = "Request Body"),
    responses(
        (status=200, description= "Visible Children", body= GenericResponse<VisibleChildren>),
        (status=400, description= "Invalid Request body", body= GenericResponse<TupleUnit>),
        (status=500, description= "Internal Server Error", body= GenericResponse<TupleUnit>)
    )
)]
#[tracing::instrument(
    name = "Visible Children",
    skip(client),
    fields(vendor_id = %body.vendor_id, category_id = %body.category_id)
)]
pub async fn visible_children(
    body: VisibleChildrenRequest,
    client: web::Data<dyn CatalogSource>,
) -> Result<web::Json<GenericResponse<VisibleChildren>>, GenericError> {
    let (tree, vendor) = futures::future::join(
        load_tree(client.get_ref(), &body.category_id),
        load_vendor(client.get_ref(), &body.vendor_id, body.preview),
    )
    .await;
    let entries = category_entries(vendor.as_ref(), &body.category_id);
    let Some(root) = tree.map(|tree| enrich_tree(&tree, &entries)) else {
        return Ok(web::Json(GenericResponse::success(
            "Successfully fetched children",
            Some(VisibleChildren {
                children: Vec::new(),
                display_mode: DisplayMode::Card,
                selector_label: None,
            }),
        )));
    };
    let path = match body.node_id.as_deref() {
        Some(node_id) => find_path(&root, node_id).unwrap_or_else(|| vec![&root]),
        None => {
            // No explicit node: show the options at the deepest
            // selected-or-defaulted level.
            let mut path = displayed_path(&root, &body.selections);
            if path.len() > 1 {
                path.pop();
            }
            path
        }
    };
    let node = *path.last().expect("path contains at least the root");
    let mut children = node.children.clone();
    sort_children_by_price(&mut children);
    Ok(web::Json(GenericResponse::success(
        "Successfully fetched children",
        Some(VisibleChildren {
            children,
            display_mode: resolve_display_mode(&path),
            selector_label: node.parent_selector_label.clone(),
        }),
    )))
}
