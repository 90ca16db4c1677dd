use utoipa::OpenApi;
use utoipauto::utoipauto;
#[utoipauto]
#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "Vendor Catalog Preview REST API", description = "Storefront catalog preview API endpoints")
    ),
)]

pub struct ApiDoc {}
