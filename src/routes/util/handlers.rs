use actix_web::{HttpResponse, Responder};

#[utoipa::path(
    get,
    path = "/util/health_check",
    tag = "Util",
    description = "Liveness probe for the service.",
    summary = "Health Check",
    responses(
        (status=200, description= "Running", body= String)
    )
)]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("Running")
}
