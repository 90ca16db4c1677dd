use super::handlers::{catalog_snapshot, resolve_node_price, visible_children};
use actix_web::web;

pub fn catalog_route(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/snapshot").route(web::post().to(catalog_snapshot)));
    cfg.service(web::resource("/price").route(web::post().to(resolve_node_price)));
    cfg.service(web::resource("/children").route(web::post().to(visible_children)));
}
