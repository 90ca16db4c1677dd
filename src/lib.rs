pub mod backend_client;
pub mod configuration;
pub mod errors;
pub mod openapi;
pub mod routes;
pub mod schemas;
pub mod startup;
pub mod telemetry;
pub mod utils;
