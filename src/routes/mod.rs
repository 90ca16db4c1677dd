pub mod catalog;
mod route;
pub mod util;

pub use catalog::catalog_route;
pub use route::main_route;
pub use util::util_route;
