//! HTTP surface: inventory pages and JSON API

pub mod pages;
pub mod routes;

pub use routes::build_router;
