//! HTTP API handlers for coohom-uploader

pub mod health;
pub mod uploads;

pub use health::health_routes;
pub use uploads::upload_routes;
