pub mod api;
pub mod id;
pub mod models;
