// Library root for the storefront API

pub mod api;
pub mod config;
pub mod core;
pub mod domains;
pub mod schema;
pub mod startup;
