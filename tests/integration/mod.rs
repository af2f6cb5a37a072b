// Integration tests organized by module

#[path = "../common/mod.rs"]
mod common;

mod test_auth_flow;
mod test_builtin_routes;
mod test_startup;
