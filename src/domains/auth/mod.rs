// Auth domain: session handshake routes backed by the user index

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::errors::DomainError;
use crate::core::logger::Severity;
use crate::domains::Domain;
use crate::startup::context::RuntimeContext;

pub mod audit;
pub mod cookies;
pub mod flow;
pub mod handlers;
pub mod origin;
pub mod store;
pub mod token;

pub use flow::{AuthFlow, RedirectEndpoints};
pub use origin::{perceived_origin, PerceivedOrigin};
pub use store::SessionStatus;

/// Registers the handshake routes
///
/// Depends on the users domain having published its index.
pub struct AuthDomain;

#[async_trait]
impl Domain for AuthDomain {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, context: &mut RuntimeContext) -> Result<(), DomainError> {
        let users = context.users().ok_or(DomainError::MissingDependency("users"))?;
        let flow = Arc::new(AuthFlow::from_config(users, context.config())?);
        let client_origin = context.config().client_origin.clone();

        context
            .routes_mut()
            .post("/login", handlers::login(&flow, |origin| format!("{origin}/authorize")))
            .get("/authorize", handlers::authorize(&flow, format!("{client_origin}/auth/authorized")))
            .post("/logout", handlers::logout(&flow, |origin| format!("{origin}/deauthorize")))
            .get("/deauthorize", handlers::deauthorize(&flow, format!("{client_origin}/auth/login")))
            .get("/session/test", handlers::test_session(&flow));

        context
            .logger()
            .emit("auth_routes_registered", Severity::Debug, "Auth handshake routes registered");
        Ok(())
    }
}
