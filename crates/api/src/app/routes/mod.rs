use axum::{
    routing::{get, post},
    Router,
};

pub mod adjustments;
pub mod auth;
pub mod categories;
pub mod common;
pub mod customers;
pub mod deliveries;
pub mod locations;
pub mod otp;
pub mod products;
pub mod receipts;
pub mod stock;
pub mod suppliers;
pub mod system;
pub mod units;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .nest("/otp", otp::router())
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(auth::me))
        .nest("/suppliers", suppliers::router())
        .nest("/customers", customers::router())
        .nest("/units-of-measure", units::router())
        .nest("/locations", locations::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/receipts", receipts::router())
        .nest("/deliveries", deliveries::router())
        .nest("/adjustments", adjustments::router())
        .nest("/stock", stock::router())
}
