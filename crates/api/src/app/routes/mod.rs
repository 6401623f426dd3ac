use axum::{
    Router,
    routing::{get, post, put},
};

pub mod crud;
pub mod items;
pub mod members;
pub mod orgs;
pub mod profile;
pub mod settings;
pub mod system;
pub mod users;

/// Public endpoints: health and the setup wizard.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/setup", get(system::setup_status).post(system::complete_setup))
}

/// Sign-up and e-mail verification: no token, but setup must be done.
pub fn accounts_router() -> Router {
    Router::new()
        .route("/accounts/register", post(profile::register))
        .route("/accounts/verify/:token", get(profile::verify))
}

/// Endpoints behind authentication and completed setup.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/profile", get(profile::get).put(profile::update))
        .route("/orgs", get(orgs::list))
        .route("/orgs/switch", post(orgs::switch))
        .route("/crud/:slug", get(crud::list))
        .route("/crud/:slug/export/:format", get(crud::export))
        .route("/items", post(items::create))
        .route("/items/:id", put(items::update).delete(items::delete))
        .route("/users/:id/toggle", post(users::toggle))
        .route("/members", get(members::list).post(members::create))
        .route("/members/export/:format", get(members::export))
        .route("/members/:id", put(members::update))
        .route("/members/:id/toggle", post(members::toggle))
        .route("/settings", get(settings::get).put(settings::update))
}
