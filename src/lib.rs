pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod routes;
pub mod templates;
pub mod tmdb;

use std::sync::Arc;

use axum::{Router, extract::FromRef, routing::get};
use axum_extra::extract::cookie::Key;
use tower_http::trace::TraceLayer;

use crate::{catalog::MovieCatalog, config::Config, tmdb::MetadataSource};

#[derive(Clone)]
pub struct AppState {
    pub catalog: MovieCatalog,
    pub cookie_key: Key,
}

impl AppState {
    /// Connects to the store, applies migrations and wires the catalog to `metadata`.
    pub async fn new(config: Config, metadata: Arc<dyn MetadataSource>) -> anyhow::Result<Self> {
        config::validate_secret(&config.session_secret)?;

        let db = db::connect_and_migrate(&config.database_url).await?;
        let catalog = MovieCatalog::new(db, metadata, config.tmdb_image_base_url.clone());
        let cookie_key = Key::derive_from(config.session_secret.as_bytes());

        Ok(Self { catalog, cookie_key })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/edit", get(routes::edit_form).post(routes::edit))
        .route("/delete", get(routes::delete))
        .route("/add", get(routes::add_form).post(routes::add))
        .route("/find", get(routes::find))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
