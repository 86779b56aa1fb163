//! JSON catalog routes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use reelhouse_media::MediaFile;
use serde::Deserialize;

use super::AppContext;

/// Create API routes.
pub fn api_routes() -> Router<AppContext> {
    Router::new().route("/files", get(list_files))
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub category: Option<String>,
}

impl CategoryFilter {
    /// An absent or empty filter matches everything.
    pub fn matches(&self, category: &str) -> bool {
        match self.category.as_deref() {
            None | Some("") => true,
            Some(wanted) => wanted == category,
        }
    }
}

/// List every cataloged file, ordered by name.
async fn list_files(
    State(ctx): State<AppContext>,
    Query(filter): Query<CategoryFilter>,
) -> Json<Vec<MediaFile>> {
    let files = ctx
        .manager
        .list_files()
        .into_iter()
        .filter(|f| filter.matches(&f.category))
        .collect();
    Json(files)
}
