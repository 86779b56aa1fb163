//! Extended M3U playlist of the catalog.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
};
use reelhouse_media::MediaFile;
use std::fmt::Write;

use crate::server::routes_api::CategoryFilter;
use crate::server::AppContext;

/// Serve every cataloged file (optionally one category) as an M3U playlist
/// whose URLs point back at this server.
pub async fn playlist(
    State(ctx): State<AppContext>,
    Query(filter): Query<CategoryFilter>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}:{}", ctx.config.server.host, ctx.config.server.port));

    let files = ctx
        .manager
        .list_files()
        .into_iter()
        .filter(|f| filter.matches(&f.category));

    (
        [(header::CONTENT_TYPE, "audio/x-mpegurl")],
        render_m3u(&host, files),
    )
}

/// Render `#EXTM3U` followed by one `#EXTINF` + URL pair per file.
pub fn render_m3u(host: &str, files: impl IntoIterator<Item = MediaFile>) -> String {
    let mut out = String::from("#EXTM3U\n");
    for file in files {
        let title = format!("{} - {}", file.category, file.name).replace(['\r', '\n'], " ");
        let _ = writeln!(out, "#EXTINF:-1,{title}");
        let _ = writeln!(out, "http://{host}/stream/{}", file.id);
    }
    out
}
