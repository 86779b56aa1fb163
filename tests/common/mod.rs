//! Shared test harness for integration tests.
//!
//! [`TestHarness`] owns a temporary media root, a scanned [`Manager`] over it
//! and an [`AppContext`]. [`TestHarness::with_server`] additionally starts
//! Axum on a random port for tests that need a real TCP connection.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use reelhouse::config::Config;
use reelhouse::server::{create_router, AppContext};
use reelhouse_media::{EntryId, Manager, MountPoint, ResourceMode};
use tempfile::TempDir;
use tower::ServiceExt;

pub const VOLUME: &str = "library";

pub struct TestHarness {
    pub ctx: AppContext,
    pub root: TempDir,
}

impl TestHarness {
    /// Buffered mode, two I/O slots, empty library.
    pub fn new() -> Self {
        Self::with_options(ResourceMode::Buffered, 2)
    }

    pub fn with_options(mode: ResourceMode, max_io: usize) -> Self {
        let root = tempfile::tempdir().expect("failed to create media root");
        let manager = Manager::new(mode, 8 * 1024, [MountPoint::new(VOLUME, root.path(), max_io)])
            .expect("failed to build manager");

        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.admission_timeout_secs = 1;

        let ctx = AppContext::new(Arc::new(manager), config);
        Self { ctx, root }
    }

    /// Write a file under the media root.
    pub fn add_file(&self, rel: &str, content: &[u8]) {
        let path = self.root.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// Reconcile the catalog with the media root.
    pub fn rescan(&self) {
        self.ctx.manager.scan_all();
    }

    /// Id of the cataloged entry named `name`.
    pub fn id_of(&self, name: &str) -> EntryId {
        self.ctx
            .manager
            .list_files()
            .into_iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no entry named {name}"))
            .id
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Send one request through a fresh router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Start an Axum server on a random port.
    pub async fn with_server(self) -> (Self, SocketAddr) {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }
}

/// Collect a response body.
pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_to_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}

/// Deterministic non-repeating-looking content.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
