//! Direct streaming with HTTP range requests.
//!
//! A request holds one I/O slot on its entry's mount from admission until the
//! last byte is sent or the client goes away. The file is read on the
//! blocking pool and forwarded to the response body through a bounded
//! channel, so a slow client applies backpressure to the reader.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::Response,
};
use bytes::Bytes;
use reelhouse_common::{EntryId, Error};
use reelhouse_media::{IoPermit, Resource};
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::headers::{
    content_disposition, content_type_for, http_date, is_dlna_client, CONTENT_FEATURES,
    DLNA_CONTENT_FEATURES, REAL_TIME_INFO, TRANSFER_MODE,
};
use super::range::ByteRange;
use crate::server::{AppContext, AppError};

/// Bytes read per chunk sent to the client.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks in flight between the reader and the response body.
const CHANNEL_DEPTH: usize = 4;

/// Serve a cataloged file with range request support.
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    tracing::debug!(
        id = %id,
        range = ?headers.get(header::RANGE),
        user_agent = ?headers.get(header::USER_AGENT),
        "Stream request"
    );

    let id: EntryId = id.parse().map_err(|e| {
        tracing::debug!(id = %id, "Malformed entry id: {e}");
        Error::not_found(id.clone())
    })?;

    let entry = ctx.manager.get_entry(id)?;

    let mount = ctx.manager.mount(&entry.volume_id).inspect_err(|_| {
        tracing::error!(volume = %entry.volume_id, id = %id, "Volume missing for entry");
    })?;

    let permit = match tokio::time::timeout(
        ctx.admission_timeout(),
        mount.limiter().acquire(&ctx.shutdown),
    )
    .await
    {
        Ok(permit) => permit?,
        Err(_) => {
            tracing::warn!(volume = %entry.volume_id, id = %id, "I/O limit reached");
            return Err(AppError::busy());
        }
    };

    let manager = Arc::clone(&ctx.manager);
    let open_entry = entry.clone();
    let resource = tokio::task::spawn_blocking(move || manager.open_resource(&open_entry))
        .await
        .map_err(|e| AppError::internal(format!("spawn_blocking join error: {e}")))?
        .inspect_err(|e| {
            if e.is_path_outside_root() {
                tracing::warn!(
                    id = %id,
                    path = %entry.path.display(),
                    "Security alert: attempted path traversal"
                );
            } else {
                tracing::debug!(id = %id, "Opening resource failed: {e}");
            }
        })?;

    let file_size = resource.size();
    let range = ByteRange::parse(
        headers.get(header::RANGE).and_then(|h| h.to_str().ok()),
        file_size,
    );

    let Some((offset, length)) = range.span(file_size) else {
        return Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::empty())
            .map_err(|e| AppError::internal(e.to_string()));
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(resource.name()))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(header::LAST_MODIFIED, http_date(resource.modified()));

    builder = match range {
        ByteRange::Partial { start, end } => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}")),
        _ => builder.status(StatusCode::OK),
    };

    if let Some(disposition) = content_disposition(resource.name()) {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }

    if is_dlna_client(&headers) {
        builder = builder
            .header(TRANSFER_MODE, "Streaming")
            .header(CONTENT_FEATURES, DLNA_CONTENT_FEATURES)
            .header(REAL_TIME_INFO, "DLNA.ORG_TLAG=*")
            .header(header::CONNECTION, HeaderValue::from_static("close"));
    }

    tracing::debug!(
        id = %id,
        name = resource.name(),
        offset,
        bytes = length,
        mode = %resource.mode(),
        "Serving file"
    );

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        tokio::task::spawn_blocking(move || pump(resource, permit, offset, length, tx));
        Body::from_stream(ReceiverStream::new(rx))
    };

    builder
        .body(body)
        .map_err(|e| AppError::internal(e.to_string()))
}

/// Copy `length` bytes starting at `offset` from `resource` into `tx`.
///
/// Runs on the blocking pool and owns both the resource and the I/O slot,
/// releasing them when the range is done, on a read error, or as soon as the
/// receiving body is dropped.
fn pump(
    mut resource: Resource,
    permit: IoPermit,
    offset: u64,
    length: u64,
    tx: mpsc::Sender<io::Result<Bytes>>,
) {
    let result = copy_range(&mut resource, offset, length, &tx);

    match result {
        Ok(sent) => tracing::trace!(sent, "Stream finished"),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::trace!("Client disconnected: {e}");
        }
        Err(e) => {
            tracing::debug!("Stream aborted: {e}");
            let _ = tx.blocking_send(Err(e));
        }
    }

    if let Err(e) = resource.close() {
        tracing::debug!("Closing resource failed: {e}");
    }
    drop(permit);
}

fn copy_range(
    resource: &mut Resource,
    offset: u64,
    length: u64,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> io::Result<u64> {
    if offset > 0 {
        resource.seek(SeekFrom::Start(offset))?;
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = length;

    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = match resource.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "file shrank while streaming",
                ))
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if tx
            .blocking_send(Ok(Bytes::copy_from_slice(&buf[..n])))
            .is_err()
        {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"));
        }
        remaining -= n as u64;
    }

    Ok(length)
}
