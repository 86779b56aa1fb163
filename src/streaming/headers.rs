//! Response header helpers for streamed media.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::SystemTime;

pub const TRANSFER_MODE: HeaderName = HeaderName::from_static("transfermode.dlna.org");
pub const CONTENT_FEATURES: HeaderName = HeaderName::from_static("contentfeatures.dlna.org");
pub const REAL_TIME_INFO: HeaderName = HeaderName::from_static("realtimeinfo.dlna.org");
const GET_CONTENT_FEATURES: &str = "getcontentfeatures.dlna.org";

/// Streaming profile advertised to DLNA renderers: range seeking allowed,
/// no transcoding, streaming transfer mode.
pub const DLNA_CONTENT_FEATURES: &str =
    "DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000";

/// User-Agent fragments of renderers known to expect DLNA headers.
const DLNA_USER_AGENTS: &[&str] = &[
    "dlna",
    "upnp",
    "foobar",
    "kodi",
    "xbmc",
    "plex",
    "roku",
    "lg ",
    "samsung",
    "sony",
    "playstation",
    "xbox",
    "windows media player",
    "vlc",
];

/// Determine content type from a file name's extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "mpg" | "mpeg" => "video/mpeg",
        _ => "application/octet-stream",
    }
}

/// Whether the request looks like it comes from a DLNA/UPnP renderer.
pub fn is_dlna_client(headers: &HeaderMap) -> bool {
    if headers.contains_key(GET_CONTENT_FEATURES) || headers.contains_key(&TRANSFER_MODE) {
        return true;
    }

    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|ua| {
            let ua = ua.to_lowercase();
            DLNA_USER_AGENTS.iter().any(|needle| ua.contains(needle))
        })
        .unwrap_or(false)
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// `inline` disposition so browsers play instead of downloading.
pub fn content_disposition(name: &str) -> Option<HeaderValue> {
    let safe: String = name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_bytes(format!("inline; filename=\"{safe}\"").as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("movie.mp4"), "video/mp4");
        assert_eq!(content_type_for("clip.M4V"), "video/mp4");
        assert_eq!(content_type_for("show.mkv"), "video/x-matroska");
        assert_eq!(content_type_for("old.MPEG"), "video/mpeg");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }

    #[test]
    fn test_dlna_detection_by_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Samsung SmartTV/1.0"));
        assert!(is_dlna_client(&headers));

        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0 Firefox"));
        assert!(!is_dlna_client(&headers));
    }

    #[test]
    fn test_dlna_detection_by_request_header() {
        let mut headers = HeaderMap::new();
        headers.insert(GET_CONTENT_FEATURES, HeaderValue::from_static("1"));
        assert!(is_dlna_client(&headers));
        assert!(!is_dlna_client(&HeaderMap::new()));
    }

    #[test]
    fn test_http_date() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        let v = content_disposition("a \"b\".mp4").unwrap();
        assert_eq!(v.to_str().unwrap(), "inline; filename=\"a _b_.mp4\"");
    }
}
