//! HTTP `Range` header handling for single byte ranges.

/// What a request's `Range` header asks for, given the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: serve the whole file with 200.
    Full,
    /// Inclusive `start..=end`, served with 206.
    Partial { start: u64, end: u64 },
    /// Syntactically valid but outside the file: 416.
    Unsatisfiable,
}

impl ByteRange {
    /// Resolve an optional `Range` header value against `file_size`.
    ///
    /// Supports:
    /// - bytes=0-499
    /// - bytes=500-
    /// - bytes=-500 (last 500 bytes)
    ///
    /// Malformed headers, other units and multi-range requests are ignored
    /// and the full file is served.
    pub fn parse(header: Option<&str>, file_size: u64) -> Self {
        let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return Self::Full;
        };
        if spec.contains(',') {
            return Self::Full;
        }

        let Some((start, end)) = spec.split_once('-') else {
            return Self::Full;
        };
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            // bytes=-500
            (true, false) => {
                let Ok(suffix_len) = end.parse::<u64>() else {
                    return Self::Full;
                };
                if suffix_len == 0 || file_size == 0 {
                    return Self::Unsatisfiable;
                }
                Self::Partial {
                    start: file_size.saturating_sub(suffix_len),
                    end: file_size - 1,
                }
            }
            // bytes=500-
            (false, true) => {
                let Ok(start) = start.parse::<u64>() else {
                    return Self::Full;
                };
                if start >= file_size {
                    return Self::Unsatisfiable;
                }
                Self::Partial {
                    start,
                    end: file_size - 1,
                }
            }
            // bytes=0-499
            (false, false) => {
                let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>()) else {
                    return Self::Full;
                };
                if start > end {
                    return Self::Full;
                }
                if start >= file_size {
                    return Self::Unsatisfiable;
                }
                Self::Partial {
                    start,
                    end: end.min(file_size - 1),
                }
            }
            // bytes=-
            (true, true) => Self::Full,
        }
    }

    /// Offset and length to serve for a file of `file_size` bytes.
    pub fn span(&self, file_size: u64) -> Option<(u64, u64)> {
        match *self {
            Self::Full => Some((0, file_size)),
            Self::Partial { start, end } => Some((start, end - start + 1)),
            Self::Unsatisfiable => None,
        }
    }
}
