//! HTTP Range request parsing module
//!
//! Single-range `bytes` parsing per RFC 7233, used by the static-file
//! facility for partial responses.

/// Parsed Range request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    /// Start byte position
    pub start: usize,
    /// End byte position, None means until end of file
    pub end: Option<usize>,
}

impl RangeRequest {
    /// Actual end position, clamped to the file size
    #[inline]
    pub fn end_position(&self, file_size: usize) -> usize {
        let last = file_size.saturating_sub(1);
        self.end.map_or(last, |e| e.min(last))
    }
}

/// Range header parse result
#[derive(Debug)]
pub enum RangeParseResult {
    /// Valid range request
    Valid(RangeRequest),
    /// Start beyond end of file, the response should be 416
    NotSatisfiable,
    /// No Range header or malformed, return the full content
    None,
}

/// Parse an HTTP Range header (single range only, bytes unit)
///
/// Supported forms: `bytes=start-end`, `bytes=start-`, `bytes=-suffix`.
/// Malformed headers and multi-range requests are ignored rather than
/// rejected, per RFC 7233's "may ignore" allowance.
pub fn parse_range_header(range_header: Option<&str>, file_size: usize) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(spec) = header.strip_prefix("bytes=") else {
        return RangeParseResult::None;
    };

    // Multi-range requests are out of scope for static assets
    if spec.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeParseResult::None;
    };

    if file_size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    if start_str.is_empty() {
        // Suffix form: last N bytes
        let Ok(suffix) = end_str.parse::<usize>() else {
            return RangeParseResult::None;
        };
        if suffix == 0 {
            return RangeParseResult::NotSatisfiable;
        }
        return RangeParseResult::Valid(RangeRequest {
            start: file_size.saturating_sub(suffix),
            end: None,
        });
    }

    let Ok(start) = start_str.parse::<usize>() else {
        return RangeParseResult::None;
    };
    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    if end_str.is_empty() {
        return RangeParseResult::Valid(RangeRequest { start, end: None });
    }

    match end_str.parse::<usize>() {
        Ok(end) if end >= start => RangeParseResult::Valid(RangeRequest {
            start,
            end: Some(end),
        }),
        _ => RangeParseResult::None,
    }
}
