// Output: reporting sinks for a screening run.
//
// A ReportSink consumes a finished ScreenReport. The terminal sink is
// always used; the NDJSON sink is added when `screen --output` is given.

pub mod ndjson;
pub mod terminal;

use anyhow::Result;

use crate::pipeline::screener::ScreenReport;

pub trait ReportSink {
    fn emit(&mut self, report: &ScreenReport) -> Result<()>;
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Respects UTF-8 character boundaries, so it never panics on multi-byte
/// characters like emoji or accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// The first `max_chars` characters of `text`, borrowed, with no marker.
pub fn truncate_chars_exact(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
