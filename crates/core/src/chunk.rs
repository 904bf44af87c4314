//! Message chunker — splits long replies to fit a platform message limit.
//!
//! Long text is cut at the latest natural breakpoint inside each window,
//! preferring a newline, then a sentence end (`". "`), then a clause break
//! (`", "`), and falling back to a hard cut. Lengths are counted in Unicode
//! scalar values, so a cut never lands inside a UTF-8 code point.

use tracing::trace;
use crate::error::ChunkError;

/// Discord's per-message character limit.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Breakpoints in priority order.
const BREAKPOINTS: [&str; 3] = ["\n", ". ", ", "];

/// Split `text` into ordered chunks of at most `max_len` characters.
///
/// Text that already fits is returned unchanged as a single chunk; empty text
/// yields no chunks. Whitespace around each cut is trimmed, so concatenating
/// the chunks reproduces the original modulo whitespace at the boundaries.
pub fn split(text: &str, max_len: usize) -> Result<Vec<String>, ChunkError> {
    if max_len == 0 {
        return Err(ChunkError::InvalidMaxLength);
    }

    if text.chars().count() <= max_len {
        return Ok(if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        });
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        // Byte offset of the first character past the window.
        let Some((window_end, _)) = remaining.char_indices().nth(max_len) else {
            if !remaining.is_empty() {
                chunks.push(remaining.to_string());
            }
            break;
        };

        let cut = breakpoint(&remaining[..window_end]).unwrap_or(window_end);
        let piece = remaining[..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        remaining = remaining[cut..].trim();
    }

    trace!(chunks = chunks.len(), max_len, "Split long text");
    Ok(chunks)
}

/// End offset (exclusive) of the chunk ending at the latest breakpoint.
///
/// The cut keeps the breakpoint's first character (`\n`, `.` or `,`), which
/// is always a single byte. A breakpoint at offset 0 would produce an empty
/// chunk and is ignored.
fn breakpoint(window: &str) -> Option<usize> {
    BREAKPOINTS.iter().find_map(|sep| {
        window
            .rfind(sep)
            .filter(|&idx| idx > 0)
            .map(|idx| idx + 1)
    })
}
