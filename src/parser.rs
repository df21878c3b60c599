//! Extraction of a move proposal from free-form provider text.
//!
//! Providers are asked to answer with two lines:
//!
//! ```text
//! MOVE: e2e4
//! REASON: central control
//! ```
//!
//! Parsing is defensive: the keywords are matched case-insensitively
//! anywhere in the text, the first `MOVE:` followed by a well-formed
//! coordinate token wins, and everything after `REASON:` is the rationale.

use crate::failure::Failure;
use crate::types::{MoveProposal, NO_REASON_PROVIDED};
use tracing::{debug, instrument};

const MOVE_KEYWORD: &str = "move:";
const REASON_KEYWORD: &str = "reason:";

/// Parses raw provider output into a [`MoveProposal`].
///
/// # Errors
///
/// Returns an `UnparsableResponse` failure carrying the original text
/// when no `MOVE:`-prefixed coordinate token is present.
#[instrument(skip(raw), fields(raw_len = raw.len()))]
pub fn parse_response(raw: &str) -> Result<MoveProposal, Failure> {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let folded = raw.to_ascii_lowercase();

    let Some(uci) = find_move(&folded) else {
        debug!("No MOVE token found");
        return Err(Failure::unparsable(raw));
    };

    let rationale = find_reason(raw, &folded).unwrap_or_else(|| NO_REASON_PROVIDED.to_string());
    debug!(uci = %uci, "Parsed provider response");
    Ok(MoveProposal::new(uci, rationale))
}

fn find_move(folded: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = folded[search_from..].find(MOVE_KEYWORD) {
        let after_keyword = search_from + offset + MOVE_KEYWORD.len();
        if let Some(token) = coordinate_token(folded[after_keyword..].trim_start()) {
            return Some(token);
        }
        search_from = after_keyword;
    }
    None
}

/// Reads `[a-h][1-8][a-h][1-8][qrbn]?` from the start of `text`.
fn coordinate_token(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    if bytes.len() < 4 {
        return None;
    }

    let is_file = |b: u8| (b'a'..=b'h').contains(&b);
    let is_rank = |b: u8| (b'1'..=b'8').contains(&b);
    if !(is_file(bytes[0]) && is_rank(bytes[1]) && is_file(bytes[2]) && is_rank(bytes[3])) {
        return None;
    }

    let len = match bytes.get(4) {
        Some(b'q' | b'r' | b'b' | b'n') => 5,
        _ => 4,
    };
    Some(text[..len].to_string())
}

fn find_reason(raw: &str, folded: &str) -> Option<String> {
    let start = folded.find(REASON_KEYWORD)? + REASON_KEYWORD.len();
    Some(raw[start..].trim().to_string())
}
