//! Memoized text view of a task outcome

use tracing::warn;

use super::TaskFailure;
use crate::transport::{DecodedResponse, RawResponse};

/// Decode a terminal outcome into header and body text.
///
/// Never fails. A body that cannot be decoded turns into placeholder text
/// while the headers are kept; a failed task yields a description of the
/// failure as its body.
pub(super) fn materialize(
    reference_id: u64,
    result: &Result<Box<dyn RawResponse>, TaskFailure>,
) -> DecodedResponse {
    match result {
        Ok(raw) => {
            let text = raw.decode();
            let body = text.body.unwrap_or_else(|e| {
                warn!(reference_id, error = %e, "Response body could not be decoded");
                format!("[undecodable response: {e}]")
            });

            DecodedResponse {
                headers: text.headers,
                body,
            }
        }
        Err(failure) => DecodedResponse {
            headers: String::new(),
            body: format!("[request failed: {failure}]"),
        },
    }
}
