//! Shared utility functions for provider adapters.

use pc_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Mask a credential for log output: first four and last four characters
/// with an ellipsis between, or `"****"` when the key is too short for
/// that to hide anything. Non-ASCII keys are masked fully rather than
/// byte-sliced at a char boundary.
pub fn mask_key(key: &str) -> String {
    if key.len() <= 10 || !key.is_ascii() {
        return "****".into();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}
