//! Response header merging.

use crate::request::canonical_header_key;
use std::collections::BTreeMap;

/// Merge expectation headers over the server defaults.
///
/// Names are compared in canonical form, so `x-id` and `X-ID` are the same
/// header. The expectation's value wins.
pub fn merge_headers(
    headers: &BTreeMap<String, String>,
    defaults: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    defaults
        .iter()
        .chain(headers.iter())
        .map(|(name, value)| (canonical_header_key(name), value.clone()))
        .collect()
}
