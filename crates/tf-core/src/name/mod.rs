//! Canonical task names — strip worker-assigned uniqueness suffixes.

/// Canonical form of a raw reference name.
///
/// Workers append a `__<token>` suffix to keep reference names unique
/// within a run; the logical identity is everything before the first
/// `"__"`. Total and idempotent.
pub fn canonical_name(raw: &str) -> &str {
    match raw.find("__") {
        Some(index) => &raw[..index],
        None => raw,
    }
}
