use std::cmp::Ordering;

/// Order two release versions.
///
/// Plain byte-wise string comparison: "9.0.0" sorts above "10.0.0". Catalog
/// sorting, update detection and the launcher self-update check all go
/// through this function so they can never disagree with each other.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}
