//! Unique name generation for buckets created without an explicit name

use std::sync::atomic::{AtomicU32, Ordering};

/// Prefix used when neither `bucket` nor `bucket_prefix` is set
pub const UNIQUE_ID_PREFIX: &str = "terraform-";

/// Length of the generated suffix: 18 timestamp digits + 8 hex counter digits
pub const UNIQUE_ID_SUFFIX_LENGTH: usize = 26;

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A unique id with the default prefix
pub fn unique_id() -> String {
    prefixed_unique_id(UNIQUE_ID_PREFIX)
}

/// `prefix` followed by a UTC timestamp down to 1/10000 s and a
/// process-wide counter, so ids sort by creation order
pub fn prefixed_unique_id(prefix: &str) -> String {
    let now = jiff::Timestamp::now();
    let counter = ID_COUNTER.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
    let fraction = now.subsec_nanosecond() / 100_000;

    format!(
        "{prefix}{}{fraction:04}{counter:08x}",
        now.strftime("%Y%m%d%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_shape() {
        let id = unique_id();
        assert!(id.starts_with(UNIQUE_ID_PREFIX));
        let suffix = &id[UNIQUE_ID_PREFIX.len()..];
        assert_eq!(suffix.len(), UNIQUE_ID_SUFFIX_LENGTH);
        assert!(suffix[..18].bytes().all(|b| b.is_ascii_digit()));
        assert!(suffix[18..].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_prefixed_unique_ids_differ() {
        let a = prefixed_unique_id("logs-");
        let b = prefixed_unique_id("logs-");
        assert!(a.starts_with("logs-"));
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_generated_name_is_valid_bucket_name() {
        let name = prefixed_unique_id("tf-test-");
        assert!(crate::validation::validate_s3_bucket_name(&name).is_ok());
    }
}
