//! Attribute validators
//!
//! Every validator runs before any network call.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Minimum length of a bucket name
pub const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum length of a bucket name
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Validate a DNS-compliant S3 bucket name.
pub fn validate_s3_bucket_name(value: &str) -> Result<()> {
    let invalid = |reason: String| Err(Error::Validation(reason));

    if value.len() < MIN_BUCKET_NAME_LEN || value.len() > MAX_BUCKET_NAME_LEN {
        return invalid(format!(
            "{value:?} must contain from {MIN_BUCKET_NAME_LEN} to {MAX_BUCKET_NAME_LEN} characters"
        ));
    }

    if !value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return invalid(format!(
            "only lowercase alphanumeric characters and hyphens allowed in {value:?}"
        ));
    }

    if is_ip_shaped(value) {
        return invalid(format!("{value:?} must not be formatted as an IP address"));
    }

    if value.starts_with('.') {
        return invalid(format!("{value:?} cannot start with a period"));
    }

    if value.ends_with('.') {
        return invalid(format!("{value:?} cannot end with a period"));
    }

    if value.contains("..") {
        return invalid(format!("{value:?} can be only one period between labels"));
    }

    Ok(())
}

/// Four dot-separated groups of one to three digits. Out-of-range octets
/// such as `999.1.1.1` still count as IP-shaped.
fn is_ip_shaped(value: &str) -> bool {
    let groups: Vec<&str> = value.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Length of `value` (in characters) must lie within `min..=max`.
pub fn string_len_between(name: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::Validation(format!(
            "expected length of {name} to be in the range ({min} - {max}), got {value}"
        )));
    }
    Ok(())
}

/// `value` must be one of `allowed` (case-sensitive).
pub fn string_in_slice(name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "expected {name} to be one of {allowed:?}, got {value}"
    )))
}

/// `value` must not be the zero value of its type.
pub fn no_zero_value(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Object metadata keys must be lowercase.
pub fn validate_metadata_is_lowercase(metadata: &BTreeMap<String, String>) -> Result<()> {
    let offending: Vec<String> = metadata
        .keys()
        .filter(|k| **k != k.to_lowercase())
        .map(|k| format!("metadata must be lowercase only. Offending key: {k:?}"))
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(offending.join("; ")))
    }
}
