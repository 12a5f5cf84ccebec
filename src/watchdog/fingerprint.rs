//! Stable watchdog identities derived from alert label sets

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Compute the identity of a label set.
///
/// Pairs are canonicalized by key before hashing, so encounter order never
/// matters. If a key appears more than once the last value wins. Each key and
/// value is length-prefixed so that no two distinct label sets share an
/// encoding. Returns 64 lowercase hex characters.
pub fn identify<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let canonical: BTreeMap<&str, &str> = labels.into_iter().collect();

    let mut hasher = Sha256::new();
    for (key, value) in canonical {
        write_field(&mut hasher, key);
        write_field(&mut hasher, value);
    }

    hex::encode(hasher.finalize())
}

/// Identity of an alert's label map
pub fn identify_labels(labels: &BTreeMap<String, String>) -> String {
    identify(labels.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn write_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field.as_bytes());
}
