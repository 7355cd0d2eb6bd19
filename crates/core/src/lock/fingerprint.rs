//! Order-independent digest of a run's parameters.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// Deterministic identity of one logical job definition.
///
/// Two invocations whose arguments and options are permutations of each
/// other produce the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationFingerprint(String);

impl InvocationFingerprint {
    /// Computes the fingerprint of a set of `(name, value)` pairs.
    ///
    /// Pairs are grouped by name and sorted (names and, for repeated names,
    /// values) before being serialized and hashed with SHA-256.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut canonical: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            canonical.entry(name.into()).or_default().push(value.into());
        }
        for values in canonical.values_mut() {
            values.sort();
        }

        // BTreeMap<String, Vec<String>> always serializes
        let serialized = serde_json::to_string(&canonical).unwrap_or_default();
        Self(format!("{:x}", Sha256::digest(serialized.as_bytes())))
    }

    /// Lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the lock resource guarding this fingerprint.
    pub fn lock_file_name(&self) -> String {
        format!("locomotive-{}.lock", self.0)
    }
}

impl fmt::Display for InvocationFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
