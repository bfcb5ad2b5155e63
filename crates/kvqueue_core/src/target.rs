//! Operation targets and their cache signatures.

use crate::error::{AsyncError, AsyncResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Hash pair identifying an (open configuration, resource name) pair.
///
/// Workers key their cursor caches by signature, so two targets with the
/// same resource and equivalent configuration share one cached cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    cfg_hash: u64,
    uri_hash: u64,
}

impl Signature {
    /// Computes the signature of a resource name and configuration string.
    ///
    /// The configuration is normalized first: entries are trimmed and empty
    /// entries dropped.
    #[must_use]
    pub fn compute(uri: &str, config: &str) -> Self {
        Self {
            cfg_hash: hash64(normalize_config(config).as_bytes()),
            uri_hash: hash64(uri.as_bytes()),
        }
    }

    /// Returns the configuration hash.
    #[must_use]
    pub const fn cfg_hash(&self) -> u64 {
        self.cfg_hash
    }

    /// Returns the resource name hash.
    #[must_use]
    pub const fn uri_hash(&self) -> u64 {
        self.uri_hash
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}/{:016x}", self.cfg_hash, self.uri_hash)
    }
}

/// The resource an operation runs against.
///
/// Cheap to clone; all clones share one allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct OpTarget {
    inner: Arc<TargetInner>,
}

#[derive(PartialEq, Eq)]
struct TargetInner {
    uri: String,
    config: String,
    signature: Signature,
}

impl OpTarget {
    /// Creates a target for the named resource opened with `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `uri` is empty.
    pub fn new(uri: &str, config: &str) -> AsyncResult<Self> {
        if uri.trim().is_empty() {
            return Err(AsyncError::invalid_argument("resource name must not be empty"));
        }
        let config = normalize_config(config);
        let signature = Signature::compute(uri, &config);
        Ok(Self {
            inner: Arc::new(TargetInner {
                uri: uri.to_string(),
                config,
                signature,
            }),
        })
    }

    /// Returns the resource name.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// Returns the normalized configuration string.
    #[must_use]
    pub fn config(&self) -> &str {
        &self.inner.config
    }

    /// Returns the cache signature.
    #[must_use]
    pub fn signature(&self) -> Signature {
        self.inner.signature
    }
}

impl fmt::Debug for OpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpTarget")
            .field("uri", &self.inner.uri)
            .field("config", &self.inner.config)
            .field("signature", &format_args!("{}", self.inner.signature))
            .finish()
    }
}

/// Trims every comma-separated entry and drops empty ones.
pub(crate) fn normalize_config(config: &str) -> String {
    config
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn hash64(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_signature() {
        assert_eq!(Signature::compute("t", ""), Signature::compute("t", ""));
    }

    #[test]
    fn config_spelling_does_not_matter() {
        assert_eq!(
            Signature::compute("t", "overwrite=false, raw"),
            Signature::compute("t", " overwrite=false,raw,")
        );
    }

    #[test]
    fn uri_and_config_both_distinguish() {
        let base = Signature::compute("t", "");
        assert_ne!(base, Signature::compute("u", ""));
        assert_ne!(base, Signature::compute("t", "overwrite=false"));
        assert_eq!(base.cfg_hash(), Signature::compute("u", "").cfg_hash());
    }

    #[test]
    fn empty_uri_rejected() {
        assert!(matches!(
            OpTarget::new("  ", ""),
            Err(AsyncError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn target_keeps_normalized_config() {
        let target = OpTarget::new("t", " a=1 ,, b=2 ").unwrap();
        assert_eq!(target.uri(), "t");
        assert_eq!(target.config(), "a=1,b=2");
        assert_eq!(target.signature(), Signature::compute("t", "a=1,b=2"));
    }
}
