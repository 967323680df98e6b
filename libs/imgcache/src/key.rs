//! Cache key derivation.
//!
//! A key is the hex encoded MD5 digest of the URL exactly as received. No
//! normalization happens, so two spellings of the same resource are two
//! distinct entries.

use std::fmt;
use std::path::PathBuf;

use md5::{Digest, Md5};

use crate::store::CacheError;

/// Keys must be longer than this to split into shard segments.
const MIN_KEY_LEN: usize = 4;

/// Digest of a URL, 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative shard path of this key, see [`path_for`].
    pub fn shard_path(&self) -> Result<PathBuf, CacheError> {
        path_for(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the cache key for a URL.
pub fn key_for(url: &str) -> CacheKey {
    CacheKey(hex::encode(Md5::digest(url.as_bytes())))
}

/// Map a key to its relative location in the shard tree.
///
/// `c29b7f54b2df7773722d382f4809d650` becomes `c/29/7f54b2df7773722d382f4809d650`:
/// one character, then two, then everything after the fourth. The character
/// at index 3 is not part of the path.
pub fn path_for(key: &str) -> Result<PathBuf, CacheError> {
    if key.len() <= MIN_KEY_LEN {
        return Err(CacheError::KeyTooShort {
            key: key.to_string(),
        });
    }
    // byte offsets below are only char boundaries for ASCII keys
    if !key.is_ascii() {
        return Err(CacheError::InvalidKey {
            key: key.to_string(),
        });
    }

    Ok(PathBuf::from(&key[0..1]).join(&key[1..3]).join(&key[4..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_key_for_known_digest() {
        // md5("any")
        assert_eq!(key_for("any").as_str(), "100b8cad7cf2a56f6df78f171f97a1ec");
    }

    #[test]
    fn test_key_for_is_raw_string() {
        assert_ne!(key_for("?url=foo"), key_for("?url=foo%20"));
        assert_ne!(key_for("http://a/b"), key_for("http://a/b/"));
    }

    #[test]
    fn test_path_for_digest() {
        let path = path_for("c29b7f54b2df7773722d382f4809d650").unwrap();
        assert_eq!(path, PathBuf::from("c/29/7f54b2df7773722d382f4809d650"));
    }

    #[rstest]
    #[case("")]
    #[case("a")]
    #[case("abc")]
    #[case("abcd")]
    fn test_path_for_short_key(#[case] key: &str) {
        let err = path_for(key).unwrap_err();
        assert!(matches!(err, CacheError::KeyTooShort { .. }));
    }

    #[rstest]
    #[case("abcde", "a/bc/e")]
    #[case("0123456789", "0/12/456789")]
    fn test_path_for_minimal_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(path_for(key).unwrap(), PathBuf::from(expected));
    }

    #[test]
    fn test_path_for_non_ascii() {
        let err = path_for("aébcdef").unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey { .. }));
    }

    #[test]
    fn test_shard_path_matches_path_for() {
        let key = key_for("https://example.com/cat.jpg");
        assert_eq!(key.shard_path().unwrap(), path_for(key.as_str()).unwrap());
    }

    proptest! {
        #[test]
        fn prop_path_for_splits_key(key in "[0-9a-f]{5,64}") {
            let path = path_for(&key).unwrap();
            let expected = format!("{}/{}/{}", &key[0..1], &key[1..3], &key[4..]);
            prop_assert_eq!(path, PathBuf::from(expected));
        }

        #[test]
        fn prop_path_for_rejects_short(key in "[0-9a-f]{0,4}") {
            let is_too_short = matches!(path_for(&key), Err(CacheError::KeyTooShort { .. }));
            prop_assert!(is_too_short);
        }

        #[test]
        fn prop_key_for_deterministic(url in ".*") {
            let key = key_for(&url);
            prop_assert_eq!(key.as_str().len(), 32);
            prop_assert_eq!(&key, &key_for(&url));
        }
    }
}
