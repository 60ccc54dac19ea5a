//! Utility functions for getting hashes
use std::hash::{DefaultHasher, Hash, Hasher};

pub(crate) fn calculate_hash<T: Hash>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Hash a value and format the result as a hexadecimal string, used to
/// generate collision free variable ids for reverse reaction directions
pub(crate) fn hash_as_hex_string<T: Hash>(t: &T) -> String {
    format!("{:x}", calculate_hash(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_stable() {
        assert_eq!(
            hash_as_hex_string(&"PGI".to_string()),
            hash_as_hex_string(&"PGI".to_string())
        );
        assert_ne!(
            hash_as_hex_string(&"PGI".to_string()),
            hash_as_hex_string(&"PFK".to_string())
        );
    }
}
