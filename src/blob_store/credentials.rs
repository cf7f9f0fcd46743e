//! Random ids and tokens, and their comparison

use subtle::ConstantTimeEq;

/// Bytes of randomness in every id and token (128 bits)
pub const CREDENTIAL_BYTES: usize = 16;

/// 16 bytes from the thread-local CSPRNG, hex encoded (32 chars)
pub fn random_hex() -> String {
    let bytes: [u8; CREDENTIAL_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Compare two tokens without short-circuiting on the first differing byte
pub fn tokens_match(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_hex_shape() {
        let value = random_hex();
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_hex_is_unique() {
        let values: HashSet<String> = (0..1000).map(|_| random_hex()).collect();
        assert_eq!(values.len(), 1000);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc124", "abc123"));
        assert!(!tokens_match("abc", "abc123"));
        assert!(!tokens_match("", "abc123"));
    }
}
