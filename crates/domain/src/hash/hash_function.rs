use md5::{Digest, Md5};

/// Maps a string onto the hash ring.
///
/// The MD5 digest is read as an unsigned big-endian 128-bit integer and
/// converted to `f64` with round-to-nearest-even, so every router in a fleet
/// places the same key on the same point.
pub struct Md5HashFunction;

impl Md5HashFunction {
    pub fn hash(value: &str) -> f64 {
        let digest = Md5::digest(value.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest);
        u128::from_be_bytes(bytes) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        assert_eq!(Md5HashFunction::hash(""), 2.8194976848941264e38);
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(Md5HashFunction::hash("some-string"), 1.6828118558073791e38);
        assert_eq!(Md5HashFunction::hash("cache-01--0"), 2.9910622959496387e38);
        assert_eq!(Md5HashFunction::hash("edge-cache-1--42"), 9.200861846262282e37);
    }

    #[test]
    fn test_always_non_negative() {
        for i in 0..1000 {
            assert!(Md5HashFunction::hash(&format!("key-{i}")) >= 0.0);
        }
    }
}
