//! Random object contents.

use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Creates a payload of `len` random bytes.
///
/// The contents are random so that neither the transport nor the storage can compress or
/// deduplicate them. They are not reproducible.
pub fn random(len: u64) -> Bytes {
    let mut rng = SmallRng::seed_from_u64(rand::random());
    let mut buf = vec![0; len as usize];
    rng.fill_bytes(&mut buf);
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_requested_length() {
        assert_eq!(random(0).len(), 0);
        assert_eq!(random(1).len(), 1);
        assert_eq!(random(4096).len(), 4096);
    }

    #[test]
    fn is_not_constant() {
        let payload = random(4096);
        assert!(payload.iter().any(|b| *b != payload[0]));
    }
}
