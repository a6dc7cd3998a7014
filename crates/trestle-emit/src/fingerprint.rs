//! Emission fingerprinting.
//!
//! A single SHA-256 digest over the raw input documents ties every emitted
//! artifact back to the exact `(model, profile, options)` that produced it.

use sha2::{Digest, Sha256};

/// Algorithm name recorded in headers and the manifest.
pub const FINGERPRINT_ALGORITHM: &str = "SHA-256";

/// Separator byte written between input parts.
const SEP: u8 = 0;

/// Computes the hex fingerprint over the given input parts, in order.
pub fn fingerprint(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([SEP]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_inputs_hash_identically() {
        let a = fingerprint(&[b"model", b"profile"]);
        let b = fingerprint(&[b"model", b"profile"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn part_boundaries_matter() {
        // "ab" + "c" must differ from "a" + "bc".
        assert_ne!(fingerprint(&[b"ab", b"c"]), fingerprint(&[b"a", b"bc"]));
    }
}
