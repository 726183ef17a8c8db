//! Cheap content fingerprints.
//!
//! The digest is the classic `h * 31 + unit` string hash folded over the
//! UTF-16 code units of the serialized JSON, with 32-bit two's-complement
//! wrapping at every step. Browser peers compute the same value, so a client
//! receiving its own write back recognises it. Not collision resistant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Node;

/// 32-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(i32);

impl Fingerprint {
    /// Fingerprint of the empty string; also the "nothing seen yet" value.
    pub const EMPTY: Fingerprint = Fingerprint(0);

    pub const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fold `s` into a fingerprint.
pub fn fingerprint_str(s: &str) -> Fingerprint {
    let hash = s.encode_utf16().fold(0i32, |acc, unit| {
        (acc << 5).wrapping_sub(acc).wrapping_add(i32::from(unit))
    });
    Fingerprint(hash)
}

/// Fingerprint any serializable value via its compact JSON form.
pub fn fingerprint_json<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint, serde_json::Error> {
    serde_json::to_string(value).map(|json| fingerprint_str(&json))
}

/// Fingerprint a content tree.
pub fn hash_content(node: &Node) -> Fingerprint {
    fingerprint_str(&node.to_json_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_PLACEHOLDER_TEXT;

    #[test]
    fn test_known_values() {
        assert_eq!(fingerprint_str(""), Fingerprint::EMPTY);
        assert_eq!(fingerprint_str("hello").value(), 99162322);
        assert_eq!(fingerprint_json("hello").unwrap().value(), -1110581198);
    }

    #[test]
    fn test_wraps_to_negative() {
        assert_eq!(fingerprint_str("polygenelubricants").value(), i32::MIN);

        let long = "the quick brown fox ".repeat(64);
        let corpus: Vec<i32> = (0..32)
            .map(|i| fingerprint_str(&long[..long.len() - i]).value())
            .collect();
        assert!(corpus.iter().any(|h| *h < 0));
    }

    #[test]
    fn test_hashes_utf16_units() {
        assert_eq!(fingerprint_str("é").value(), 233);
        // surrogate pair: 0xD83D * 31 + 0xDE00
        assert_eq!(fingerprint_str("😀").value(), 1772899);
    }

    #[test]
    fn test_placeholder_fingerprint() {
        let doc = Node::placeholder(DEFAULT_PLACEHOLDER_TEXT);
        assert_eq!(hash_content(&doc).value(), 928725122);
        assert_eq!(hash_content(&doc), fingerprint_json(&doc).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let a = Node::doc(vec![Node::paragraph(vec![Node::text("one")])]);
        let b = a.clone();
        assert_eq!(hash_content(&a), hash_content(&b));
        assert_eq!(hash_content(&a), hash_content(&a));
    }

    #[test]
    fn test_distinct_trees_differ() {
        let a = Node::placeholder("hello");
        let b = Node::placeholder("world");
        let c = Node::doc(vec![Node::paragraph(vec![Node::text("hello")]).with_attr("textAlign", "left")]);
        assert_ne!(hash_content(&a), hash_content(&b));
        assert_ne!(hash_content(&a), hash_content(&c));
    }

    #[test]
    fn test_known_collision() {
        // "Aa" and "BB" share a hash, so swapping one for the other anywhere
        // in the serialized form leaves the fingerprint unchanged.
        assert_eq!(fingerprint_str("Aa"), fingerprint_str("BB"));
        assert_eq!(
            hash_content(&Node::placeholder("Aa")),
            hash_content(&Node::placeholder("BB"))
        );
    }
}
