//! Identity hashing.
//!
//! A node instance's cache identity is the SHA-256 of its type name plus the
//! canonical serialization of every identity-relevant attribute value, in
//! declared attribute order. Pure computation: no filesystem, no clock, no
//! ambient state — the same inputs hash identically on any machine.

use sha2::{Digest, Sha256};

use crate::attribute::{AttrDesc, AttrValue};
use crate::identifiers::TypeName;

// Domain separators between hashed fields; without them "ab"+"c" and
// "a"+"bc" would collide.
const FIELD: &[u8] = &[0x1f];
const RECORD: &[u8] = &[0x1e];

/// Derives the identity hash at `level` for a node of `type_name` whose
/// attributes are `attrs` (descriptor + current value, declared order).
///
/// Only attributes whose descriptor lists `level` contribute; all of them
/// contribute — there is no partial hashing. The type name is folded in
/// first so two types sharing attribute values cannot share an identity.
pub fn derive_uid<'a>(
    type_name: &TypeName,
    attrs: impl IntoIterator<Item = (&'a AttrDesc, &'a AttrValue)>,
    level: u8,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(type_name.as_str().as_bytes());
    hasher.update(RECORD);
    for (desc, value) in attrs {
        if !desc.uid_levels().contains(&level) {
            continue;
        }
        hasher.update(desc.name().as_bytes());
        hasher.update(FIELD);
        let mut canonical = String::new();
        desc.canonical(value, &mut canonical);
        hasher.update(canonical.as_bytes());
        hasher.update(RECORD);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrKind;

    fn text_attr(name: &str, levels: impl IntoIterator<Item = u8>) -> AttrDesc {
        AttrDesc::new(name, AttrKind::Text, AttrValue::String(String::new()), levels).unwrap()
    }

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    #[test]
    fn irrelevant_attributes_never_change_the_hash() {
        let a = text_attr("a", [0]);
        let b = text_attr("b", []);
        let v1 = AttrValue::String("same".into());
        let v2a = AttrValue::String("x".into());
        let v2b = AttrValue::String("y".into());

        let h1 = derive_uid(&name("T"), [(&a, &v1), (&b, &v2a)], 0);
        let h2 = derive_uid(&name("T"), [(&a, &v1), (&b, &v2b)], 0);
        assert_eq!(h1, h2);
    }

    #[test]
    fn relevant_attributes_always_contribute() {
        let a = text_attr("a", [0]);
        let h1 = derive_uid(&name("T"), [(&a, &AttrValue::String("x".into()))], 0);
        let h2 = derive_uid(&name("T"), [(&a, &AttrValue::String("y".into()))], 0);
        assert_ne!(h1, h2);
    }

    #[test]
    fn type_name_prefixes_the_identity() {
        let a = text_attr("a", [0]);
        let v = AttrValue::String("x".into());
        let h1 = derive_uid(&name("T1"), [(&a, &v)], 0);
        let h2 = derive_uid(&name("T2"), [(&a, &v)], 0);
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_is_stable_and_hex_rendered() {
        let a = text_attr("input", [0]);
        let v = AttrValue::String("/data/set".into());
        let h1 = derive_uid(&name("Match"), [(&a, &v)], 0);
        let h2 = derive_uid(&name("Match"), [(&a, &v)], 0);
        assert_eq!(h1, h2);
        // Pinned digest: any change here invalidates every existing cache
        // folder, so it must only ever change deliberately.
        assert_eq!(
            h1,
            "6f98681f1a91acae82a715b7de99c27c9f011dee1daaace97aa59613a25df69f"
        );
    }

    #[test]
    fn levels_select_independent_attribute_sets() {
        let a = text_attr("a", [0]);
        let b = text_attr("b", [1]);
        let va = AttrValue::String("va".into());
        let vb1 = AttrValue::String("vb1".into());
        let vb2 = AttrValue::String("vb2".into());

        // Level 0 ignores b entirely.
        let h0_1 = derive_uid(&name("T"), [(&a, &va), (&b, &vb1)], 0);
        let h0_2 = derive_uid(&name("T"), [(&a, &va), (&b, &vb2)], 0);
        assert_eq!(h0_1, h0_2);

        // Level 1 tracks b.
        let h1_1 = derive_uid(&name("T"), [(&a, &va), (&b, &vb1)], 1);
        let h1_2 = derive_uid(&name("T"), [(&a, &va), (&b, &vb2)], 1);
        assert_ne!(h1_1, h1_2);
    }
}
