//! Duplicate detection over the combined identity set
//!
//! Two identities are flagged as possible duplicates of the same real-world
//! vendor by, in order of authority:
//!
//! 1. VAT numbers: when both sides carry one, equality (after trim +
//!    lowercase) decides alone. Differing VATs veto the pair no matter how
//!    similar the names are.
//! 2. Name containment: one normalized name is a substring of the other.
//! 3. Bigram similarity: Dice coefficient over consecutive character pairs
//!    above 0.80.
//!
//! Detection only ranks and highlights; it never mutates anything, and
//! re-running it on an unchanged identity set yields the same flags.

use std::collections::{BTreeSet, HashMap};

use crate::resolve::identity::{IdentityKey, SupplierIdentity};

/// Similarity score above which two names are considered duplicates
pub const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Why a pair of identities was flagged
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DuplicateReason {
    /// Both carry the same normalized VAT number
    VatEqual,
    /// One normalized name contains the other
    NameContains,
    /// Bigram similarity of the normalized names, above the threshold
    NameSimilar(f64),
}

impl std::fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateReason::VatEqual => write!(f, "same VAT number"),
            DuplicateReason::NameContains => write!(f, "name contained in the other"),
            DuplicateReason::NameSimilar(score) => write!(f, "names {:.0}% similar", score * 100.0),
        }
    }
}

/// An unordered pair of identities flagged as possible duplicates
#[derive(Debug, Clone)]
pub struct DuplicatePair {
    pub left: IdentityKey,
    pub right: IdentityKey,
    pub reason: DuplicateReason,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Consecutive character pairs of a string, repeats included
fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Dice coefficient over the bigram multisets of the two normalized names
///
/// Overlap is a true multiset intersection: each matched bigram on one side
/// consumes one occurrence on the other, so repeated pairs cannot inflate
/// the score. Symmetric, and 1.0 for identical non-empty inputs.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    let ab = bigrams(&a);
    let bb = bigrams(&b);
    let total = ab.len() + bb.len();
    if total == 0 {
        // Zero or one character per side: no bigrams to compare
        return if a == b && !a.is_empty() { 1.0 } else { 0.0 };
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::new();
    for bg in &bb {
        *counts.entry(*bg).or_insert(0) += 1;
    }

    let mut overlap = 0usize;
    for bg in &ab {
        if let Some(count) = counts.get_mut(bg) {
            if *count > 0 {
                *count -= 1;
                overlap += 1;
            }
        }
    }

    2.0 * overlap as f64 / total as f64
}

fn compare(a: &SupplierIdentity, b: &SupplierIdentity) -> Option<DuplicateReason> {
    let vat_a = a.vat().map(normalize).filter(|v| !v.is_empty());
    let vat_b = b.vat().map(normalize).filter(|v| !v.is_empty());

    // VAT is authoritative when both sides have one
    if let (Some(va), Some(vb)) = (&vat_a, &vat_b) {
        return (va == vb).then_some(DuplicateReason::VatEqual);
    }

    let name_a = normalize(a.name());
    let name_b = normalize(b.name());
    if name_a.is_empty() || name_b.is_empty() {
        return None;
    }

    if name_a.contains(&name_b) || name_b.contains(&name_a) {
        return Some(DuplicateReason::NameContains);
    }

    let score = bigram_similarity(&name_a, &name_b);
    (score > SIMILARITY_THRESHOLD).then_some(DuplicateReason::NameSimilar(score))
}

/// Every unordered pair of identities flagged as possible duplicates, with
/// the rule that matched them
pub fn duplicate_pairs(identities: &[SupplierIdentity]) -> Vec<DuplicatePair> {
    let mut pairs = Vec::new();
    for (i, a) in identities.iter().enumerate() {
        for b in &identities[i + 1..] {
            if let Some(reason) = compare(a, b) {
                pairs.push(DuplicatePair {
                    left: a.key(),
                    right: b.key(),
                    reason,
                });
            }
        }
    }
    pairs
}

/// The set of identity keys involved in at least one duplicate pair
pub fn detect_duplicates(identities: &[SupplierIdentity]) -> BTreeSet<IdentityKey> {
    let mut flagged = BTreeSet::new();
    for pair in duplicate_pairs(identities) {
        flagged.insert(pair.left);
        flagged.insert(pair.right);
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Supplier;
    use crate::resolve::identity::InferredSupplier;

    fn persisted(name: &str, vat: Option<&str>) -> SupplierIdentity {
        let mut s = Supplier::new(name.to_string(), "x@y.be".to_string(), "test".to_string());
        s.vat = vat.map(str::to_string);
        SupplierIdentity::Persisted(s)
    }

    fn inferred(name: &str) -> SupplierIdentity {
        SupplierIdentity::Inferred(InferredSupplier {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_equal_vat_flags_regardless_of_name() {
        let a = persisted("Verfgroothandel BV", Some("BE0123456789"));
        let b = persisted("Verfgroothandel", Some("BE0123456789"));
        let c = persisted("Totally Different Name", Some("be0123456789 "));

        let flagged = detect_duplicates(&[a.clone(), b.clone(), c.clone()]);
        assert!(flagged.contains(&a.key()));
        assert!(flagged.contains(&b.key()));
        // VAT comparison normalizes case and whitespace
        assert!(flagged.contains(&c.key()));
    }

    #[test]
    fn test_differing_vats_veto_similar_names() {
        let a = persisted("ABC Verf", Some("NL111111111B01"));
        let b = persisted("ABC Verf Groep", Some("NL222222222B01"));

        assert!(detect_duplicates(&[a, b]).is_empty());
    }

    #[test]
    fn test_substring_rule_flags_trim_case_variants() {
        let a = persisted("Jansen Schilderwerken", None);
        let b = inferred("Jansen schilderwerken ");

        let pairs = duplicate_pairs(&[a, b]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].reason, DuplicateReason::NameContains);
    }

    #[test]
    fn test_vat_on_one_side_falls_back_to_names() {
        let a = persisted("Verfwinkel Centraal", Some("BE0123456789"));
        let b = inferred("verfwinkel centraal");

        assert_eq!(duplicate_pairs(&[a, b]).len(), 1);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let cases = [
            ("Verfgroothandel", "Verfgroothandel BV"),
            ("Jansen", "Janssen"),
            ("aabbaa", "aabb"),
            ("", "x"),
        ];
        for (a, b) in cases {
            assert_eq!(bigram_similarity(a, b), bigram_similarity(b, a));
        }
    }

    #[test]
    fn test_similarity_identical_and_disjoint() {
        assert_eq!(bigram_similarity("Verf", "verf"), 1.0);
        assert_eq!(bigram_similarity("abcd", "wxyz"), 0.0);
        // single-char names have no bigrams
        assert_eq!(bigram_similarity("a", "b"), 0.0);
        assert_eq!(bigram_similarity("a", "a"), 1.0);
    }

    #[test]
    fn test_repeated_bigrams_do_not_inflate_score() {
        // "aaaa" has bigrams [aa, aa, aa]; "aa" has [aa]. A bag
        // intersection matches one occurrence, not all three.
        let sim = bigram_similarity("aaaa", "aa");
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_high_similarity_flags_without_substring() {
        // One-letter difference in a long name: similar but not a substring
        let a = persisted("Schildersbedrijf Janssen", None);
        let b = inferred("Schildersbedrijf Jansen");

        let pairs = duplicate_pairs(&[a, b]);
        assert_eq!(pairs.len(), 1);
        assert!(matches!(pairs[0].reason, DuplicateReason::NameSimilar(s) if s > 0.80));
    }

    #[test]
    fn test_unrelated_names_not_flagged() {
        let a = persisted("Verfgroothandel BV", None);
        let b = inferred("Steigerverhuur Smit");

        assert!(detect_duplicates(&[a, b]).is_empty());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let identities = vec![
            persisted("Verfgroothandel BV", Some("BE0123456789")),
            persisted("Verfgroothandel", Some("BE0123456789")),
            inferred("Jansen schilderwerken "),
            persisted("Jansen Schilderwerken", None),
        ];

        let first = detect_duplicates(&identities);
        let second = detect_duplicates(&identities);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }
}
