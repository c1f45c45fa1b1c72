//! Shared type definitions

use std::collections::BTreeSet;

/// Tenant identifier, assigned by the (external) tenant administration
pub type TenantId = u64;

/// Member identifier within a tenant
pub type MemberId = u64;

/// Cardinality of the intersection between two number sets.
///
/// Symmetric and independent of ordering; duplicates count once.
pub fn match_count(a: &[u8], b: &[u8]) -> usize {
    let left: BTreeSet<u8> = a.iter().copied().collect();
    b.iter()
        .copied()
        .collect::<BTreeSet<u8>>()
        .intersection(&left)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_count_basic() {
        assert_eq!(match_count(&[1, 2, 3, 4, 5], &[3, 4, 5, 6, 7]), 3);
        assert_eq!(match_count(&[1, 2, 3], &[4, 5, 6]), 0);
        assert_eq!(match_count(&[], &[1, 2]), 0);
    }

    #[test]
    fn test_match_count_is_symmetric() {
        let sets: [&[u8]; 5] = [
            &[1, 2, 3, 4, 5, 6],
            &[6, 5, 4],
            &[10, 20, 30, 40],
            &[2, 4, 6, 8, 10, 12, 14],
            &[],
        ];
        for a in sets.iter() {
            for b in sets.iter() {
                assert_eq!(match_count(a, b), match_count(b, a));
            }
        }
    }

    #[test]
    fn test_match_count_ignores_order_and_duplicates() {
        assert_eq!(match_count(&[5, 1, 3], &[3, 5, 1]), 3);
        assert_eq!(match_count(&[7, 7, 7], &[7]), 1);
    }
}
