// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dimensionality normalization.
//!
//! Padding a shape up to a minimum rank only prepends size-1 axes, so element
//! order and count never change. Datasets are stored as flat C-order chunks,
//! which makes this a layout-only operation: no element is touched.

use crate::core::{Result, TranslateError};

/// Validate a requested minimum rank.
pub fn check_rank(minimum_rank: i64) -> Result<usize> {
    usize::try_from(minimum_rank).map_err(|_| TranslateError::InvalidRank {
        requested: minimum_rank,
    })
}

/// Prepend singleton axes until `shape` has at least `minimum_rank` axes.
///
/// ```
/// use treetrans::shape::normalize;
///
/// assert_eq!(normalize(&[], 2).unwrap(), vec![1, 1]);
/// assert_eq!(normalize(&[3, 4], 1).unwrap(), vec![3, 4]);
/// assert!(normalize(&[3], -1).is_err());
/// ```
pub fn normalize(shape: &[usize], minimum_rank: i64) -> Result<Vec<usize>> {
    let rank = check_rank(minimum_rank)?;
    if shape.len() >= rank {
        return Ok(shape.to_vec());
    }
    let mut padded = vec![1; rank - shape.len()];
    padded.extend_from_slice(shape);
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::element_count;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_to_matrix() {
        assert_eq!(normalize(&[], 2).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_prepends_leading_axes() {
        assert_eq!(normalize(&[5], 3).unwrap(), vec![1, 1, 5]);
    }

    #[test]
    fn test_zero_rank_is_noop() {
        assert_eq!(normalize(&[2, 2], 0).unwrap(), vec![2, 2]);
        assert_eq!(normalize(&[], 0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_negative_rank() {
        let err = normalize(&[2], -3).unwrap_err();
        assert_eq!(err, TranslateError::InvalidRank { requested: -3 });
    }

    proptest! {
        #[test]
        fn prop_noop_when_rank_satisfied(
            shape in prop::collection::vec(0usize..6, 0..5),
            slack in 0usize..5,
        ) {
            let minimum = shape.len().saturating_sub(slack) as i64;
            prop_assert_eq!(normalize(&shape, minimum).unwrap(), shape);
        }

        #[test]
        fn prop_pads_to_rank_and_keeps_count(
            shape in prop::collection::vec(0usize..6, 0..5),
            extra in 1usize..4,
        ) {
            let minimum = shape.len() + extra;
            let padded = normalize(&shape, minimum as i64).unwrap();
            prop_assert_eq!(padded.len(), minimum);
            prop_assert_eq!(element_count(&padded), element_count(&shape));
            prop_assert_eq!(&padded[extra..], &shape[..]);
        }
    }
}
