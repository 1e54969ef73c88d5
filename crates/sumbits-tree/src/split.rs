//! Width splitting policy
//!
//! A node of `width` input bits hands its most-significant `width - width/2`
//! bits to the upper branch and its least-significant `width/2` bits to the
//! lower branch. On odd widths the upper branch absorbs the extra bit, and
//! the lower slice is zero-extended on the left so that both branches are
//! built over `width - width/2` bits.

use crate::error::{TreeError, TreeResult};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Sub-widths of a split node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Split {
    /// Width of the most-significant slice
    pub upper: usize,
    /// Width of the least-significant slice
    pub lower: usize,
}

impl Split {
    /// Total width covered by both slices
    pub fn width(&self) -> usize {
        self.upper + self.lower
    }

    /// Width both branches are built over
    pub fn branch_width(&self) -> usize {
        self.upper
    }

    /// Constant-zero bits added above the lower slice
    pub fn padding(&self) -> usize {
        self.upper - self.lower
    }

    /// Slice `bits` into `(upper, lower)` branch inputs.
    ///
    /// The upper slice borrows the most-significant bits. The lower slice
    /// holds the least-significant bits, zero-extended to `branch_width()`;
    /// it only allocates when the split is odd.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is not exactly `self.width()` bits long.
    pub fn slice<'a, T, O>(
        &self,
        bits: &'a BitSlice<T, O>,
    ) -> (&'a BitSlice<T, O>, Cow<'a, BitSlice<T, O>>)
    where
        T: BitStore,
        O: BitOrder,
    {
        assert_eq!(
            bits.len(),
            self.width(),
            "slice of {} bits does not match split {:?}",
            bits.len(),
            self
        );
        let (lower, upper) = bits.split_at(self.lower);
        if self.padding() == 0 {
            return (upper, Cow::Borrowed(lower));
        }
        let mut extended = BitVec::from_bitslice(lower);
        extended.resize(self.branch_width(), false);
        (upper, Cow::Owned(extended))
    }
}

/// Split `width` into upper and lower sub-widths.
pub fn split(width: usize) -> TreeResult<Split> {
    if width < 1 {
        return Err(TreeError::InvalidWidth(width));
    }
    Ok(split_widths(width))
}

pub(crate) fn split_widths(width: usize) -> Split {
    let lower = width / 2;
    let split = Split {
        upper: width - lower,
        lower,
    };
    assert!(split.upper >= split.lower && split.width() == width);
    split
}
