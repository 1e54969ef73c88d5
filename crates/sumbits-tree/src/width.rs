//! Register width calculation
//!
//! Every register in a popcount tree is sized from the number of input bits
//! it sums, so that a count of all ones always fits.

/// Minimum number of bits able to hold a count of up to `n` one-valued bits.
///
/// Returns the smallest `w` with `2^w - 1 >= n`, i.e. `ceil(log2(n + 1))`.
/// Defined for `n >= 1`; `widthr(0)` is `0`.
///
/// ```
/// use sumbits_tree::widthr;
///
/// assert_eq!(widthr(1), 1);
/// assert_eq!(widthr(2), 2);
/// assert_eq!(widthr(3), 2);
/// assert_eq!(widthr(17), 5);
/// ```
pub fn widthr(n: usize) -> usize {
    (usize::BITS - n.leading_zeros()) as usize
}

/// Ceiling base-2 logarithm, with `clog2(0) == clog2(1) == 0`.
pub fn clog2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (n - 1).ilog2() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widthr_small_values() {
        assert_eq!(widthr(1), 1);
        assert_eq!(widthr(2), 2);
        assert_eq!(widthr(3), 2);
        assert_eq!(widthr(4), 3);
        assert_eq!(widthr(7), 3);
        assert_eq!(widthr(8), 4);
        assert_eq!(widthr(64), 7);
    }

    #[test]
    fn test_widthr_is_minimal() {
        for n in 1..=1024usize {
            let w = widthr(n);
            assert!((1usize << w) - 1 >= n, "widthr({}) = {} too small", n, w);
            assert!((1usize << (w - 1)) - 1 < n, "widthr({}) = {} not minimal", n, w);
        }
    }

    #[test]
    fn test_widthr_monotonic() {
        for n in 1..512usize {
            assert!(widthr(n) <= widthr(n + 1));
        }
    }

    #[test]
    fn test_clog2() {
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(17), 5);
        assert_eq!(clog2(64), 6);
    }
}
