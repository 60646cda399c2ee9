//! Clamp-at-ends / bracket-in-interior lookup shared by every tabulated axis.

use pf_core::fraction;

/// Where a query falls on an ascending axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bracket {
    /// At or beyond an end (or a single-entry axis): use this entry unmodified.
    Clamped(usize),
    /// Strictly inside the axis: blend `lo` toward `hi` by `t` in `[0, 1)`.
    Between { lo: usize, hi: usize, t: f64 },
}

/// Locate `target` on the ascending axis `key(items[i])`.
///
/// Returns `None` for an empty axis. Equal keys resolve to the lowest index
/// whose key does not exceed the target, so the pair is always unique and
/// never spans a zero-width interval.
pub fn locate<T>(items: &[T], key: impl Fn(&T) -> f64, target: f64) -> Option<Bracket> {
    let n = items.len();
    if n == 0 {
        return None;
    }
    if n == 1 || target <= key(&items[0]) {
        return Some(Bracket::Clamped(0));
    }
    if target >= key(&items[n - 1]) {
        return Some(Bracket::Clamped(n - 1));
    }
    let hi = items.partition_point(|item| key(item) <= target);
    let lo = hi - 1;
    let t = fraction(target, key(&items[lo]), key(&items[hi]));
    Some(Bracket::Between { lo, hi, t })
}

/// True when `key` never decreases along `items`.
pub fn is_ascending<T>(items: &[T], key: impl Fn(&T) -> f64) -> bool {
    items.windows(2).all(|w| key(&w[0]) <= key(&w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_at_both_ends() {
        let axis = [1.0, 2.0, 4.0];
        assert_eq!(locate(&axis, |x| *x, 0.5), Some(Bracket::Clamped(0)));
        assert_eq!(locate(&axis, |x| *x, 1.0), Some(Bracket::Clamped(0)));
        assert_eq!(locate(&axis, |x| *x, 4.0), Some(Bracket::Clamped(2)));
        assert_eq!(locate(&axis, |x| *x, 9.0), Some(Bracket::Clamped(2)));
    }

    #[test]
    fn brackets_interior() {
        let axis = [1.0, 2.0, 4.0];
        assert_eq!(
            locate(&axis, |x| *x, 3.0),
            Some(Bracket::Between { lo: 1, hi: 2, t: 0.5 })
        );
        assert_eq!(
            locate(&axis, |x| *x, 2.0),
            Some(Bracket::Between { lo: 1, hi: 2, t: 0.0 })
        );
    }

    #[test]
    fn duplicate_keys_never_form_zero_width_pair() {
        let axis = [1.0, 2.0, 2.0, 3.0];
        match locate(&axis, |x| *x, 2.0) {
            Some(Bracket::Between { lo, hi, t }) => {
                assert_eq!((lo, hi), (2, 3));
                assert_eq!(t, 0.0);
            }
            other => panic!("unexpected bracket {other:?}"),
        }
    }

    #[test]
    fn single_entry_and_empty_axis() {
        assert_eq!(locate(&[5.0], |x| *x, 1e9), Some(Bracket::Clamped(0)));
        assert_eq!(locate::<f64>(&[], |x| *x, 1.0), None);
    }
}
