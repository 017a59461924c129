use std::ops::Range;

use smallvec::SmallVec;

use super::diff::update_if_different;

/// Maximal runs of consecutive changed slots, in ascending order.
pub type Runs = SmallVec<[Range<usize>; 4]>;

/// Diffs `values` against `table[start..start + values.len()]`, storing every
/// changed value, and returns the maximal runs of changed slots.
///
/// One native multi-bind per returned run, fed from the updated `table`, brings
/// the native context in sync. `start + values.len()` must not exceed the table.
pub fn diff_runs<T: PartialEq + Clone>(table: &mut [T], start: usize, values: &[T]) -> Runs {
    let mut runs = Runs::new();
    let mut begin = None;

    for (i, v) in values.iter().enumerate() {
        let slot = start + i;
        if update_if_different(&mut table[slot], v.clone()) {
            if begin.is_none() {
                begin = Some(slot);
            }
        } else if let Some(b) = begin.take() {
            runs.push(b..slot);
        }
    }

    if let Some(b) = begin {
        runs.push(b..start + values.len());
    }

    runs
}
