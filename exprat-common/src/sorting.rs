//! Iterative in-place quicksort, parameterized over a sort key.

use crate::memory::Stack;

/// Sort a slice in place by ascending key.
///
/// Uses an explicit stack of sub-partitions instead of recursion, so
/// degenerate inputs cannot overflow the call stack. The partition scheme
/// is Lomuto's, with the key of the last element as pivot.
///
/// The key function may carry state; sorting a clause by quantifier
/// ordering warns about free variables as a side effect of the lookup.
pub fn quicksort_in_place<T, K>(partitions: &mut Stack<usize>, values: &mut [T], mut key: K)
where
    T: Copy,
    K: FnMut(T) -> u32,
{
    if values.len() < 2 {
        return;
    }
    partitions.clear();
    partitions.push(0);
    partitions.push(values.len() - 1);
    while !partitions.is_empty() {
        // Pushed as (low, high), so they pop in reverse order.
        let high = partitions.pop();
        let low = partitions.pop();
        let pivot_key = key(values[high]);
        let mut below = low;
        for offset in low..high {
            if key(values[offset]) <= pivot_key {
                values.swap(below, offset);
                below += 1;
            }
        }
        values.swap(below, high);
        // Skip empty or single-element sub-partitions.
        if low + 1 < below {
            partitions.push(low);
            partitions.push(below - 1);
        }
        if below + 1 < high {
            partitions.push(below + 1);
            partitions.push(high);
        }
    }
}
