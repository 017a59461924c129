/// Stores `value` into `slot` unless they are already equal.
///
/// Returns true if `slot` changed, in which case the caller owes exactly one
/// native call. Equality is handle equality for bound resources and structural
/// equality for plain descriptors like viewports.
#[inline]
pub fn update_if_different<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
