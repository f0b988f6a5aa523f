use std::num::NonZeroUsize;

/// Splits `items` into consecutive groups of at most `size` elements.
///
/// Every group but the last holds exactly `size` elements and the groups
/// concatenate back to the input order.
pub fn chunk<T>(items: Vec<T>, size: NonZeroUsize) -> Vec<Vec<T>> {
    let size = size.get();
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));
    for item in items {
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
        current.push(item);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
