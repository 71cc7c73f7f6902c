//! Batch partitioning of the merged update sequence

use std::collections::HashSet;

/// Cut `items` into chunks of at most `batch_size`.
///
/// A chunk is also closed early when the next item's id is already inside
/// it, so no chunk ever carries the same id twice.
pub fn partition<T, F>(items: impl IntoIterator<Item = T>, batch_size: usize, id: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> &str,
{
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut current: Vec<T> = Vec::with_capacity(batch_size);
    let mut ids: HashSet<String> = HashSet::with_capacity(batch_size);

    for item in items {
        let key = id(&item);
        if current.len() >= batch_size || ids.contains(key) {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
            ids.clear();
        }
        ids.insert(id(&item).to_string());
        current.push(item);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
