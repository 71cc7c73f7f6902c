//! Fair round-robin merge of per-spot update sequences
//!
//! Takes one element from each non-exhausted source per round, in a fixed
//! order. Exhausted sources leave the rotation without disturbing the order
//! of the others. Any prefix no longer than the number of sources still
//! active holds at most one element per source.

/// One-pass round-robin iterator over a list of active cursors
#[derive(Debug)]
pub struct RoundRobin<I> {
    cursors: Vec<I>,
    position: usize,
}

impl<I: Iterator> RoundRobin<I> {
    pub fn new(cursors: Vec<I>) -> Self {
        Self {
            cursors,
            position: 0,
        }
    }
}

impl<I: Iterator> Iterator for RoundRobin<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.cursors.is_empty() {
            if self.position >= self.cursors.len() {
                self.position = 0;
            }
            match self.cursors[self.position].next() {
                Some(item) => {
                    self.position += 1;
                    return Some(item);
                }
                None => {
                    // next cursor slides into this slot
                    self.cursors.remove(self.position);
                }
            }
        }
        None
    }
}

/// Merge `sources` round-robin
pub fn rotate<S, T>(sources: S) -> RoundRobin<T::IntoIter>
where
    S: IntoIterator<Item = T>,
    T: IntoIterator,
{
    RoundRobin::new(sources.into_iter().map(IntoIterator::into_iter).collect())
}
