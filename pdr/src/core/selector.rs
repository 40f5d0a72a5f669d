//! Best-candidate selection.

/// Index of the highest-scoring item; the earliest wins ties.
///
/// Returns `None` for an empty slice.
pub fn best_index<T>(items: &[T], score: impl Fn(&T) -> u32) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, item) in items.iter().enumerate() {
        let s = score(item);
        match best {
            Some((_, top)) if s <= top => {}
            _ => best = Some((idx, s)),
        }
    }
    best.map(|(idx, _)| idx)
}
