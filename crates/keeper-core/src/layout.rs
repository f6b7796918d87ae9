//! Row layout for rendering bookmark lists as keyboards or tables.

/// Split `items` into consecutive rows of at most `width` entries.
///
/// A `width` of zero is treated as one. An empty slice yields a single
/// empty row, so callers always have at least one row to render.
pub fn to_rows<T: Clone>(items: &[T], width: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    items.chunks(width.max(1)).map(<[T]>::to_vec).collect()
}
