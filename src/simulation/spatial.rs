//! Spatial indexing for efficient neighbor queries.
//!
//! Provides a thin interface for building and querying a KD-tree over
//! creature centroids; used by the sense phase and by mate search.

use kdtree::distance::squared_euclidean;
use kdtree::{ErrorKind as KdTreeError, KdTree};

/// Type alias for the 2D spatial KD-tree used for neighbor queries.
pub type Tree2D = KdTree<f32, usize, Vec<f32>>;

/// Result of a spatial radius query: `(distance_squared, index)` pairs.
pub type SpatialQueryResult = Vec<(f32, usize)>;

/// Builds a KD-tree from a collection of items.
pub fn build_tree<T>(
    items: &[T],
    get_pos: impl Fn(&T) -> Vec<f32>,
) -> Result<Tree2D, KdTreeError> {
    let mut tree = KdTree::with_capacity(2, items.len().max(1));
    for (i, item) in items.iter().enumerate() {
        tree.add(get_pos(item), i)?;
    }
    Ok(tree)
}

/// Queries items within `radius` of `pos`.
pub fn within(tree: &Tree2D, pos: [f32; 2], radius: f32) -> SpatialQueryResult {
    tree.within(&pos.to_vec(), radius.powi(2), &squared_euclidean)
        .unwrap_or_default()
        .into_iter()
        .map(|(dist, &idx)| (dist, idx))
        .collect()
}
