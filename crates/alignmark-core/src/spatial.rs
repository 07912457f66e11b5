use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::BBox;

/// A footprint tagged with the caller's index for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialEntry {
    pub index: usize,
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope_of(&self.bbox)
    }
}

fn envelope_of(bbox: &BBox) -> AABB<[i64; 2]> {
    AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
}

/// R-tree over footprints, bulk loaded once and queried for collisions.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Entries whose footprint touches or crosses `window`.
    pub fn touching(&self, window: &BBox) -> impl Iterator<Item = &SpatialEntry> {
        self.tree.locate_in_envelope_intersecting(&envelope_of(window))
    }

    /// Pairs `(a, b)` with `a < b` whose boxes overlap with positive area.
    ///
    /// Sorted, so the result is independent of tree layout.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .tree
            .iter()
            .flat_map(|a| {
                self.touching(&a.bbox)
                    .filter(move |b| a.index < b.index && a.bbox.overlaps(&b.bbox))
                    .map(move |b| (a.index, b.index))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
