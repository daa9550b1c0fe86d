// Spatial hash grid for HexFog Core
//
// Fixed-cell bucket index from world-space bounding boxes to entities. An
// entity is replicated into every cell its box overlaps, so a point query
// only ever has to look at the single cell containing the point and is still
// guaranteed a candidate superset of the true hits.

use std::collections::HashMap;

use crate::types::Bounds;

/// Bucketed spatial index over copyable entity handles.
///
/// Callers must confirm exact hits against the candidates; the index alone
/// only narrows the search.
#[derive(Debug)]
pub struct SpatialHashGrid<T> {
    cell_size: f64,
    cells: HashMap<u64, Vec<T>>,
}

impl<T: Copy + PartialEq> SpatialHashGrid<T> {
    /// Create an index with the given cell size, ideally about twice the
    /// typical entity radius.
    pub fn new(cell_size: f64) -> SpatialHashGrid<T> {
        SpatialHashGrid {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Empty all buckets in place, optionally adopting a new cell size,
    /// without discarding the container.
    pub fn clear(&mut self, cell_size: Option<f64>) {
        if let Some(size) = cell_size {
            self.cell_size = size.max(1.0);
        }
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    /// Register an entity into every cell its bounding box overlaps
    pub fn insert(&mut self, entity: T, bounds: &Bounds) {
        let cx_min = self.cell_coord(bounds.x_min);
        let cx_max = self.cell_coord(bounds.x_max);
        let cy_min = self.cell_coord(bounds.y_min);
        let cy_max = self.cell_coord(bounds.y_max);

        for cx in cx_min..=cx_max {
            for cy in cy_min..=cy_max {
                let bucket = self.cells.entry(cell_key(cx, cy)).or_default();
                if !bucket.contains(&entity) {
                    bucket.push(entity);
                }
            }
        }
    }

    /// Candidate superset for the cell containing (x, y), in insertion order
    pub fn query_point(&self, x: f64, y: f64) -> &[T] {
        let key = cell_key(self.cell_coord(x), self.cell_coord(y));
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn cell_coord(&self, v: f64) -> i32 {
        (v / self.cell_size).floor() as i32
    }
}

/// Collision-free key for signed cell coordinates: zig-zag encode each axis
/// into a u32, then pack both into one u64. Bijective by construction, unlike
/// string concatenation of signed coordinates where ("-1","1") and ("1","-1")
/// style prefixes can collide.
fn cell_key(cx: i32, cy: i32) -> u64 {
    ((zigzag(cx) as u64) << 32) | zigzag(cy) as u64
}

fn zigzag(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}
