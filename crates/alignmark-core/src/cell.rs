use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Coord, Point, Polygon};
use crate::region::Region;
use crate::LayerId;

/// Unique cell identifier, derived from the cell name.
pub type CellId = Uuid;

/// Stable identifier for a cell name. The same name always maps to the same id.
pub fn cell_id(name: &str) -> CellId {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Placement transform for subcell instances. Only translation is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub offset: Point,
}

impl Transform {
    pub fn translate(x: Coord, y: Coord) -> Self {
        Self {
            offset: Point::new(x, y),
        }
    }

    pub fn apply_bbox(&self, bbox: &BBox) -> BBox {
        bbox.translated(self.offset.x, self.offset.y)
    }
}

/// A reference to another cell placed within a parent cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInstance {
    pub cell_id: CellId,
    pub transform: Transform,
}

impl CellInstance {
    pub fn new(cell_id: CellId, transform: Transform) -> Self {
        Self { cell_id, transform }
    }
}

/// A polygon on a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub layer_id: LayerId,
    pub polygon: Polygon,
}

/// A layout cell containing shapes and subcell references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub name: String,
    pub shapes: Vec<Shape>,
    pub instances: Vec<CellInstance>,
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            id: cell_id(name),
            name: name.to_string(),
            shapes: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn add_polygon(&mut self, layer_id: LayerId, polygon: Polygon) {
        self.shapes.push(Shape { layer_id, polygon });
    }

    /// Insert every polygon of `region` on `layer_id`.
    pub fn insert_region(&mut self, layer_id: LayerId, region: &Region) {
        for polygon in region.polygons() {
            self.add_polygon(layer_id, polygon.clone());
        }
    }

    pub fn add_instance(&mut self, instance: CellInstance) {
        self.instances.push(instance);
    }

    /// Compute the bounding box of all shapes in this cell (not including subcells).
    pub fn local_bbox(&self) -> Option<BBox> {
        self.shapes
            .iter()
            .filter_map(|s| s.polygon.bbox())
            .reduce(|a, b| a.union(&b))
    }

    pub fn shapes_on_layer(&self, layer_id: LayerId) -> impl Iterator<Item = &Polygon> {
        self.shapes
            .iter()
            .filter(move |s| s.layer_id == layer_id)
            .map(|s| &s.polygon)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_cell_insert_region() {
        let mut cell = Cell::new("test_cell");
        let region: Region = [Rect::new(0, 0, 100, 50), Rect::new(200, 0, 300, 50)]
            .into_iter()
            .collect();
        cell.insert_region(2, &region);
        assert_eq!(cell.shape_count(), 2);
        assert_eq!(cell.shapes_on_layer(2).count(), 2);
        assert_eq!(cell.shapes_on_layer(1).count(), 0);
    }

    #[test]
    fn test_cell_bbox() {
        let mut cell = Cell::new("test_cell");
        cell.add_polygon(0, Rect::new(0, 0, 100, 50).into());
        cell.add_polygon(1, Rect::new(50, 25, 200, 75).into());
        let bb = cell.local_bbox().unwrap();
        assert_eq!(bb.min, Point::new(0, 0));
        assert_eq!(bb.max, Point::new(200, 75));
        assert!(Cell::new("empty").local_bbox().is_none());
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10, 20);
        let placed = t.apply_bbox(&BBox::new(Point::new(0, 0), Point::new(5, 5)));
        assert_eq!(placed.min, Point::new(10, 20));
        assert_eq!(placed.max, Point::new(15, 25));
        assert_eq!(Transform::default(), Transform::translate(0, 0));
    }

    #[test]
    fn test_cell_id_is_stable() {
        assert_eq!(Cell::new("CROSS").id, cell_id("CROSS"));
        assert_ne!(cell_id("CROSS"), cell_id("TOP"));
    }
}
