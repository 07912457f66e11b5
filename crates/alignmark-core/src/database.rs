use serde::{Deserialize, Serialize};

use crate::cell::{cell_id, Cell, CellId};
use crate::error::LayoutError;
use crate::geometry::BBox;
use crate::layer::{LayerId, LayerStack};

/// Holds every cell of a design together with its layer table.
///
/// Cells are kept in creation order so serialization is reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDatabase {
    /// Library name.
    pub name: String,
    /// Technology layers.
    pub layer_stack: LayerStack,
    cells: Vec<Cell>,
    /// Top-level cell (entry point for hierarchy).
    pub top_cell: Option<CellId>,
    /// Size of one database unit in nanometers.
    pub dbu_nm: f64,
}

impl LayoutDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layer_stack: LayerStack::new(),
            cells: Vec::new(),
            top_cell: None,
            dbu_nm: 1.0,
        }
    }

    // ── Cell management ──────────────────────────────────────────────

    /// Add a cell; the first cell added becomes the top cell.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId, LayoutError> {
        if self.get_cell(&cell.id).is_some() {
            return Err(LayoutError::DuplicateCell(cell.name));
        }
        let id = cell.id;
        self.cells.push(cell);
        if self.top_cell.is_none() {
            self.top_cell = Some(id);
        }
        Ok(id)
    }

    pub fn create_cell(&mut self, name: &str) -> Result<CellId, LayoutError> {
        self.add_cell(Cell::new(name))
    }

    pub fn get_cell(&self, id: &CellId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == *id)
    }

    /// Mutable access to a cell that must exist.
    pub fn cell_mut(&mut self, id: &CellId) -> Result<&mut Cell, LayoutError> {
        self.cells
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| LayoutError::UnknownCell(id.to_string()))
    }

    pub fn find_cell_by_name(&self, name: &str) -> Option<&Cell> {
        self.get_cell(&cell_id(name))
    }

    pub fn cell_names(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    // ── Layers ───────────────────────────────────────────────────────

    pub fn insert_layer(&mut self, name: &str, gds_layer: u16, gds_datatype: u16) -> LayerId {
        self.layer_stack.insert(name, gds_layer, gds_datatype)
    }

    // ── Hierarchy queries ────────────────────────────────────────────

    /// Bounding box of a cell including all of its instances, recursively.
    ///
    /// Unknown cells and reference cycles contribute nothing.
    pub fn cell_bbox(&self, id: &CellId) -> Option<BBox> {
        self.cell_bbox_guarded(id, &mut Vec::new())
    }

    fn cell_bbox_guarded(&self, id: &CellId, stack: &mut Vec<CellId>) -> Option<BBox> {
        if stack.contains(id) {
            log::warn!("Cell hierarchy cycle through {}", id);
            return None;
        }
        let cell = self.get_cell(id)?;
        stack.push(*id);
        let mut bbox = cell.local_bbox();
        for inst in &cell.instances {
            if let Some(child) = self.cell_bbox_guarded(&inst.cell_id, stack) {
                let placed = inst.transform.apply_bbox(&child);
                bbox = Some(match bbox {
                    Some(b) => b.union(&placed),
                    None => placed,
                });
            }
        }
        stack.pop();
        bbox
    }
}
