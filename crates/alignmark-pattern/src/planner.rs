//! Grid placement of crosses, position labels and the provenance line.
//!
//! Planning is pure: [`plan_grid`] only computes where things go and returns
//! a [`GridPlan`]. Turning the plan into cells happens in `assemble`.

use alignmark_core::{Coord, LayoutError, Point, Region, TextGenerator};

use crate::config::Dimensions;
use crate::label::{position_label, LabelRenderer};

/// One item of the plan, in placement order.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// A cross instance centered on `position`.
    Cross {
        row: usize,
        col: usize,
        position: Point,
    },
    /// A position label; `region` is already translated to `position`.
    Label {
        row: usize,
        col: usize,
        text: String,
        position: Point,
        region: Region,
    },
    /// The single author line in the reserved last row.
    Provenance {
        text: String,
        position: Point,
        region: Region,
    },
}

/// Result of planning an N×N alignment-mark grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub dimension: usize,
    pub spacing: Coord,
    pub placements: Vec<Placement>,
}

impl GridPlan {
    pub fn cross_positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.placements.iter().filter_map(|p| match p {
            Placement::Cross { position, .. } => Some(*position),
            _ => None,
        })
    }

    pub fn cross_count(&self) -> usize {
        self.cross_positions().count()
    }

    pub fn label_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Label { .. }))
            .count()
    }

    pub fn provenance(&self) -> Option<&Placement> {
        self.placements
            .iter()
            .find(|p| matches!(p, Placement::Provenance { .. }))
    }
}

/// Number of grid points per side: `ceil(pattern_size / spacing)`.
pub fn grid_dimension(pattern_size: Coord, spacing: Coord) -> usize {
    if pattern_size <= 0 || spacing <= 0 {
        return 0;
    }
    ((pattern_size + spacing - 1) / spacing) as usize
}

fn grid_position(row: usize, col: usize, spacing: Coord) -> Point {
    Point::new(col as Coord * spacing, row as Coord * spacing)
}

/// Horizontal extent of a region, zero when empty.
fn region_width(region: &Region) -> Coord {
    region.bbox().map(|b| b.width()).unwrap_or(0)
}

/// Lay out the grid row by row.
///
/// The last row is reserved: only its middle column (`N / 2`) produces
/// output, the `provenance` line centered on that grid point and lifted by
/// `dims.provenance_offset`. Every other grid point gets a cross and an
/// `R<row>C<col>` label centered below it.
pub fn plan_grid(
    dims: &Dimensions,
    labels: &LabelRenderer,
    provenance: &str,
) -> Result<GridPlan, LayoutError> {
    let n = grid_dimension(dims.pattern_size, dims.spacing);
    log::info!(
        "Planning {}x{} grid at {} nm spacing",
        n,
        n,
        dims.spacing
    );
    if n <= 1 {
        log::warn!(
            "Pattern size {} nm does not exceed the spacing {} nm; the reserved provenance row leaves no crosses",
            dims.pattern_size,
            dims.spacing
        );
    }

    let label_drop = dims.cross_size + dims.label_size;
    let mut placements = Vec::new();

    for row in 0..n {
        for col in 0..n {
            let position = grid_position(row, col, dims.spacing);

            if row == n - 1 {
                if col == n / 2 {
                    let text = TextGenerator::with_height(dims.provenance_height).text(provenance)?;
                    let anchor = Point::new(
                        position.x - region_width(&text) / 2,
                        position.y + dims.provenance_offset,
                    );
                    placements.push(Placement::Provenance {
                        text: provenance.to_string(),
                        position: anchor,
                        region: text.translated(anchor.x, anchor.y),
                    });
                }
                continue;
            }

            placements.push(Placement::Cross { row, col, position });

            let text = position_label(row, col);
            let label = labels.render_label(&text)?;
            let anchor = Point::new(
                position.x - region_width(&label) / 2,
                position.y - label_drop,
            );
            placements.push(Placement::Label {
                row,
                col,
                text,
                position: anchor,
                region: label.translated(anchor.x, anchor.y),
            });
        }
    }

    let plan = GridPlan {
        dimension: n,
        spacing: dims.spacing,
        placements,
    };
    log::debug!(
        "Planned {} crosses and {} labels",
        plan.cross_count(),
        plan.label_count()
    );
    Ok(plan)
}
