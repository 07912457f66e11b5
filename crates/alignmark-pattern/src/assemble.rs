use alignmark_core::{
    CellInstance, LayerId, LayoutDatabase, LayoutError, Polygon, Transform,
};

use crate::config::{GdsLayer, LayerConfig, DBU_NM};
use crate::planner::{GridPlan, Placement};

pub const TOP_CELL: &str = "TOP";
pub const CROSS_CELL: &str = "CROSS";
/// Library name written to the GDS header.
pub const LIBRARY_NAME: &str = "LIB";

/// An empty layout with `TOP`, `CROSS` and both mark layers.
///
/// `cross` is stored once in `CROSS`; returns the layout and the text layer.
fn skeleton(cross: &Polygon, layers: &LayerConfig) -> Result<(LayoutDatabase, LayerId), LayoutError> {
    let mut db = LayoutDatabase::new(LIBRARY_NAME);
    db.dbu_nm = DBU_NM;

    let GdsLayer { layer, datatype } = layers.cross;
    let cross_layer = db.insert_layer("cross", layer, datatype);
    let GdsLayer { layer, datatype } = layers.text;
    let text_layer = db.insert_layer("text", layer, datatype);

    db.create_cell(TOP_CELL)?;
    let cross_id = db.create_cell(CROSS_CELL)?;
    db.cell_mut(&cross_id)?.add_polygon(cross_layer, cross.clone());

    Ok((db, text_layer))
}

/// Turn a plan into a layout: one `CROSS` instance per cross placement and
/// label geometry inserted flat into `TOP`.
pub fn assemble_layout(
    plan: &GridPlan,
    cross: &Polygon,
    layers: &LayerConfig,
) -> Result<LayoutDatabase, LayoutError> {
    let (mut db, text_layer) = skeleton(cross, layers)?;
    let cross_id = alignmark_core::cell_id(CROSS_CELL);
    let top = db.cell_mut(&alignmark_core::cell_id(TOP_CELL))?;

    for placement in &plan.placements {
        match placement {
            Placement::Cross { position, .. } => top.add_instance(CellInstance::new(
                cross_id,
                Transform::translate(position.x, position.y),
            )),
            Placement::Label { region, .. } | Placement::Provenance { region, .. } => {
                top.insert_region(text_layer, region)
            }
        }
    }

    log::debug!(
        "TOP holds {} cross instances and {} text polygons",
        top.instance_count(),
        top.shape_count()
    );
    Ok(db)
}

/// A single cross instanced once at the origin.
pub fn single_cross_layout(cross: &Polygon, layers: &LayerConfig) -> Result<LayoutDatabase, LayoutError> {
    let (mut db, _) = skeleton(cross, layers)?;
    let cross_id = alignmark_core::cell_id(CROSS_CELL);
    db.cell_mut(&alignmark_core::cell_id(TOP_CELL))?
        .add_instance(CellInstance::new(cross_id, Transform::default()));
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkConfig;
    use crate::cross::build_cross;
    use crate::label::LabelRenderer;
    use crate::planner::plan_grid;
    use alignmark_core::Point;

    #[test]
    fn test_assemble_small_grid() {
        let mut config = MarkConfig::default();
        config.pattern = Some(crate::config::SizeConfig {
            size: 3.0,
            unit: alignmark_core::Unit::Millimeter,
        });
        let dims = config.resolve().unwrap();
        let labels = LabelRenderer::new(dims.label_size, dims.glyph_spacing).unwrap();
        let plan = plan_grid(&dims, &labels, &config.provenance_text()).unwrap();
        let cross = build_cross(dims.cross_size, dims.cross_width).unwrap();

        let db = assemble_layout(&plan, &cross, &config.layers).unwrap();
        assert_eq!(db.cell_names(), vec![TOP_CELL, CROSS_CELL]);
        assert_eq!(db.top_cell, Some(alignmark_core::cell_id(TOP_CELL)));

        let top = db.find_cell_by_name(TOP_CELL).unwrap();
        assert_eq!(top.instance_count(), 6);
        assert_eq!(top.instances[4].transform.offset, Point::new(1_000_000, 1_000_000));

        let text_layer = db.layer_stack.by_gds(2, 0).unwrap().id;
        assert_eq!(top.shapes_on_layer(text_layer).count(), top.shape_count());

        let cross_cell = db.find_cell_by_name(CROSS_CELL).unwrap();
        let cross_layer = db.layer_stack.by_gds(1, 0).unwrap().id;
        assert_eq!(cross_cell.shapes_on_layer(cross_layer).next(), Some(&cross));
    }

    #[test]
    fn test_single_cross_layout() {
        let cross = build_cross(10_000, 2_000).unwrap();
        let db = single_cross_layout(&cross, &LayerConfig::default()).unwrap();
        let top = db.find_cell_by_name(TOP_CELL).unwrap();
        assert_eq!(top.instance_count(), 1);
        assert_eq!(top.instances[0].transform, Transform::translate(0, 0));
        assert_eq!(db.layer_stack.len(), 2);

        let bbox = db.cell_bbox(&alignmark_core::cell_id(TOP_CELL)).unwrap();
        assert_eq!(bbox.width(), 10_000);
    }
}
