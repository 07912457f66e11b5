//! # alignmark pattern
//!
//! Builds wafer alignment-mark layouts: a grid of crosses, each labelled with
//! its `R<row>C<col>` position, plus one provenance line across the top.
//!
//! The pipeline is config → [`Dimensions`] → [`GridPlan`] → `LayoutDatabase`
//! → GDS-II file. Every stage before the last one is pure, so a failure in
//! geometry or text never leaves a file behind.

pub mod assemble;
pub mod audit;
pub mod config;
pub mod cross;
pub mod label;
pub mod planner;

use std::path::PathBuf;

use thiserror::Error;

use alignmark_core::{LayoutDatabase, LayoutError};
use alignmark_io::{save_layout, GdsError};

pub use assemble::{assemble_layout, single_cross_layout, CROSS_CELL, TOP_CELL};
pub use audit::{audit_overlaps, Overlap};
pub use config::{ConfigError, CrossConfig, Dimensions, MarkConfig, SubstratePreset};
pub use cross::build_cross;
pub use label::{position_label, LabelRenderer, LABEL_GLYPHS};
pub use planner::{grid_dimension, plan_grid, GridPlan, Placement};

/// Output name of the single-cross example.
pub const EXAMPLE_FILENAME: &str = "Experimental Pattern";

#[derive(Error, Debug)]
pub enum PatternError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Gds(#[from] GdsError),
}

/// A generated, not yet written, alignment-mark array.
#[derive(Debug, Clone)]
pub struct MarkArray {
    pub dimensions: Dimensions,
    pub plan: GridPlan,
    pub layout: LayoutDatabase,
    pub overlaps: Vec<Overlap>,
}

/// Plan, audit and assemble the array described by `config`.
pub fn generate_array(config: &MarkConfig) -> Result<MarkArray, PatternError> {
    let dimensions = config.resolve()?;
    let cross = build_cross(dimensions.cross_size, dimensions.cross_width)?;
    let labels = LabelRenderer::new(dimensions.label_size, dimensions.glyph_spacing)?;
    let plan = plan_grid(&dimensions, &labels, &config.provenance_text())?;

    let footprint = cross.bbox().ok_or_else(|| {
        LayoutError::GeometryAssembly("cross polygon has no vertices".into())
    })?;
    let overlaps = audit_overlaps(&plan, &footprint);
    let layout = assemble_layout(&plan, &cross, &config.layers)?;

    log::info!(
        "Generated {} crosses on a {}x{} grid",
        plan.cross_count(),
        plan.dimension,
        plan.dimension
    );
    Ok(MarkArray {
        dimensions,
        plan,
        layout,
        overlaps,
    })
}

/// Generate the array and write it under `config.output`.
pub fn write_array(config: &MarkConfig) -> Result<(MarkArray, PathBuf), PatternError> {
    let array = generate_array(config)?;
    let path = save_layout(
        &array.layout,
        &config.output.directory,
        &config.base_filename(),
        config.output.overwrite,
    )?;
    Ok((array, path))
}

/// One cross in `TOP` at the origin.
pub fn generate_single_cross(
    cross: &CrossConfig,
    layers: &config::LayerConfig,
) -> Result<LayoutDatabase, PatternError> {
    let polygon = build_cross(
        cross.arm_length().to_dbu(config::DBU_NM),
        cross.arm_width().to_dbu(config::DBU_NM),
    )?;
    Ok(single_cross_layout(&polygon, layers)?)
}
