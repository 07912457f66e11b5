//! Overlap check over the footprints of a [`GridPlan`].
//!
//! Crosses and labels must not share area. Small spacings or large text
//! break that; findings are logged and returned with the array.

use alignmark_core::{BBox, SpatialEntry, SpatialIndex};

use crate::planner::{GridPlan, Placement};

/// Two placements whose footprints share interior area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// Indices into `GridPlan::placements`, `first < second`.
    pub first: usize,
    pub second: usize,
}

fn describe(placement: &Placement) -> String {
    match placement {
        Placement::Cross { row, col, .. } => format!("cross R{}C{}", row, col),
        Placement::Label { text, .. } => format!("label {}", text),
        Placement::Provenance { .. } => "provenance text".to_string(),
    }
}

/// Footprint of one placement given the cross footprint at the origin.
pub fn footprint(placement: &Placement, cross: &BBox) -> Option<BBox> {
    match placement {
        Placement::Cross { position, .. } => Some(cross.translated(position.x, position.y)),
        Placement::Label { region, .. } | Placement::Provenance { region, .. } => region.bbox(),
    }
}

/// Report every pair of placements whose footprints overlap.
pub fn audit_overlaps(plan: &GridPlan, cross: &BBox) -> Vec<Overlap> {
    let entries: Vec<SpatialEntry> = plan
        .placements
        .iter()
        .enumerate()
        .filter_map(|(index, p)| footprint(p, cross).map(|bbox| SpatialEntry { index, bbox }))
        .collect();
    let index = SpatialIndex::build(entries);

    let overlaps: Vec<Overlap> = index
        .overlapping_pairs()
        .into_iter()
        .map(|(first, second)| Overlap { first, second })
        .collect();

    for overlap in &overlaps {
        log::warn!(
            "{} overlaps {}",
            describe(&plan.placements[overlap.first]),
            describe(&plan.placements[overlap.second])
        );
    }
    if overlaps.is_empty() {
        log::debug!("No overlapping placements among {}", index.len());
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkConfig;
    use crate::cross::build_cross;
    use crate::label::LabelRenderer;
    use crate::planner::plan_grid;

    fn audit(config: &MarkConfig) -> (GridPlan, Vec<Overlap>) {
        let dims = config.resolve().unwrap();
        let labels = LabelRenderer::new(dims.label_size, dims.glyph_spacing).unwrap();
        let plan = plan_grid(&dims, &labels, &config.provenance_text()).unwrap();
        let cross = build_cross(dims.cross_size, dims.cross_width)
            .unwrap()
            .bbox()
            .unwrap();
        let overlaps = audit_overlaps(&plan, &cross);
        (plan, overlaps)
    }

    #[test]
    fn test_default_spacing_is_clean() {
        let mut config = MarkConfig::default();
        config.pattern = Some(crate::config::SizeConfig {
            size: 4.0,
            unit: alignmark_core::Unit::Millimeter,
        });
        let (_, overlaps) = audit(&config);
        assert!(overlaps.is_empty());
    }

    #[test]
    fn test_tight_spacing_overlaps() {
        let mut config = MarkConfig::default();
        config.array.spacing = 10.0;
        config.pattern = Some(crate::config::SizeConfig {
            size: 30.0,
            unit: alignmark_core::Unit::Micrometer,
        });
        config.label.provenance_scale = 1.0;
        let (plan, overlaps) = audit(&config);
        assert!(!overlaps.is_empty());

        // Neighbouring 15 µm crosses 10 µm apart must be among the findings.
        let crosses: Vec<usize> = plan
            .placements
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, Placement::Cross { .. }))
            .map(|(i, _)| i)
            .collect();
        assert!(overlaps.contains(&Overlap {
            first: crosses[0],
            second: crosses[1],
        }));
    }
}
