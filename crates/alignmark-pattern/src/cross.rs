use alignmark_core::{Coord, LayoutError, Polygon, Rect, Region};

/// Build a plus-shaped cross centered on the origin.
///
/// `arm_length` is the end-to-end length of each arm and `arm_width` its line
/// width, both in database units. The two arms are merged into one polygon.
pub fn build_cross(arm_length: Coord, arm_width: Coord) -> Result<Polygon, LayoutError> {
    if arm_length <= 0 || arm_width <= 0 {
        return Err(LayoutError::GeometryAssembly(format!(
            "cross dimensions must be positive (length {}, width {})",
            arm_length, arm_width
        )));
    }
    if arm_width >= arm_length {
        return Err(LayoutError::GeometryAssembly(format!(
            "cross line width {} must be smaller than arm length {}",
            arm_width, arm_length
        )));
    }

    let vertical = Rect::centered(arm_width, arm_length);
    let horizontal = Rect::centered(arm_length, arm_width);
    let merged = (Region::from(vertical) + Region::from(horizontal)).merged();

    let mut polygons = merged.into_polygons();
    if polygons.len() != 1 {
        return Err(LayoutError::GeometryAssembly(format!(
            "expected one polygon, got {}",
            polygons.len()
        )));
    }
    let cross = polygons.remove(0);
    log::debug!(
        "Built cross {}x{} with {} vertices",
        arm_length,
        arm_width,
        cross.vertex_count()
    );
    Ok(cross)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignmark_core::Point;

    #[test]
    fn test_default_cross() {
        let cross = build_cross(15_000, 2_000).unwrap();
        assert_eq!(cross.vertex_count(), 12);
        assert!(!cross.has_holes());
        let bbox = cross.bbox().unwrap();
        assert_eq!(bbox.width(), 15_000);
        assert_eq!(bbox.height(), 15_000);
        assert_eq!(bbox.min, Point::new(-7_500, -7_500));
        // Two arms minus the shared center square
        assert_eq!(cross.area(), 2 * 15_000 * 2_000 - 2_000 * 2_000);
    }

    #[test]
    fn test_odd_extents_stay_exact() {
        let cross = build_cross(15, 3).unwrap();
        let bbox = cross.bbox().unwrap();
        assert_eq!(bbox.width(), 15);
        assert_eq!(bbox.height(), 15);
        assert_eq!(cross.area(), 2 * 15 * 3 - 9);
    }

    #[test]
    fn test_degenerate_cross_rejected() {
        assert!(matches!(
            build_cross(2_000, 2_000),
            Err(LayoutError::GeometryAssembly(_))
        ));
        assert!(matches!(
            build_cross(15_000, 0),
            Err(LayoutError::GeometryAssembly(_))
        ));
        assert!(matches!(
            build_cross(-1, 1),
            Err(LayoutError::GeometryAssembly(_))
        ));
    }

    #[test]
    fn test_cross_is_deterministic() {
        assert_eq!(build_cross(10_000, 2_000), build_cross(10_000, 2_000));
    }
}
