use serde::{Deserialize, Serialize};

/// Integer database-unit coordinate (1 dbu = 1 nm unless the layout says otherwise).
pub type Coord = i64;

/// A 2D point in layout coordinates (database units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn translate(&self, dx: Coord, dy: Coord) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BBox::new(*first, *first);
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    /// True if the interiors overlap; touching edges do not count.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn translated(&self, dx: Coord, dy: Coord) -> Self {
        Self::new(self.min.translate(dx, dy), self.max.translate(dx, dy))
    }
}

/// An axis-aligned rectangle given by its four sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: Coord,
    pub bottom: Coord,
    pub right: Coord,
    pub top: Coord,
}

impl Rect {
    /// Builds a rectangle from two opposite corners in any order.
    pub fn new(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Self {
            left: x1.min(x2),
            bottom: y1.min(y2),
            right: x1.max(x2),
            top: y1.max(y2),
        }
    }

    /// A `width` × `height` rectangle centered on the origin.
    ///
    /// Odd extents put the extra unit on the positive side so the size stays exact.
    pub fn centered(width: Coord, height: Coord) -> Self {
        let half_w = width / 2;
        let half_h = height / 2;
        Self::new(-half_w, -half_h, width - half_w, height - half_h)
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(
            Point::new(self.left, self.bottom),
            Point::new(self.right, self.top),
        )
    }

    pub fn width(&self) -> Coord {
        self.right - self.left
    }

    pub fn height(&self) -> Coord {
        self.top - self.bottom
    }

    pub fn area(&self) -> Coord {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn translated(&self, dx: Coord, dy: Coord) -> Self {
        Self {
            left: self.left + dx,
            bottom: self.bottom + dy,
            right: self.right + dx,
            top: self.top + dy,
        }
    }

    /// Counter-clockwise corner ring starting at the lower-left corner.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.bottom),
            Point::new(self.right, self.bottom),
            Point::new(self.right, self.top),
            Point::new(self.left, self.top),
        ]
    }
}

/// A polygon: one outer ring plus optional holes.
///
/// Rings are stored open (the first point is not repeated). The hull runs
/// counter-clockwise, holes run clockwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    pub hull: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(hull: Vec<Point>) -> Self {
        Self {
            hull,
            holes: Vec::new(),
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.hull)
    }

    pub fn vertex_count(&self) -> usize {
        self.hull.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Enclosed area, holes subtracted.
    pub fn area(&self) -> Coord {
        let holes: Coord = self.holes.iter().map(|h| signed_area2(h)).sum();
        (signed_area2(&self.hull) + holes).abs() / 2
    }

    /// All rings, hull first.
    pub fn rings(&self) -> impl Iterator<Item = &[Point]> {
        std::iter::once(self.hull.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }

    /// True when every edge is horizontal or vertical.
    pub fn is_rectilinear(&self) -> bool {
        self.rings().all(|ring| {
            ring.iter()
                .zip(ring.iter().cycle().skip(1))
                .all(|(a, b)| a.x == b.x || a.y == b.y)
        })
    }

    pub fn translated(&self, dx: Coord, dy: Coord) -> Self {
        let shift = |ring: &Vec<Point>| ring.iter().map(|p| p.translate(dx, dy)).collect();
        Self {
            hull: shift(&self.hull),
            holes: self.holes.iter().map(shift).collect(),
        }
    }
}

impl From<Rect> for Polygon {
    fn from(rect: Rect) -> Self {
        Polygon::new(rect.corners().to_vec())
    }
}

/// Twice the signed area of a ring (positive for counter-clockwise).
pub fn signed_area2(ring: &[Point]) -> Coord {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let r = Rect::new(10, 5, -10, -5);
        assert_eq!((r.left, r.bottom, r.right, r.top), (-10, -5, 10, 5));
        assert_eq!(r.area(), 200);
    }

    #[test]
    fn test_rect_centered_exact_size() {
        let r = Rect::centered(2000, 15000);
        assert_eq!((r.left, r.bottom, r.right, r.top), (-1000, -7500, 1000, 7500));
        let odd = Rect::centered(3, 5);
        assert_eq!(odd.width(), 3);
        assert_eq!(odd.height(), 5);
    }

    #[test]
    fn test_bbox_overlap() {
        let a = BBox::new(Point::new(0, 0), Point::new(10, 10));
        let b = BBox::new(Point::new(5, 5), Point::new(15, 15));
        let c = BBox::new(Point::new(20, 20), Point::new(30, 30));
        let touching = BBox::new(Point::new(10, 0), Point::new(20, 10));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&touching));
    }

    #[test]
    fn test_polygon_area_with_hole() {
        let hull = Rect::new(0, 0, 10, 10).corners().to_vec();
        let mut hole = Rect::new(2, 2, 4, 4).corners().to_vec();
        hole.reverse();
        let poly = Polygon {
            hull,
            holes: vec![hole],
        };
        assert_eq!(poly.area(), 96);
        assert!(poly.is_rectilinear());
        assert_eq!(poly.vertex_count(), 8);
    }

    #[test]
    fn test_rect_ring_is_counter_clockwise() {
        let ring = Rect::new(0, 0, 4, 2).corners();
        assert_eq!(signed_area2(&ring), 16);
    }
}
