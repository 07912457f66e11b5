//! Rectilinear polygon sets with boolean union.
//!
//! A [`Region`] is an unordered bag of polygons. Adding regions only
//! concatenates; [`Region::merged`] computes the union and returns it as
//! maximal polygons. The merge works on a compressed grid built from every
//! distinct x and y coordinate, so it is exact for Manhattan geometry, which
//! is all this crate produces (boxes, crosses and bitmap glyphs).
//!
//! Pieces that only touch at a corner stay separate polygons.

use std::collections::HashMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::geometry::{signed_area2, BBox, Coord, Point, Polygon, Rect};

/// A set of rectilinear polygons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    polygons: Vec<Polygon>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn insert(&mut self, polygon: Polygon) {
        debug_assert!(polygon.is_rectilinear(), "regions hold rectilinear polygons only");
        self.polygons.push(polygon);
    }

    pub fn insert_rect(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.polygons.push(rect.into());
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.polygons
            .iter()
            .filter_map(Polygon::bbox)
            .reduce(|a, b| a.union(&b))
    }

    pub fn translated(&self, dx: Coord, dy: Coord) -> Self {
        Self {
            polygons: self.polygons.iter().map(|p| p.translated(dx, dy)).collect(),
        }
    }

    /// Area covered by the union of all polygons.
    pub fn area(&self) -> Coord {
        let raster = Raster::build(&self.polygons);
        (0..raster.rows())
            .flat_map(|j| (0..raster.cols()).map(move |i| (i, j)))
            .filter(|&(i, j)| raster.is_filled(i, j))
            .map(|(i, j)| raster.cell_rect(i, j).area())
            .sum()
    }

    /// Union of all polygons as maximal, edge-connected polygons.
    pub fn merged(&self) -> Region {
        let raster = Raster::build(&self.polygons);
        let (labels, count) = raster.components();
        let mut polygons = Vec::with_capacity(count);
        for component in 1..=count {
            polygons.extend(trace_component(&raster, &labels, component));
        }
        log::trace!(
            "merged {} polygons into {} ({}x{} grid)",
            self.polygons.len(),
            polygons.len(),
            raster.cols(),
            raster.rows()
        );
        Region { polygons }
    }

    /// Decompose the union into non-overlapping rectangles.
    ///
    /// Cells are joined into maximal horizontal runs per grid row, and runs
    /// with identical extents in consecutive rows are stacked.
    pub fn to_rects(&self) -> Vec<Rect> {
        let raster = Raster::build(&self.polygons);
        let mut rects = Vec::new();
        // (first col, one-past-last col, first row)
        let mut open: Vec<(usize, usize, usize)> = Vec::new();

        for j in 0..=raster.rows() {
            let runs = if j < raster.rows() {
                raster.runs(j)
            } else {
                Vec::new()
            };
            let mut still_open = Vec::with_capacity(open.len());
            for (i0, i1, j0) in open.drain(..) {
                if runs.contains(&(i0, i1)) {
                    still_open.push((i0, i1, j0));
                } else {
                    rects.push(Rect::new(
                        raster.xs[i0],
                        raster.ys[j0],
                        raster.xs[i1],
                        raster.ys[j],
                    ));
                }
            }
            for run in runs {
                if !still_open.iter().any(|&(i0, i1, _)| (i0, i1) == run) {
                    still_open.push((run.0, run.1, j));
                }
            }
            open = still_open;
        }
        rects
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        let mut region = Region::new();
        region.insert_rect(rect);
        region
    }
}

impl From<Polygon> for Region {
    fn from(polygon: Polygon) -> Self {
        let mut region = Region::new();
        region.insert(polygon);
        region
    }
}

impl FromIterator<Rect> for Region {
    fn from_iter<T: IntoIterator<Item = Rect>>(iter: T) -> Self {
        let mut region = Region::new();
        for rect in iter {
            region.insert_rect(rect);
        }
        region
    }
}

impl Add for Region {
    type Output = Region;

    fn add(mut self, rhs: Region) -> Region {
        self.polygons.extend(rhs.polygons);
        self
    }
}

impl AddAssign<&Region> for Region {
    fn add_assign(&mut self, rhs: &Region) {
        self.polygons.extend(rhs.polygons.iter().cloned());
    }
}

// ── Compressed-grid rasterization ────────────────────────────────────

struct Raster {
    xs: Vec<Coord>,
    ys: Vec<Coord>,
    filled: Vec<bool>,
}

impl Raster {
    fn build(polygons: &[Polygon]) -> Self {
        let mut xs: Vec<Coord> = Vec::new();
        let mut ys: Vec<Coord> = Vec::new();
        for ring in polygons.iter().flat_map(Polygon::rings) {
            for p in ring {
                xs.push(p.x);
                ys.push(p.y);
            }
        }
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();

        let cols = xs.len().saturating_sub(1);
        let rows = ys.len().saturating_sub(1);
        let mut raster = Raster {
            xs,
            ys,
            filled: vec![false; cols * rows],
        };

        for polygon in polygons {
            raster.fill_polygon(polygon);
        }
        raster
    }

    fn cols(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }

    fn rows(&self) -> usize {
        self.ys.len().saturating_sub(1)
    }

    fn is_filled(&self, i: usize, j: usize) -> bool {
        self.filled[j * self.cols() + i]
    }

    fn cell_rect(&self, i: usize, j: usize) -> Rect {
        Rect::new(self.xs[i], self.ys[j], self.xs[i + 1], self.ys[j + 1])
    }

    /// Even-odd scanline fill of one polygon (hull and holes together).
    fn fill_polygon(&mut self, polygon: &Polygon) {
        // Vertical edges as (x, y_low, y_high).
        let edges: Vec<(Coord, Coord, Coord)> = polygon
            .rings()
            .flat_map(|ring| ring.iter().zip(ring.iter().cycle().skip(1)))
            .filter(|(a, b)| a.x == b.x && a.y != b.y)
            .map(|(a, b)| (a.x, a.y.min(b.y), a.y.max(b.y)))
            .collect();

        let cols = self.cols();
        let mut crossings: Vec<Coord> = Vec::new();
        for j in 0..self.rows() {
            // Doubled coordinates keep the row center integral.
            let center2 = self.ys[j] + self.ys[j + 1];
            crossings.clear();
            crossings.extend(
                edges
                    .iter()
                    .filter(|&&(_, lo, hi)| 2 * lo < center2 && center2 < 2 * hi)
                    .map(|&(x, _, _)| x),
            );
            crossings.sort_unstable();
            for pair in crossings.chunks_exact(2) {
                let i0 = self.xs.binary_search(&pair[0]).unwrap_or_else(|i| i);
                let i1 = self.xs.binary_search(&pair[1]).unwrap_or_else(|i| i);
                for i in i0..i1 {
                    self.filled[j * cols + i] = true;
                }
            }
        }
    }

    /// Maximal runs of filled cells in row `j` as (first, one-past-last).
    fn runs(&self, j: usize) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = None;
        for i in 0..self.cols() {
            match (self.is_filled(i, j), start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    runs.push((s, i));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, self.cols()));
        }
        runs
    }

    /// Label 4-connected components of filled cells. Label 0 means empty.
    fn components(&self) -> (Vec<usize>, usize) {
        let cols = self.cols();
        let rows = self.rows();
        let mut labels = vec![0usize; cols * rows];
        let mut count = 0;
        let mut stack = Vec::new();

        for start in 0..labels.len() {
            if !self.filled[start] || labels[start] != 0 {
                continue;
            }
            count += 1;
            labels[start] = count;
            stack.push(start);
            while let Some(idx) = stack.pop() {
                let (i, j) = (idx % cols, idx / cols);
                let mut visit = |n: usize| {
                    if self.filled[n] && labels[n] == 0 {
                        labels[n] = count;
                        stack.push(n);
                    }
                };
                if i > 0 {
                    visit(idx - 1);
                }
                if i + 1 < cols {
                    visit(idx + 1);
                }
                if j > 0 {
                    visit(idx - cols);
                }
                if j + 1 < rows {
                    visit(idx + cols);
                }
            }
        }
        (labels, count)
    }
}

// ── Boundary tracing ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Dir {
    East,
    North,
    West,
    South,
}

impl Dir {
    fn left(self) -> Dir {
        match self {
            Dir::East => Dir::North,
            Dir::North => Dir::West,
            Dir::West => Dir::South,
            Dir::South => Dir::East,
        }
    }

    fn right(self) -> Dir {
        match self {
            Dir::East => Dir::South,
            Dir::North => Dir::East,
            Dir::West => Dir::North,
            Dir::South => Dir::West,
        }
    }

    fn step(self, (i, j): (usize, usize)) -> (usize, usize) {
        match self {
            Dir::East => (i + 1, j),
            Dir::North => (i, j + 1),
            Dir::West => (i - 1, j),
            Dir::South => (i, j - 1),
        }
    }
}

type GridVertex = (usize, usize);
type Edge = (GridVertex, Dir);

/// Trace every boundary ring of one component and pair holes with hulls.
fn trace_component(raster: &Raster, labels: &[usize], component: usize) -> Vec<Polygon> {
    let cols = raster.cols();
    let rows = raster.rows();
    let inside = |i: usize, j: usize| labels[j * cols + i] == component;

    // Boundary edges keep the component on their left.
    let mut edges: Vec<Edge> = Vec::new();
    for j in 0..rows {
        for i in 0..cols {
            if !inside(i, j) {
                continue;
            }
            if j == 0 || !inside(i, j - 1) {
                edges.push(((i, j), Dir::East));
            }
            if i + 1 == cols || !inside(i + 1, j) {
                edges.push(((i + 1, j), Dir::North));
            }
            if j + 1 == rows || !inside(i, j + 1) {
                edges.push(((i + 1, j + 1), Dir::West));
            }
            if i == 0 || !inside(i - 1, j) {
                edges.push(((i, j + 1), Dir::South));
            }
        }
    }

    let mut outgoing: HashMap<GridVertex, Vec<Dir>> = HashMap::new();
    for &(v, d) in &edges {
        outgoing.entry(v).or_default().push(d);
    }

    let mut used: HashMap<Edge, bool> = edges.iter().map(|&e| (e, false)).collect();
    let mut hulls: Vec<Vec<Point>> = Vec::new();
    let mut holes: Vec<(Vec<Point>, Edge)> = Vec::new();

    for &start in &edges {
        if used[&start] {
            continue;
        }
        let mut ring_edges = Vec::new();
        let mut edge = start;
        loop {
            used.insert(edge, true);
            ring_edges.push(edge);
            let (v, d) = edge;
            let next_vertex = d.step(v);
            // Prefer turning left so corner-touching pieces split apart.
            let choices = outgoing.get(&next_vertex);
            let next_dir = [d.left(), d, d.right()]
                .into_iter()
                .find(|c| choices.is_some_and(|dirs| dirs.contains(c)));
            match next_dir {
                Some(nd) if (next_vertex, nd) != start => edge = (next_vertex, nd),
                _ => break,
            }
            if ring_edges.len() > edges.len() {
                log::warn!("boundary trace did not close; dropping ring");
                ring_edges.clear();
                break;
            }
        }
        if ring_edges.is_empty() {
            continue;
        }

        let ring = simplify_ring(raster, &ring_edges);
        if signed_area2(&ring) > 0 {
            hulls.push(ring);
        } else {
            holes.push((ring, start));
        }
    }

    let mut polygons: Vec<Polygon> = hulls.into_iter().map(Polygon::new).collect();
    for (hole, (v, d)) in holes {
        let target = if polygons.len() == 1 {
            0
        } else {
            let probe = cell_left_of(v, d);
            let center2 = (
                raster.xs[probe.0] + raster.xs[probe.0 + 1],
                raster.ys[probe.1] + raster.ys[probe.1 + 1],
            );
            polygons
                .iter()
                .position(|p| ring_contains2(&p.hull, center2))
                .unwrap_or(0)
        };
        if let Some(polygon) = polygons.get_mut(target) {
            polygon.holes.push(hole);
        }
    }
    polygons
}

/// Corner points of a traced ring, starting at its smallest point.
fn simplify_ring(raster: &Raster, ring_edges: &[Edge]) -> Vec<Point> {
    let n = ring_edges.len();
    let mut points: Vec<Point> = (0..n)
        .filter(|&k| ring_edges[(k + n - 1) % n].1 != ring_edges[k].1)
        .map(|k| {
            let (i, j) = ring_edges[k].0;
            Point::new(raster.xs[i], raster.ys[j])
        })
        .collect();
    if let Some(min_at) = points
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| **p)
        .map(|(k, _)| k)
    {
        points.rotate_left(min_at);
    }
    points
}

/// Grid cell lying on the left of a directed boundary edge.
fn cell_left_of((i, j): GridVertex, d: Dir) -> (usize, usize) {
    match d {
        Dir::East => (i, j),
        Dir::North => (i - 1, j),
        Dir::West => (i - 1, j - 1),
        Dir::South => (i, j - 1),
    }
}

/// Even-odd containment of a doubled-coordinate point in a rectilinear ring.
fn ring_contains2(ring: &[Point], (px2, py2): (Coord, Coord)) -> bool {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .filter(|(a, b)| a.x == b.x)
        .filter(|(a, b)| {
            let (lo, hi) = (2 * a.y.min(b.y), 2 * a.y.max(b.y));
            lo < py2 && py2 < hi && 2 * a.x > px2
        })
        .count()
        % 2
        == 1
}
