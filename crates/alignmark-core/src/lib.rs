//! # alignmark core
//!
//! Layout database with a named-cell hierarchy, integer Manhattan geometry,
//! rectilinear region booleans, unit conversion, a dot-matrix text
//! generator and an R-tree for overlap queries.
//!
//! Everything here is deterministic: cell ids derive from names and cells
//! keep their creation order.

pub mod cell;
pub mod database;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod region;
pub mod spatial;
pub mod text;
pub mod units;

pub use cell::{cell_id, Cell, CellId, CellInstance, Shape, Transform};
pub use database::LayoutDatabase;
pub use error::LayoutError;
pub use geometry::{BBox, Coord, Point, Polygon, Rect};
pub use layer::{Layer, LayerId, LayerStack};
pub use region::Region;
pub use spatial::{SpatialEntry, SpatialIndex};
pub use text::TextGenerator;
pub use units::{convert, Length, Unit};
