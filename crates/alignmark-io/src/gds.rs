//! GDS-II stream writer and reader.
//!
//! Only the subset alignmark produces is handled: BOUNDARY polygons, BOX
//! records and SREF instances. TEXT, PATH, NODE and AREF elements are skipped
//! on read.
//!
//! Stream layout: HEADER → BGNLIB → LIBNAME → UNITS → (BGNSTR … ENDSTR)* → ENDLIB

use std::io::{self, Read, Write};

use thiserror::Error;

use alignmark_core::geometry::{Point, Polygon};
use alignmark_core::{cell_id, Cell, CellInstance, LayoutDatabase, LayoutError, Region, Transform};

use crate::record::{kind, Record};

/// Stream version written in the HEADER record.
const GDS_VERSION: i16 = 600;

/// Modification/access time written to BGNLIB and BGNSTR.
///
/// Fixed so the same layout always serializes to the same bytes.
const FIXED_TIMESTAMP: [i16; 12] = [2025, 1, 1, 0, 0, 0, 2025, 1, 1, 0, 0, 0];

/// Largest open ring a single BOUNDARY can carry (8191 XY pairs incl. closing point).
pub const MAX_BOUNDARY_POINTS: usize = 8190;

#[derive(Error, Debug)]
pub enum GdsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid GDS-II record at offset {offset}: {message}")]
    InvalidRecord { offset: u64, message: String },

    #[error("Unexpected record 0x{record_type:04X} where 0x{expected:04X} was required")]
    UnexpectedRecord { record_type: u16, expected: u16 },

    #[error("Coordinate {0} does not fit in a 32-bit GDS-II coordinate")]
    InvalidCoordinates(i64),

    #[error("Cell '{0}' referenced but not defined")]
    UndefinedCell(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

fn to_gds_coord(value: i64) -> Result<i32, GdsError> {
    i32::try_from(value).map_err(|_| GdsError::InvalidCoordinates(value))
}

/// XY payload for a ring, closed by repeating its first point.
fn closed_ring_xy(ring: &[Point]) -> Result<Vec<i32>, GdsError> {
    let mut xy = Vec::with_capacity(2 * ring.len() + 2);
    for p in ring.iter().chain(ring.first()) {
        xy.push(to_gds_coord(p.x)?);
        xy.push(to_gds_coord(p.y)?);
    }
    Ok(xy)
}

// ── Writer ───────────────────────────────────────────────────────────

/// Serializes a [`LayoutDatabase`] as a GDS-II stream.
pub struct GdsWriter<W: Write> {
    out: W,
}

impl<W: Write> GdsWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, record: Record) -> Result<(), GdsError> {
        record.write_to(&mut self.out)
    }

    /// Write the records of one element followed by ENDEL.
    fn element<const N: usize>(&mut self, records: [Record; N]) -> Result<(), GdsError> {
        for record in records {
            self.emit(record)?;
        }
        self.emit(Record::empty(kind::ENDEL))
    }

    pub fn write(&mut self, db: &LayoutDatabase) -> Result<(), GdsError> {
        self.emit(Record::int16(kind::HEADER, &[GDS_VERSION]))?;
        self.emit(Record::int16(kind::BGNLIB, &FIXED_TIMESTAMP))?;
        self.emit(Record::ascii(kind::LIBNAME, &db.name))?;
        // User unit is the micrometer: [dbu in user units, dbu in meters]
        self.emit(Record::real8(kind::UNITS, &[db.dbu_nm * 1e-3, db.dbu_nm * 1e-9]))?;

        for cell in db.all_cells() {
            self.structure(db, cell)?;
        }

        self.emit(Record::empty(kind::ENDLIB))?;
        self.out.flush()?;
        Ok(())
    }

    fn structure(&mut self, db: &LayoutDatabase, cell: &Cell) -> Result<(), GdsError> {
        self.emit(Record::int16(kind::BGNSTR, &FIXED_TIMESTAMP))?;
        self.emit(Record::ascii(kind::STRNAME, &cell.name))?;

        for shape in &cell.shapes {
            let (layer, datatype) = db
                .layer_stack
                .get(shape.layer_id)
                .map(|l| l.gds_pair())
                .unwrap_or((shape.layer_id as u16, 0));
            self.polygon(layer, datatype, &shape.polygon)?;
        }

        for inst in &cell.instances {
            let target = db
                .get_cell(&inst.cell_id)
                .ok_or_else(|| GdsError::UndefinedCell(inst.cell_id.to_string()))?;
            let offset = inst.transform.offset;
            self.element([
                Record::empty(kind::SREF),
                Record::ascii(kind::SNAME, &target.name),
                Record::int32(kind::XY, &[to_gds_coord(offset.x)?, to_gds_coord(offset.y)?]),
            ])?;
        }

        self.emit(Record::empty(kind::ENDSTR))?;
        log::debug!(
            "Wrote structure {} ({} shapes, {} references)",
            cell.name,
            cell.shape_count(),
            cell.instance_count()
        );
        Ok(())
    }

    /// BOUNDARY cannot express holes, so holed or oversized polygons are
    /// written as their rectangle decomposition.
    fn polygon(&mut self, layer: u16, datatype: u16, polygon: &Polygon) -> Result<(), GdsError> {
        if polygon.has_holes() || polygon.hull.len() > MAX_BOUNDARY_POINTS {
            for rect in Region::from(polygon.clone()).to_rects() {
                self.boundary(layer, datatype, &rect.corners())?;
            }
            Ok(())
        } else {
            self.boundary(layer, datatype, &polygon.hull)
        }
    }

    fn boundary(&mut self, layer: u16, datatype: u16, ring: &[Point]) -> Result<(), GdsError> {
        if ring.len() < 3 {
            return Ok(());
        }
        let xy = closed_ring_xy(ring)?;
        self.element([
            Record::empty(kind::BOUNDARY),
            Record::int16(kind::LAYER, &[layer as i16]),
            Record::int16(kind::DATATYPE, &[datatype as i16]),
            Record::int32(kind::XY, &xy),
        ])
    }
}

// ── Reader ───────────────────────────────────────────────────────────

/// Loads a GDS-II stream back into a [`LayoutDatabase`].
///
/// Layers are created per (layer, datatype) pair as `"<layer>/<datatype>"`.
/// The top cell is the first structure no other structure references.
pub struct GdsReader<R: Read> {
    input: R,
    offset: u64,
    /// Structure names seen in SREF records.
    referenced: Vec<String>,
}

impl<R: Read> GdsReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            offset: 0,
            referenced: Vec::new(),
        }
    }

    fn next(&mut self) -> Result<Option<Record>, GdsError> {
        let record = Record::read_from(&mut self.input, self.offset)?;
        if let Some(r) = &record {
            self.offset += r.encoded_len() as u64;
        }
        Ok(record)
    }

    fn require(&mut self) -> Result<Record, GdsError> {
        match self.next()? {
            Some(record) => Ok(record),
            None => Err(GdsError::InvalidRecord {
                offset: self.offset,
                message: "stream ended early".into(),
            }),
        }
    }

    /// Records of the current element up to, not including, ENDEL.
    fn element_body(&mut self) -> Result<Vec<Record>, GdsError> {
        let mut body = Vec::new();
        loop {
            let record = self.require()?;
            if record.kind == kind::ENDEL {
                return Ok(body);
            }
            body.push(record);
        }
    }

    pub fn read(&mut self) -> Result<LayoutDatabase, GdsError> {
        let header = self.require()?;
        if header.kind != kind::HEADER {
            return Err(GdsError::UnexpectedRecord {
                record_type: header.kind,
                expected: kind::HEADER,
            });
        }
        log::debug!("GDS-II stream version {}", header.first_u16());

        let mut db = LayoutDatabase::new("imported");
        while let Some(record) = self.next()? {
            match record.kind {
                kind::LIBNAME => db.name = record.text(),
                kind::UNITS => {
                    let units = record.reals();
                    if let [_, meters, ..] = units.as_slice() {
                        db.dbu_nm = meters * 1e9;
                    }
                }
                kind::BGNSTR => self.structure(&mut db)?,
                kind::ENDLIB => break,
                _ => {}
            }
        }

        if let Some(missing) = self
            .referenced
            .iter()
            .find(|name| db.find_cell_by_name(name.as_str()).is_none())
        {
            return Err(GdsError::UndefinedCell(missing.clone()));
        }
        let top = db
            .all_cells()
            .find(|c| !self.referenced.contains(&c.name))
            .map(|c| c.id);
        db.top_cell = top;

        log::debug!("Read library {} with {} structures", db.name, db.cell_count());
        Ok(db)
    }

    fn structure(&mut self, db: &mut LayoutDatabase) -> Result<(), GdsError> {
        let mut cell = Cell::new("unnamed");
        let mut shapes = Vec::new();

        loop {
            let record = self.require()?;
            match record.kind {
                kind::STRNAME => cell = Cell::new(&record.text()),
                kind::BOUNDARY | kind::BOX => {
                    let body = self.element_body()?;
                    shapes.extend(boundary_from(&body));
                }
                kind::SREF => {
                    let body = self.element_body()?;
                    if let Some((name, at)) = reference_from(&body) {
                        // Ids derive from names, so forward references need no second pass.
                        cell.add_instance(CellInstance::new(
                            cell_id(&name),
                            Transform::translate(at.x, at.y),
                        ));
                        self.referenced.push(name);
                    }
                }
                kind::TEXT | kind::PATH | kind::NODE | kind::AREF => {
                    self.element_body()?;
                    log::debug!("Skipped element 0x{:04X} in {}", record.kind, cell.name);
                }
                kind::ENDSTR => break,
                _ => {}
            }
        }

        for (layer, datatype, polygon) in shapes {
            let layer_id = db.insert_layer(&format!("{}/{}", layer, datatype), layer, datatype);
            cell.add_polygon(layer_id, polygon);
        }
        db.add_cell(cell)?;
        Ok(())
    }
}

/// (layer, datatype, polygon) of a BOUNDARY or BOX body.
fn boundary_from(body: &[Record]) -> Option<(u16, u16, Polygon)> {
    let mut layer = 0;
    let mut datatype = 0;
    let mut ring = Vec::new();
    for record in body {
        match record.kind {
            kind::LAYER => layer = record.first_u16(),
            kind::DATATYPE | kind::BOXTYPE => datatype = record.first_u16(),
            kind::XY => ring = record.points(),
            _ => {}
        }
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    (ring.len() >= 3).then(|| (layer, datatype, Polygon::new(ring)))
}

/// Target name and origin of an SREF body.
fn reference_from(body: &[Record]) -> Option<(String, Point)> {
    let mut name = None;
    let mut at = Point::zero();
    for record in body {
        match record.kind {
            kind::SNAME => name = Some(record.text()),
            kind::XY => at = record.points().first().copied().unwrap_or(at),
            kind::STRANS => log::warn!("Ignoring STRANS on a structure reference"),
            _ => {}
        }
    }
    name.filter(|n| !n.is_empty()).map(|n| (n, at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignmark_core::geometry::Rect;
    use std::io::Cursor;

    fn sample_db() -> LayoutDatabase {
        let mut db = LayoutDatabase::new("test_lib");
        let cross_layer = db.insert_layer("cross", 1, 0);
        let text_layer = db.insert_layer("text", 2, 0);
        let top = db.create_cell("TOP").unwrap();
        let leaf = db.create_cell("CROSS").unwrap();

        db.cell_mut(&leaf)
            .unwrap()
            .add_polygon(cross_layer, Rect::new(-10, -10, 10, 10).into());
        let top_cell = db.cell_mut(&top).unwrap();
        top_cell.add_instance(CellInstance::new(leaf, Transform::translate(0, 0)));
        top_cell.add_instance(CellInstance::new(leaf, Transform::translate(1000, -2000)));
        top_cell.add_polygon(text_layer, Rect::new(0, 0, 5, 7).into());
        db
    }

    fn to_bytes(db: &LayoutDatabase) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        GdsWriter::new(&mut bytes).write(db).unwrap();
        bytes
    }

    fn stream(records: Vec<Record>) -> Cursor<Vec<u8>> {
        let mut bytes = Vec::new();
        for record in records {
            record.write_to(&mut bytes).unwrap();
        }
        Cursor::new(bytes)
    }

    #[test]
    fn test_stream_framing() {
        let bytes = to_bytes(&sample_db());
        // HEADER: length 6, kind 0x0002, version 600
        assert_eq!(&bytes[..6], &[0x00, 0x06, 0x00, 0x02, 0x02, 0x58]);
        assert_eq!(&bytes[bytes.len() - 4..], &[0x00, 0x04, 0x04, 0x00]);
    }

    #[test]
    fn test_units_record() {
        let bytes = to_bytes(&sample_db());
        // HEADER(6) + BGNLIB(28) + LIBNAME(4 + 8) precede UNITS
        let units = &bytes[46..66];
        assert_eq!(&units[..4], &[0x00, 0x14, 0x03, 0x05]);
        let record = Record {
            kind: kind::UNITS,
            payload: units[4..].to_vec(),
        };
        let values = record.reals();
        assert!((values[0] - 1e-3).abs() < 1e-18);
        assert!((values[1] - 1e-9).abs() < 1e-24);
    }

    #[test]
    fn test_output_is_deterministic() {
        assert_eq!(to_bytes(&sample_db()), to_bytes(&sample_db()));
    }

    #[test]
    fn test_write_and_read_back() {
        let db = sample_db();
        let read_db = GdsReader::new(Cursor::new(to_bytes(&db))).read().unwrap();

        assert_eq!(read_db.name, "test_lib");
        assert_eq!(read_db.cell_count(), 2);
        assert!((read_db.dbu_nm - 1.0).abs() < 1e-9);
        assert_eq!(read_db.top_cell, Some(cell_id("TOP")));

        let top = read_db.find_cell_by_name("TOP").unwrap();
        assert_eq!(top.instance_count(), 2);
        assert_eq!(top.instances[1].transform, Transform::translate(1000, -2000));
        assert_eq!(top.instances[1].cell_id, cell_id("CROSS"));
        assert_eq!(top.shape_count(), 1);

        let leaf = read_db.find_cell_by_name("CROSS").unwrap();
        assert_eq!(leaf.shapes[0].polygon, Polygon::from(Rect::new(-10, -10, 10, 10)));
        let layer = read_db.layer_stack.get(leaf.shapes[0].layer_id).unwrap();
        assert_eq!(layer.gds_pair(), (1, 0));
        assert_eq!(layer.name, "1/0");

        assert_eq!(read_db.cell_bbox(&cell_id("TOP")), db.cell_bbox(&cell_id("TOP")));
    }

    #[test]
    fn test_polygon_with_hole_is_split() {
        let mut db = LayoutDatabase::new("holes");
        let layer = db.insert_layer("text", 2, 0);
        let top = db.create_cell("TOP").unwrap();
        let frame: Region = [
            Rect::new(0, 0, 30, 10),
            Rect::new(0, 20, 30, 30),
            Rect::new(0, 0, 10, 30),
            Rect::new(20, 0, 30, 30),
        ]
        .into_iter()
        .collect();
        db.cell_mut(&top).unwrap().insert_region(layer, &frame.merged());

        let read_db = GdsReader::new(Cursor::new(to_bytes(&db))).read().unwrap();
        let cell = read_db.find_cell_by_name("TOP").unwrap();
        // Bottom bar, two side pieces, top bar
        assert_eq!(cell.shape_count(), 4);
        let area: i64 = cell.shapes.iter().map(|s| s.polygon.area()).sum();
        assert_eq!(area, 800);
    }

    #[test]
    fn test_write_rejects_dangling_reference() {
        let mut db = LayoutDatabase::new("bad");
        let top = db.create_cell("TOP").unwrap();
        db.cell_mut(&top)
            .unwrap()
            .add_instance(CellInstance::new(cell_id("MISSING"), Transform::default()));
        let err = GdsWriter::new(Vec::new()).write(&db).unwrap_err();
        assert!(matches!(err, GdsError::UndefinedCell(_)));
    }

    #[test]
    fn test_write_rejects_huge_coordinates() {
        let mut db = LayoutDatabase::new("big");
        let top = db.create_cell("TOP").unwrap();
        db.cell_mut(&top)
            .unwrap()
            .add_polygon(0, Rect::new(0, 0, 1 << 40, 1).into());
        let err = GdsWriter::new(Vec::new()).write(&db).unwrap_err();
        assert!(matches!(err, GdsError::InvalidCoordinates(_)));
    }

    #[test]
    fn test_read_rejects_non_gds() {
        let mut reader = GdsReader::new(Cursor::new(vec![0x00, 0x04, 0x01, 0x02]));
        assert!(matches!(
            reader.read(),
            Err(GdsError::UnexpectedRecord { expected: 0x0002, .. })
        ));
        let mut empty = GdsReader::new(Cursor::new(Vec::new()));
        assert!(matches!(empty.read(), Err(GdsError::InvalidRecord { .. })));
    }

    #[test]
    fn test_read_rejects_undefined_reference() {
        let input = stream(vec![
            Record::int16(kind::HEADER, &[600]),
            Record::int16(kind::BGNSTR, &FIXED_TIMESTAMP),
            Record::ascii(kind::STRNAME, "TOP"),
            Record::empty(kind::SREF),
            Record::ascii(kind::SNAME, "GHOST"),
            Record::int32(kind::XY, &[0, 0]),
            Record::empty(kind::ENDEL),
            Record::empty(kind::ENDSTR),
            Record::empty(kind::ENDLIB),
        ]);
        let err = GdsReader::new(input).read().unwrap_err();
        assert!(matches!(err, GdsError::UndefinedCell(name) if name == "GHOST"));
    }

    #[test]
    fn test_skips_text_elements() {
        let input = stream(vec![
            Record::int16(kind::HEADER, &[600]),
            Record::int16(kind::BGNSTR, &FIXED_TIMESTAMP),
            Record::ascii(kind::STRNAME, "TOP"),
            Record::empty(kind::TEXT),
            Record::int16(kind::LAYER, &[5]),
            Record::int32(kind::XY, &[0, 0]),
            Record::empty(kind::ENDEL),
            Record::empty(kind::ENDSTR),
            Record::empty(kind::ENDLIB),
        ]);
        let db = GdsReader::new(input).read().unwrap();
        assert_eq!(db.find_cell_by_name("TOP").unwrap().shape_count(), 0);
        assert!(db.layer_stack.is_empty());
    }
}
