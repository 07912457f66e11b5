//! GDS-II record framing.
//!
//! Every record is `[u16 total length][u16 kind][payload]`, big endian, with
//! the kind's low byte giving the payload data type.

use std::io::{self, Read, Write};

use alignmark_core::Point;

use crate::gds::GdsError;

#[allow(dead_code)]
pub(crate) mod kind {
    pub const HEADER: u16 = 0x0002;
    pub const BGNLIB: u16 = 0x0102;
    pub const LIBNAME: u16 = 0x0206;
    pub const UNITS: u16 = 0x0305;
    pub const ENDLIB: u16 = 0x0400;
    pub const BGNSTR: u16 = 0x0502;
    pub const STRNAME: u16 = 0x0606;
    pub const ENDSTR: u16 = 0x0700;
    pub const BOUNDARY: u16 = 0x0800;
    pub const PATH: u16 = 0x0900;
    pub const SREF: u16 = 0x0A00;
    pub const AREF: u16 = 0x0B00;
    pub const TEXT: u16 = 0x0C00;
    pub const LAYER: u16 = 0x0D02;
    pub const DATATYPE: u16 = 0x0E02;
    pub const XY: u16 = 0x1003;
    pub const ENDEL: u16 = 0x1100;
    pub const SNAME: u16 = 0x1206;
    pub const NODE: u16 = 0x1500;
    pub const STRANS: u16 = 0x1A01;
    pub const BOX: u16 = 0x2D00;
    pub const BOXTYPE: u16 = 0x2E02;
}

const HEADER_LEN: usize = 4;

/// Largest payload a record can carry.
pub(crate) const MAX_PAYLOAD: usize = u16::MAX as usize - HEADER_LEN;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Record {
    pub kind: u16,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn empty(kind: u16) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    pub fn int16(kind: u16, values: &[i16]) -> Self {
        Self {
            kind,
            payload: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
        }
    }

    pub fn int32(kind: u16, values: &[i32]) -> Self {
        Self {
            kind,
            payload: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
        }
    }

    /// ASCII payload, NUL-padded to an even length.
    pub fn ascii(kind: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        if payload.len() % 2 == 1 {
            payload.push(0);
        }
        Self { kind, payload }
    }

    pub fn real8(kind: u16, values: &[f64]) -> Self {
        Self {
            kind,
            payload: values.iter().flat_map(|v| encode_real8(*v)).collect(),
        }
    }

    /// Size of the record on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), GdsError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(GdsError::InvalidRecord {
                offset: 0,
                message: format!(
                    "record 0x{:04X} payload of {} bytes exceeds {}",
                    self.kind,
                    self.payload.len(),
                    MAX_PAYLOAD
                ),
            });
        }
        out.write_all(&(self.encoded_len() as u16).to_be_bytes())?;
        out.write_all(&self.kind.to_be_bytes())?;
        out.write_all(&self.payload)?;
        Ok(())
    }

    /// Read the next record, or `None` at a clean end of stream.
    ///
    /// `offset` is only used to label errors.
    pub fn read_from<R: Read>(input: &mut R, offset: u64) -> Result<Option<Self>, GdsError> {
        let mut header = [0u8; HEADER_LEN];
        match input.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let total = u16::from_be_bytes([header[0], header[1]]) as usize;
        if total < HEADER_LEN || total % 2 == 1 {
            return Err(GdsError::InvalidRecord {
                offset,
                message: format!("bad record length {}", total),
            });
        }

        let mut payload = vec![0u8; total - HEADER_LEN];
        input.read_exact(&mut payload).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => GdsError::InvalidRecord {
                offset,
                message: "stream ends inside a record".into(),
            },
            _ => e.into(),
        })?;

        Ok(Some(Self {
            kind: u16::from_be_bytes([header[2], header[3]]),
            payload,
        }))
    }

    pub fn int16s(&self) -> Vec<i16> {
        self.payload
            .chunks_exact(2)
            .map(|b| i16::from_be_bytes([b[0], b[1]]))
            .collect()
    }

    pub fn int32s(&self) -> Vec<i32> {
        self.payload
            .chunks_exact(4)
            .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    pub fn reals(&self) -> Vec<f64> {
        self.payload
            .chunks_exact(8)
            .map(|b| {
                let mut word = [0u8; 8];
                word.copy_from_slice(b);
                decode_real8(word)
            })
            .collect()
    }

    /// ASCII payload without trailing NUL padding.
    pub fn text(&self) -> String {
        let end = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }

    /// First 16-bit value reinterpreted as unsigned (layer and datatype numbers).
    pub fn first_u16(&self) -> u16 {
        self.int16s().first().map_or(0, |&v| v as u16)
    }

    pub fn points(&self) -> Vec<Point> {
        self.int32s()
            .chunks_exact(2)
            .map(|xy| Point::new(i64::from(xy[0]), i64::from(xy[1])))
            .collect()
    }
}

/// Decode an excess-64, base-16 GDS-II real.
pub(crate) fn decode_real8(word: [u8; 8]) -> f64 {
    let mut bits = word;
    let head = bits[0];
    bits[0] = 0;
    let mantissa = u64::from_be_bytes(bits);
    if mantissa == 0 {
        return 0.0;
    }
    // value = mantissa / 2^56 * 16^(e - 64) = mantissa * 16^(e - 78)
    let exponent = i32::from(head & 0x7F) - 78;
    let magnitude = mantissa as f64 * 16f64.powi(exponent);
    if head & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Encode an f64 as an excess-64, base-16 GDS-II real.
pub(crate) fn encode_real8(value: f64) -> [u8; 8] {
    if value == 0.0 || !value.is_finite() {
        return [0; 8];
    }

    let mut exponent: i32 = 64;
    let mut fraction = value.abs();
    while fraction >= 1.0 {
        fraction /= 16.0;
        exponent += 1;
    }
    while fraction < 1.0 / 16.0 {
        fraction *= 16.0;
        exponent -= 1;
    }

    let mut mantissa = (fraction * 2f64.powi(56)).round() as u64;
    if mantissa >= 1 << 56 {
        // Rounding carried into a new hex digit
        mantissa >>= 4;
        exponent += 1;
    }

    let mut word = mantissa.to_be_bytes();
    let sign = if value < 0.0 { 0x80 } else { 0x00 };
    word[0] = sign | exponent.clamp(0, 0x7F) as u8;
    word
}
