use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Serialization version. Readers reject any other value in the leading
/// byte of a point record.
const VERSION: u8 = 0;

/// A point in d-dimensional space plus an opaque payload.
///
/// Points are values: two points are equal iff their coordinates are
/// bitwise equal and their payloads are byte-equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub pos: Vec<f64>,
    pub data: Vec<u8>,
}

impl Point {
    pub fn new(pos: Vec<f64>, data: Vec<u8>) -> Self {
        Point { pos, data }
    }

    pub fn distance_squared(&self, other: &Point) -> f64 {
        self.pos
            .iter()
            .zip(other.pos.iter())
            .map(|(a, b)| {
                let delta = a - b;
                delta * delta
            })
            .sum()
    }

    /// Writes the fixed-size point record: version byte, three big-endian
    /// u32 lengths (`pos_len`, `data_len`, `padding_len`), `pos_len`
    /// big-endian f64s, `data_len` payload bytes, then `padding_len` zero
    /// bytes. `padding_len = max_data_len - data.len()`, so every record
    /// for a given `(d, max_data_len)` is exactly `13 + 8*d + max_data_len`
    /// bytes.
    pub fn serialize<W: Write>(&self, w: &mut W, max_data_len: usize) -> Result<()> {
        if self.data.len() > max_data_len {
            return Err(Error::Shape(format!(
                "data length ({}) greater than max data length ({})",
                self.data.len(),
                max_data_len
            )));
        }

        w.write_u8(VERSION)?;

        let pos_len = self.pos.len() as u32;
        w.write_u32::<BigEndian>(pos_len)?;

        let data_len = self.data.len() as u32;
        w.write_u32::<BigEndian>(data_len)?;

        let padding_len = (max_data_len - self.data.len()) as u32;
        w.write_u32::<BigEndian>(padding_len)?;

        for v in &self.pos {
            w.write_f64::<BigEndian>(*v)?;
        }

        w.write_all(&self.data)?;
        w.write_all(&vec![0u8; padding_len as usize])?;

        Ok(())
    }

    /// Reads one point record, returning the point and the record's
    /// `max_data_len` (`data_len + padding_len`) so a caller driving a
    /// stream of records can detect heterogeneous `max_data_len` values.
    ///
    /// EOF at the very first byte is propagated as `Error::Io` wrapping
    /// an `io::ErrorKind::UnexpectedEof` / `io::Error` from the failed
    /// read so that callers who intentionally drive a stream to
    /// exhaustion can match on it.
    pub fn parse_with_max_data_len<R: Read>(r: &mut R) -> Result<(Point, usize)> {
        let version = r.read_u8()?;
        if version != VERSION {
            return Err(Error::Format(format!(
                "invalid serialization version: {}",
                version
            )));
        }

        let pos_len = r.read_u32::<BigEndian>()?;
        let data_len = r.read_u32::<BigEndian>()?;
        let padding_len = r.read_u32::<BigEndian>()?;

        let mut pos = Vec::with_capacity(pos_len as usize);
        for _ in 0..pos_len {
            pos.push(r.read_f64::<BigEndian>()?);
        }

        let mut data = vec![0u8; data_len as usize];
        r.read_exact(&mut data)?;

        io::copy(&mut r.by_ref().take(padding_len as u64), &mut io::sink())?;

        Ok((Point::new(pos, data), (data_len + padding_len) as usize))
    }

    pub fn parse<R: Read>(r: &mut R) -> Result<Point> {
        Self::parse_with_max_data_len(r).map(|(p, _)| p)
    }
}

/// Byte length of a point record for the given dimension and max payload
/// length: the 1-byte version tag, three 4-byte length fields, `d` 8-byte
/// floats, and `max_data_len` bytes of payload + padding.
pub fn record_size(d: usize, max_data_len: usize) -> usize {
    13 + 8 * d + max_data_len
}
