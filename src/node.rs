use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;
use crate::point::{self, Point};

/// Sentinel child offset meaning "absent".
pub const NONE: i64 = -1;

/// A node in the on-disk tree: a pivot point, the split dimension, and two
/// child byte offsets. `left`/`right` are `NONE` when the corresponding
/// child is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub point: Point,
    pub dim: u32,
    pub left: i64,
    pub right: i64,
}

impl Node {
    /// Point record followed by big-endian `left`, `right`, `dim`.
    pub fn serialize<W: Write>(&self, w: &mut W, max_data_len: usize) -> Result<()> {
        self.point.serialize(w, max_data_len)?;
        w.write_i64::<BigEndian>(self.left)?;
        w.write_i64::<BigEndian>(self.right)?;
        w.write_u32::<BigEndian>(self.dim)?;
        Ok(())
    }

    pub fn parse<R: Read>(r: &mut R) -> Result<Node> {
        Self::parse_with_max_data_len(r).map(|(n, _)| n)
    }

    pub fn parse_with_max_data_len<R: Read>(r: &mut R) -> Result<(Node, usize)> {
        let (point, max_data_len) = Point::parse_with_max_data_len(r)?;
        let left = r.read_i64::<BigEndian>()?;
        let right = r.read_i64::<BigEndian>()?;
        let dim = r.read_u32::<BigEndian>()?;
        Ok((
            Node {
                point,
                dim,
                left,
                right,
            },
            max_data_len,
        ))
    }
}

/// Byte length of a node record: the point record plus 20 bytes (two
/// 8-byte child offsets, one 4-byte dimension).
pub fn record_size(d: usize, max_data_len: usize) -> usize {
    point::record_size(d, max_data_len) + 20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let node = Node {
            point: Point::new(vec![1.0, 2.0, 3.0], vec![9, 9]),
            dim: 1,
            left: 40,
            right: NONE,
        };
        let mut buf = Vec::new();
        node.serialize(&mut buf, 4).unwrap();
        assert_eq!(buf.len(), record_size(3, 4));
        let parsed = Node::parse(&mut &buf[..]).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn sentinel_children_round_trip() {
        let node = Node {
            point: Point::new(vec![], vec![]),
            dim: 0,
            left: NONE,
            right: NONE,
        };
        let mut buf = Vec::new();
        node.serialize(&mut buf, 0).unwrap();
        let parsed = Node::parse(&mut &buf[..]).unwrap();
        assert_eq!(parsed.left, NONE);
        assert_eq!(parsed.right, NONE);
    }
}
