use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::fs::ScratchFs;
use crate::node::{self, Node, NONE};
use crate::point_log::PointLog;
use crate::util::CountingWriter;

/// An append-only on-disk stream of node records, plus a running byte
/// offset identifying where the next record will begin.
pub struct NodeLog {
    writer: BufWriter<File>,
    dims: usize,
    max_data_len: usize,
    offset: u64,
}

impl NodeLog {
    pub fn create<P: AsRef<Path>>(path: P, dims: usize, max_data_len: usize) -> Result<NodeLog> {
        let fh = File::create(path)?;
        Ok(NodeLog {
            writer: BufWriter::new(fh),
            dims,
            max_data_len,
            offset: 0,
        })
    }

    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Appends a node record and returns the byte offset it was written
    /// at (the log's running offset before the write).
    pub fn add(&mut self, n: &Node) -> Result<i64> {
        let offset = self.offset as i64;

        if n.point.pos.len() != self.dims {
            return Err(crate::error::Error::Shape(format!(
                "point has wrong dimension: {}, expected {}",
                n.point.pos.len(),
                self.dims
            )));
        }

        let mut meter = CountingWriter::new(&mut self.writer);
        n.serialize(&mut meter, self.max_data_len)?;
        self.offset += meter.amount;
        Ok(offset)
    }

    /// Recursively builds a subtree from `log` by estimating a median
    /// along `dim`, splitting the log around it, recursing into the two
    /// halves at the next cyclic dimension, and finally appending the
    /// pivot node--left offset, right offset--to this log.
    ///
    /// Because children are always written before their parent, the
    /// node this call appends has the largest offset seen so far: this
    /// post-order emission is what makes the reverser's single pass
    /// sufficient to produce a randomly-accessible, root-first file.
    ///
    /// `log` is guaranteed closed (and, if it was marked
    /// `delete_on_close`, removed) by the time this returns, on every
    /// exit path.
    pub fn build(&mut self, fs: &ScratchFs, log: PointLog, dim: usize) -> Result<i64> {
        // Guarantees `log` is closed (and, if marked `delete_on_close`,
        // removed) on every exit path--including the early return below
        // and any `?` propagation--without relying on a borrow that
        // would otherwise have to span the whole function body.
        struct AutoClose(Option<PointLog>);
        impl Drop for AutoClose {
            fn drop(&mut self) {
                if let Some(mut log) = self.0.take() {
                    let _ = log.close_no_del();
                    if log.delete_on_close() {
                        let _ = log.del();
                    }
                }
            }
        }

        let mut guard = AutoClose(Some(log));
        let log = guard.0.as_mut().expect("log present for the guard's lifetime");

        if log.is_empty() {
            return Ok(NONE);
        }

        let median = log.median_estimate(dim)?;
        tracing::debug!(dim, count = log.len(), "building subtree");

        let next_dim = (dim + 1) % log.dims();
        let (left, right) = log.split(fs, &median, dim, true)?;

        // `right` isn't consumed until after `left`'s subtree is built, so
        // it needs the same guard: if building `left` fails, `right` would
        // otherwise be dropped with its temp file still on disk.
        let mut right_guard = AutoClose(Some(right));

        let left_offset = self.build(fs, left, next_dim)?;

        let right = right_guard
            .0
            .take()
            .expect("right present until build consumes it");
        let right_offset = self.build(fs, right, next_dim)?;

        self.add(&Node {
            point: median,
            dim: dim as u32,
            left: left_offset,
            right: right_offset,
        })
    }
}

pub fn record_size(d: usize, max_data_len: usize) -> usize {
    node::record_size(d, max_data_len)
}
