use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{Error, Result};
use crate::fs::ScratchFs;
use crate::point::Point;

/// Reservoir size used by `MedianEstimate`. Not a runtime-tunable knob--
/// changing it is a recompile, matching the original's fixed constant.
const SAMPLE_SIZE: usize = 100;

/// An append-only on-disk stream of point records, plus an in-memory
/// reservoir sample maintained by algorithm R over the insertion order.
///
/// Lifecycle: created empty, appended-to, then either split (consuming
/// it) or closed. Once `split` has consumed a log it is unusable.
pub struct PointLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    dims: usize,
    max_data_len: usize,
    count: u64,
    reservoir: Vec<Point>,
    delete_on_close: bool,
    deleted: bool,
}

impl PointLog {
    pub fn create<P: AsRef<Path>>(
        path: P,
        dims: usize,
        max_data_len: usize,
        delete_on_close: bool,
    ) -> Result<PointLog> {
        let path = path.as_ref().to_path_buf();
        let fh = File::create(&path)?;
        Ok(PointLog {
            path,
            writer: Some(BufWriter::new(fh)),
            dims,
            max_data_len,
            count: 0,
            reservoir: Vec::with_capacity(SAMPLE_SIZE),
            delete_on_close,
            deleted: false,
        })
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn max_data_len(&self) -> usize {
        self.max_data_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a point, validating its dimensionality, and updates the
    /// reservoir sample by algorithm R: while the reservoir has fewer
    /// than `SAMPLE_SIZE` elements, append unconditionally; once full,
    /// draw a uniform index in `[0, count)` and overwrite that slot if
    /// it falls within the reservoir.
    pub fn add(&mut self, p: &Point) -> Result<()> {
        if p.pos.len() != self.dims {
            return Err(Error::Shape(format!(
                "point has wrong dimension: {}, expected {}",
                p.pos.len(),
                self.dims
            )));
        }
        let writer = self
            .writer
            .as_mut()
            .expect("add called on a closed PointLog");
        p.serialize(writer, self.max_data_len)?;
        self.count += 1;

        if self.reservoir.len() < SAMPLE_SIZE {
            self.reservoir.push(p.clone());
        } else {
            let pos = rand::thread_rng().gen_range(0..self.count);
            if (pos as usize) < self.reservoir.len() {
                self.reservoir[pos as usize] = p.clone();
            }
        }
        Ok(())
    }

    /// Returns the element at index `reservoir.len() / 2` of the
    /// reservoir after a stable sort by `pos[dim]`. Fails with
    /// `Error::Usage` on an empty reservoir--unreachable when the
    /// caller only invokes this after `count > 0`, per spec.
    pub fn median_estimate(&self, dim: usize) -> Result<Point> {
        if self.reservoir.is_empty() {
            return Err(Error::Usage("no points in reservoir".to_string()));
        }
        let mut sample = self.reservoir.clone();
        sample.sort_by(|a, b| a.pos[dim].partial_cmp(&b.pos[dim]).unwrap());
        Ok(sample[sample.len() / 2].clone())
    }

    pub(crate) fn close_no_del(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        self.reservoir.clear();
        Ok(())
    }

    pub(crate) fn del(&mut self) -> Result<()> {
        if !self.deleted {
            self.deleted = true;
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub(crate) fn delete_on_close(&self) -> bool {
        self.delete_on_close
    }

    /// Flushes and releases the file handle, and--if this log was
    /// created with `delete_on_close`--removes the backing file.
    /// Idempotent: closing twice is a no-op the second time.
    pub fn close(mut self) -> Result<()> {
        self.close_no_del()?;
        if self.delete_on_close {
            self.del()?;
        }
        Ok(())
    }

    /// Streaming two-way partition around `median` along `dim`.
    ///
    /// Closes this log for writing, reopens its backing file for
    /// reading, and creates two fresh logs in `fs`. Iterates exactly
    /// `count` records: the first record equal to `median` is consumed
    /// and dropped (it becomes the parent node); every subsequent
    /// record goes to `left` if `pos[dim] <= median.pos[dim]`, else to
    /// `right`. On any I/O failure both new logs are closed and deleted
    /// before the error is returned. This log's own backing file is
    /// removed at the end if it was marked `delete_on_close` when
    /// created, regardless of success or failure--mirroring the
    /// "guaranteed closed" contract on the builder's input log.
    pub fn split(
        &mut self,
        fs: &ScratchFs,
        median: &Point,
        dim: usize,
        delete_on_close: bool,
    ) -> Result<(PointLog, PointLog)> {
        // However `split_inner` returns, this log is closed and--if it
        // was marked `delete_on_close`--deleted, mirroring the
        // deferred close in the original implementation.
        let result = self.split_inner(fs, median, dim, delete_on_close);
        let _ = self.close_no_del();
        if self.delete_on_close {
            let _ = self.del();
        }
        result
    }

    fn split_inner(
        &mut self,
        fs: &ScratchFs,
        median: &Point,
        dim: usize,
        delete_on_close: bool,
    ) -> Result<(PointLog, PointLog)> {
        tracing::debug!(dim, count = self.count, "splitting point log");

        self.close_no_del()?;

        let fh = File::open(&self.path)?;
        let mut reader = BufReader::new(fh);

        let mut left =
            PointLog::create(fs.temp()?, self.dims, self.max_data_len, delete_on_close)?;
        let mut right =
            match PointLog::create(fs.temp()?, self.dims, self.max_data_len, delete_on_close) {
                Ok(right) => right,
                Err(e) => {
                    let _ = left.close_no_del();
                    let _ = left.del();
                    return Err(e);
                }
            };

        let close_up = |left: &mut PointLog, right: &mut PointLog| {
            let _ = left.close_no_del();
            let _ = left.del();
            let _ = right.close_no_del();
            let _ = right.del();
        };

        let mut found_median = false;
        for _ in 0..self.count {
            let p = match Point::parse(&mut reader) {
                Ok(p) => p,
                Err(e) => {
                    close_up(&mut left, &mut right);
                    return Err(e);
                }
            };
            if !found_median && median_eq(median, &p) {
                found_median = true;
                continue;
            }
            let result = if p.pos[dim] <= median.pos[dim] {
                left.add(&p)
            } else {
                right.add(&p)
            };
            if let Err(e) = result {
                close_up(&mut left, &mut right);
                return Err(e);
            }
        }

        Ok((left, right))
    }
}

fn median_eq(a: &Point, b: &Point) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, ScratchFs) {
        let dir = tempfile::tempdir().unwrap();
        let fs = ScratchFs::new(dir.path().join("scratch")).unwrap();
        (dir, fs)
    }

    #[test]
    fn add_rejects_wrong_dimension() {
        let (_dir, fs) = scratch();
        let mut log = PointLog::create(fs.temp().unwrap(), 2, 0, true).unwrap();
        let err = log.add(&Point::new(vec![1.0, 2.0, 3.0], vec![])).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn reservoir_grows_then_samples() {
        let (_dir, fs) = scratch();
        let mut log = PointLog::create(fs.temp().unwrap(), 1, 0, true).unwrap();
        for i in 0..250 {
            log.add(&Point::new(vec![i as f64], vec![])).unwrap();
        }
        assert_eq!(log.len(), 250);
        assert_eq!(log.reservoir.len(), SAMPLE_SIZE);
    }

    #[test]
    fn median_estimate_on_empty_reservoir_fails() {
        let (_dir, fs) = scratch();
        let log = PointLog::create(fs.temp().unwrap(), 1, 0, true).unwrap();
        let err = log.median_estimate(0).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn split_drops_one_median_and_partitions_by_le() {
        let (_dir, fs) = scratch();
        let mut log = PointLog::create(fs.temp().unwrap(), 1, 0, true).unwrap();
        for v in [1.0, 2.0, 2.0, 3.0, 4.0] {
            log.add(&Point::new(vec![v], vec![])).unwrap();
        }
        let median = Point::new(vec![2.0], vec![]);
        let (mut left, mut right) = log.split(&fs, &median, 0, true).unwrap();
        // one of the two `2.0`s is consumed as the pivot; the other goes left.
        assert_eq!(left.len() + right.len(), 4);
        assert_eq!(left.len(), 2); // 1.0, 2.0
        assert_eq!(right.len(), 2); // 3.0, 4.0
        left.close().unwrap();
        right.close().unwrap();
    }

    #[test]
    fn split_with_all_points_equal_to_median_empties_right() {
        let (_dir, fs) = scratch();
        let mut log = PointLog::create(fs.temp().unwrap(), 1, 0, true).unwrap();
        for _ in 0..5 {
            log.add(&Point::new(vec![7.0], vec![])).unwrap();
        }
        let median = Point::new(vec![7.0], vec![]);
        let (mut left, mut right) = log.split(&fs, &median, 0, true).unwrap();
        assert_eq!(left.len(), 4);
        assert_eq!(right.len(), 0);
        left.close().unwrap();
        right.close().unwrap();
    }
}
