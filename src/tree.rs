use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::ScratchFs;
use crate::node::{self, Node, NONE};
use crate::node_log::NodeLog;
use crate::point::Point;
use crate::point_log::PointLog;
use crate::reverse::reverse_tree;

/// A point paired with its squared distance from the probe that found
/// it. Ordered by distance so it can sit directly in the bounded
/// max-heap `Tree::nearest` uses during traversal.
#[derive(Debug, Clone)]
pub struct PointDistance {
    pub point: Point,
    pub distance: f64,
}

impl PartialEq for PointDistance {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}
impl Eq for PointDistance {}

impl PartialOrd for PointDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PointDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// A handle to a finalized, immutable tree file.
///
/// The root is always at offset 0. Holds one shared file handle with an
/// implicit seek position: `nearest` is therefore not safe to call
/// concurrently on the same `Tree`--the `&mut self` receiver makes that
/// a compile-time guarantee rather than only a documented one.
pub struct Tree {
    #[allow(dead_code)]
    path: PathBuf,
    fh: File,
    nodelen: usize,
    root: i64,
    count: u64,
}

impl Tree {
    /// Builds a tree from `log` by recursively splitting it into a
    /// temporary, post-order node log inside a fresh scratch directory
    /// under `scratch_dir`, reversing that log into `target_path`, then
    /// deleting the scratch directory and opening the result.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        scratch_dir: P,
        target_path: Q,
        log: PointLog,
    ) -> Result<Tree> {
        // Guarantees the scratch directory (and any temp logs left under
        // it by a `build` that errored partway through) is removed on
        // every exit path, not just the success path.
        struct ScratchGuard(Option<ScratchFs>);
        impl Drop for ScratchGuard {
            fn drop(&mut self) {
                if let Some(fs) = self.0.take() {
                    let _ = fs.delete();
                }
            }
        }

        let dims = log.dims();
        let max_data_len = log.max_data_len();

        let scratch = ScratchGuard(Some(ScratchFs::new(scratch_dir.as_ref())?));
        let fs = scratch.0.as_ref().expect("scratch present for the guard's lifetime");
        let build_path = fs.temp()?;

        let mut nlog = NodeLog::create(&build_path, dims, max_data_len)?;
        nlog.build(fs, log, 0)?;
        nlog.close()?;

        tracing::info!(target_path = %target_path.as_ref().display(), "reversing build output into final tree file");
        reverse_tree(&build_path, target_path.as_ref())?;

        drop(scratch);

        Tree::open(target_path.as_ref())
    }

    /// Opens an existing tree file. An empty file is a valid, empty
    /// tree. Otherwise the first record's shape determines `nodelen`,
    /// and the file length must be a whole multiple of it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Tree> {
        let path = path.as_ref().to_path_buf();
        let mut fh = File::open(&path)?;
        let filelen = fh.seek(SeekFrom::End(0))?;

        if filelen == 0 {
            tracing::info!(path = %path.display(), "opened empty tree");
            return Ok(Tree {
                path,
                fh,
                nodelen: 0,
                root: NONE,
                count: 0,
            });
        }

        fh.seek(SeekFrom::Start(0))?;
        let (first, max_data_len) = Node::parse_with_max_data_len(&mut fh)?;
        let nodelen = node::record_size(first.point.pos.len(), max_data_len) as u64;

        if filelen % nodelen != 0 {
            return Err(Error::Format("invalid tree file".to_string()));
        }

        let count = filelen / nodelen;
        tracing::info!(path = %path.display(), count, "opened tree");

        Ok(Tree {
            path,
            fh,
            nodelen: nodelen as usize,
            root: 0,
            count,
        })
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn close(self) -> Result<()> {
        Ok(())
    }

    fn node(&mut self, offset: i64) -> Result<Node> {
        self.fh.seek(SeekFrom::Start(offset as u64))?;
        let mut buf = vec![0u8; self.nodelen];
        self.fh.read_exact(&mut buf)?;
        Node::parse(&mut &buf[..])
    }

    /// Returns up to `k` nearest neighbours by squared Euclidean
    /// distance in ascending order.
    pub fn nearest(&mut self, p: &Point, k: usize) -> Result<Vec<PointDistance>> {
        if k == 0 || self.root == NONE {
            return Ok(Vec::new());
        }
        let mut heap: BinaryHeap<PointDistance> = BinaryHeap::with_capacity(k);
        let root = self.root;
        self.search(root, p, k, &mut heap)?;
        Ok(heap.into_sorted_vec())
    }

    fn search(
        &mut self,
        node_offset: i64,
        p: &Point,
        k: usize,
        heap: &mut BinaryHeap<PointDistance>,
    ) -> Result<()> {
        if node_offset == NONE {
            return Ok(());
        }

        let node = self.node(node_offset)?;

        let c = p.pos[node.dim as usize] - node.point.pos[node.dim as usize];
        let dist = p.distance_squared(&node.point);

        if heap.len() < k {
            heap.push(PointDistance {
                point: node.point.clone(),
                distance: dist,
            });
        } else if dist < heap.peek().expect("heap at capacity is non-empty").distance {
            heap.pop();
            heap.push(PointDistance {
                point: node.point.clone(),
                distance: dist,
            });
        }

        let (near, far) = if c <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search(near, p, k, heap)?;

        let explore_far = heap.len() < k
            || c * c <= heap.peek().expect("heap at capacity is non-empty").distance;
        if explore_far {
            self.search(far, p, k, heap)?;
        }

        Ok(())
    }
}
