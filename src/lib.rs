//! An out-of-core k-d tree: a spatial index over points in
//! d-dimensional Euclidean space whose node set is too large to fit in
//! memory and therefore lives on disk.
//!
//! Two operations are supported: [`Tree::create`] builds a tree from a
//! bulk point stream ([`PointLog`]), and [`Tree::nearest`] queries the k
//! nearest neighbours (by squared Euclidean distance) of a probe point.
//! Every query walks the tree by seeking into a single file; the
//! working set in RAM during a query is only the traversal stack plus a
//! k-sized result heap.
//!
//! No concurrent builds or queries on the same tree, no incremental
//! insertion or deletion, no approximate-NN heuristics.

mod error;
mod fs;
mod node;
mod node_log;
mod point;
mod point_log;
mod reverse;
mod tree;
mod util;

pub use error::{Error, Result};
pub use fs::ScratchFs;
pub use node::Node;
pub use point::Point;
pub use point_log::PointLog;
pub use tree::{PointDistance, Tree};
