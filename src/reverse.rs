use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::node::{Node, NONE};
use crate::util::CountingReader;

/// Rewrites a post-order node log into a root-first file.
///
/// The builder (`NodeLog::build`) emits nodes post-order: every child is
/// written before its parent, so the root ends up last. This pass
/// streams the input once, sequentially, and for each record seeks the
/// output to its mirrored position: a node originally at offset `o` in
/// an input of length `L` (with fixed record size `n`) lands at
/// `L - n - o` in the output. Any non-sentinel child offset is rewritten
/// by the same rule before the node is written to its new position;
/// sentinel `-1` children are left untouched. The result: the root (the
/// last record in, at offset `L - n`) lands at offset 0, and every
/// parent-to-child pointer is still a valid offset into the new file.
///
/// Rejects a heterogeneous input (records disagreeing on `max_data_len`)
/// and one whose length isn't a whole multiple of the record size. An
/// empty input produces an empty output file.
pub fn reverse_tree<P: AsRef<Path>, Q: AsRef<Path>>(old_path: P, new_path: Q) -> Result<()> {
    let mut fh = File::open(old_path.as_ref())?;
    let filelen = fh.seek(SeekFrom::End(0))?;

    if filelen == 0 {
        File::create(new_path.as_ref())?;
        return Ok(());
    }

    fh.seek(SeekFrom::Start(0))?;
    let mut source = CountingReader::new(BufReader::new(fh));

    let mut dest = File::create(new_path.as_ref())?;

    let mut nodelen: i64 = -1;
    let mut max_data_len: Option<usize> = None;

    let mut node_idx: i64 = 0;
    loop {
        let pos_before = source.pos;
        let (mut node, node_max_data_len) = match Node::parse_with_max_data_len(&mut source) {
            Ok(v) => v,
            // A read failure that consumed zero bytes is a clean
            // end-of-stream at a record boundary. Anything that
            // consumed bytes before failing is a truncated record and
            // must propagate as a real error, not be mistaken for
            // having finished.
            Err(Error::Io(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof && source.pos == pos_before =>
            {
                break
            }
            Err(e) => return Err(e),
        };

        match max_data_len {
            None => max_data_len = Some(node_max_data_len),
            Some(expected) if expected != node_max_data_len => {
                return Err(Error::Format("disparate max data len".to_string()));
            }
            _ => {}
        }

        if nodelen == -1 {
            nodelen = source.pos as i64;
            if filelen % nodelen as u64 != 0 {
                return Err(Error::Format("invalid tree file".to_string()));
            }
        }

        let target = filelen as i64 - nodelen * (1 + node_idx);
        dest.seek(SeekFrom::Start(target as u64))?;

        if node.left != NONE {
            node.left = filelen as i64 - nodelen - node.left;
        }
        if node.right != NONE {
            node.right = filelen as i64 - nodelen - node.right;
        }

        node.serialize(&mut dest, max_data_len.unwrap())?;

        node_idx += 1;
    }

    dest.flush()?;
    Ok(())
}
