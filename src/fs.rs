use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::error::Result;

/// A scratch filesystem: a base directory holding a `tmp/` subdirectory
/// for anonymous temporaries and a `named/` subdirectory for stable,
/// caller-named paths.
///
/// `Temp()` generates collision-free names from 128 random bits,
/// hex-encoded, retrying on the (astronomically unlikely) chance the
/// path already exists. `Delete()` removes the whole subtree; it is the
/// caller's responsibility to ensure nothing still holds an open handle
/// into it.
pub struct ScratchFs {
    base: PathBuf,
}

impl ScratchFs {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<ScratchFs> {
        let base = path.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        fs::create_dir_all(base.join("tmp"))?;
        fs::create_dir_all(base.join("named"))?;
        Ok(ScratchFs { base })
    }

    /// A stable, named path under the scratch directory. Does not create
    /// anything; the caller opens/creates the file itself.
    pub fn path(&self, name: &str) -> PathBuf {
        self.base.join("named").join(name)
    }

    /// A fresh, unused path under the scratch directory's `tmp/`
    /// subdirectory.
    pub fn temp(&self) -> Result<PathBuf> {
        temp_name(&self.base.join("tmp"))
    }

    /// Removes the scratch directory and everything under it.
    pub fn delete(self) -> Result<()> {
        fs::remove_dir_all(&self.base)?;
        Ok(())
    }
}

fn temp_name(base: &Path) -> Result<PathBuf> {
    loop {
        let mut buf = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut buf);
        let candidate = base.join(hex::encode(buf));
        match fs::symlink_metadata(&candidate) {
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(candidate),
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_paths_are_unique_and_unused() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ScratchFs::new(dir.path().join("scratch")).unwrap();
        let a = fs.temp().unwrap();
        let b = fs.temp().unwrap();
        assert_ne!(a, b);
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn named_path_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ScratchFs::new(dir.path().join("scratch")).unwrap();
        assert_eq!(fs.path("tree"), fs.path("tree"));
    }

    #[test]
    fn delete_removes_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ScratchFs::new(dir.path().join("scratch")).unwrap();
        let base = dir.path().join("scratch");
        assert!(base.exists());
        fs.delete().unwrap();
        assert!(!base.exists());
    }
}
