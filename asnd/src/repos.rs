use asn_lib::Sum;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// the blob repositories
///
/// stored objects are sharded by the first byte of their sum:
/// `<root>/<sum[..2]>/<sum[2..]>` (hexadecimal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repos {
    root: PathBuf,
}

impl Repos {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// where the object of the given sum is stored
    pub fn path_for(&self, sum: &Sum) -> PathBuf {
        let sum = sum.to_string();
        let (shard, rest) = sum.split_at(2);
        self.root.join(shard).join(rest)
    }

    /// create the missing parent directories of `path`
    pub fn ensure_parent_dirs<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        match path.as_ref().parent() {
            Some(parent) => fs::create_dir_all(parent),
            None => Ok(()),
        }
    }
}
