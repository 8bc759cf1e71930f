//! In-memory sysfs fixture shared by the integration tests.

#![allow(dead_code)]

use sriovnet_exporter::sysfs::Sysfs;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(String),
    Symlink(PathBuf),
}

/// A sysfs tree held in memory. Symlink targets may be relative.
#[derive(Debug, Default)]
pub struct MemorySysfs {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            _ => {}
        }
    }
    out
}

impl MemorySysfs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn insert(&self, path: &Path, node: Node) {
        let mut nodes = self.nodes.write().unwrap();
        for ancestor in path.ancestors().skip(1) {
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
        nodes.insert(path.to_path_buf(), node);
    }

    pub fn dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), Node::Dir);
    }

    pub fn file(&self, path: impl AsRef<Path>, contents: &str) {
        self.insert(path.as_ref(), Node::File(contents.to_string()));
    }

    pub fn symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        self.insert(path.as_ref(), Node::Symlink(target.as_ref().to_path_buf()));
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.nodes
            .write()
            .unwrap()
            .retain(|p, _| !p.starts_with(path));
    }

    /// Follow symlinks until a non-link node, returning its path.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let nodes = self.nodes.read().unwrap();
        let mut current = normalize(path);
        for _ in 0..16 {
            match nodes.get(&current) {
                Some(Node::Symlink(target)) => {
                    let parent = current.parent().unwrap_or(Path::new("/"));
                    current = normalize(&parent.join(target));
                }
                Some(_) => return Ok(current),
                None => return Err(not_found(path)),
            }
        }
        Err(io::Error::new(io::ErrorKind::Other, "too many levels of symbolic links"))
    }
}

impl Sysfs for MemorySysfs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let dir = self.resolve(path)?;
        let nodes = self.nodes.read().unwrap();
        if !matches!(nodes.get(&dir), Some(Node::Dir)) {
            return Err(io::Error::new(io::ErrorKind::Other, "not a directory"));
        }
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(dir.as_path()))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let file = self.resolve(path)?;
        match self.nodes.read().unwrap().get(&file) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            _ => Err(io::Error::new(io::ErrorKind::Other, "is a directory")),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_ok()
    }

    fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        match self.nodes.read().unwrap().get(&normalize(path)) {
            Some(node) => Ok(matches!(node, Node::Symlink(_))),
            None => Err(not_found(path)),
        }
    }

    fn resolve_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.resolve(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.nodes.read().unwrap().get(&normalize(path)) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(io::ErrorKind::InvalidInput, "not a symlink")),
            None => Err(not_found(path)),
        }
    }
}

pub const DEVICES: &str = "/sys/bus/pci/devices";

/// Add an SR-IOV network PF bound to `driver`, named `name` (if any), with
/// VFs given as `(index, vf address)` pairs.
pub fn add_pf(sysfs: &MemorySysfs, addr: &str, driver: &str, name: Option<&str>, vfs: &[(&str, &str)]) {
    let pf = Path::new(DEVICES).join(addr);
    sysfs.file(pf.join("class"), "0x020000\n");
    sysfs.file(pf.join("sriov_totalvfs"), "64\n");
    sysfs.dir(format!("/sys/bus/pci/drivers/{}", driver));
    sysfs.symlink(pf.join("driver"), format!("../../drivers/{}", driver));
    sysfs.dir(pf.join("net"));
    if let Some(name) = name {
        sysfs.dir(pf.join("net").join(name));
    }
    for (index, vf_addr) in vfs {
        sysfs.dir(Path::new(DEVICES).join(vf_addr));
        sysfs.symlink(pf.join(format!("virtfn{}", index)), format!("../{}", vf_addr));
    }
}

/// Write the per-VF statistics the i40e driver exposes.
pub fn add_stats(sysfs: &MemorySysfs, pf_name: &str, vf_index: &str, stats: &[(&str, &str)]) {
    let dir = PathBuf::from(format!("/sys/class/net/{}/device/sriov/{}/stats", pf_name, vf_index));
    sysfs.dir(&dir);
    for (name, value) in stats {
        sysfs.file(dir.join(name), value);
    }
}
