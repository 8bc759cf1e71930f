//! Read-only access to sysfs.
//!
//! Discovery and stat readers never touch `std::fs` directly. They go through
//! the [`Sysfs`] trait with absolute sysfs paths (`/sys/bus/pci/devices/...`),
//! which lets the exporter run against a sysfs tree mounted somewhere other
//! than `/` and lets tests substitute a fixture.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem operations needed by the discovery walk.
pub trait Sysfs: Send + Sync {
    /// Names of the entries in a directory, sorted by name.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Full contents of an attribute file.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Whether `path` exists, following symlinks.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` itself is a symlink, without following it.
    fn is_symlink(&self, path: &Path) -> io::Result<bool>;

    /// Fully resolved target of `path`. Fails on broken links.
    fn resolve_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Target of the symlink `path` as written, without resolving it.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
}

/// [`Sysfs`] backed by the host filesystem.
#[derive(Debug, Clone)]
pub struct HostSysfs {
    root: PathBuf,
}

impl HostSysfs {
    /// Create a sysfs source whose absolute paths are resolved below `root`.
    ///
    /// `HostSysfs::new("/")` reads the live system; a container with the host
    /// sysfs bind-mounted at `/host/sys` would use `HostSysfs::new("/host")`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl Default for HostSysfs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Sysfs for HostSysfs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = fs::read_dir(self.host_path(path))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.host_path(path))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(self.host_path(path)).is_ok()
    }

    fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::symlink_metadata(self.host_path(path))?
            .file_type()
            .is_symlink())
    }

    fn resolve_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(self.host_path(path))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(self.host_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, HostSysfs) {
        let temp_dir = TempDir::new().unwrap();
        let dev = temp_dir.path().join("sys/bus/pci/devices");
        fs::create_dir_all(dev.join("0000:03:00.0")).unwrap();
        fs::create_dir_all(dev.join("0000:03:02.0")).unwrap();
        fs::write(dev.join("0000:03:00.0/class"), "0x020000\n").unwrap();
        symlink("../0000:03:02.0", dev.join("0000:03:00.0/virtfn0")).unwrap();
        symlink("../0000:03:02.7", dev.join("0000:03:00.0/virtfn7")).unwrap();

        let sysfs = HostSysfs::new(temp_dir.path());
        (temp_dir, sysfs)
    }

    #[test]
    fn test_read_dir_is_sorted_and_rooted() {
        let (_dir, sysfs) = fixture();
        let names = sysfs
            .read_dir(Path::new("/sys/bus/pci/devices/0000:03:00.0"))
            .unwrap();
        assert_eq!(names, vec!["class", "virtfn0", "virtfn7"]);
    }

    #[test]
    fn test_read_to_string() {
        let (_dir, sysfs) = fixture();
        let class = sysfs
            .read_to_string(Path::new("/sys/bus/pci/devices/0000:03:00.0/class"))
            .unwrap();
        assert_eq!(class, "0x020000\n");
    }

    #[test]
    fn test_symlink_handling() {
        let (_dir, sysfs) = fixture();
        let pf = Path::new("/sys/bus/pci/devices/0000:03:00.0");

        assert!(sysfs.is_symlink(&pf.join("virtfn0")).unwrap());
        assert!(!sysfs.is_symlink(&pf.join("class")).unwrap());
        assert!(sysfs.is_symlink(&pf.join("missing")).is_err());

        let target = sysfs.resolve_link(&pf.join("virtfn0")).unwrap();
        assert_eq!(target.file_name().unwrap(), "0000:03:02.0");

        // virtfn7 points at a device that does not exist
        assert!(sysfs.resolve_link(&pf.join("virtfn7")).is_err());
        assert_eq!(
            sysfs.read_link(&pf.join("virtfn7")).unwrap(),
            Path::new("../0000:03:02.7")
        );
        assert!(sysfs.read_link(&pf.join("class")).is_err());
        assert!(!sysfs.exists(&pf.join("virtfn7")));
        assert!(sysfs.exists(&pf.join("virtfn0")));
    }

    #[test]
    fn test_missing_root_fails_listing() {
        let sysfs = HostSysfs::new("/nonexistent/sysfs/root");
        assert!(sysfs.read_dir(Path::new("/sys/bus/pci/devices")).is_err());
        assert_eq!(sysfs.root(), Path::new("/nonexistent/sysfs/root"));
    }
}
