//! SR-IOV device discovery over sysfs.
//!
//! A collection pass walks `/sys/bus/pci/devices`, keeps the network
//! controllers that expose `sriov_totalvfs`, and follows each PF's
//! `virtfn<N>` symlinks to its VFs.

use crate::error::{Result, SriovError};
use crate::sysfs::Sysfs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding one entry per PCI device.
pub const SYS_BUS_PCI: &str = "/sys/bus/pci/devices";

const TOTAL_VF_FILE: &str = "sriov_totalvfs";
const CLASS_FILE: &str = "class";
const NET_DIR: &str = "net";
const DRIVER_LINK: &str = "driver";
const VF_LINK_PREFIX: &str = "virtfn";

/// PCI class code of a network controller (class 0x02, subclass 0x00, prog-if 0x00).
pub const NET_CLASS: i64 = 0x020000;

/// VF index (suffix of the `virtfn<N>` link) to VF PCI address.
pub type VfMap = BTreeMap<String, String>;

fn device_dir(pci_addr: &str) -> PathBuf {
    Path::new(SYS_BUS_PCI).join(pci_addr)
}

/// Return the SR-IOV capable network PFs of the host, in listing order.
///
/// Fails when the PCI device root cannot be listed, lists nothing, or
/// contains no SR-IOV network PF. Any of these aborts the collection pass.
pub fn sriov_pfs(sysfs: &dyn Sysfs) -> Result<Vec<String>> {
    let devices = sysfs.read_dir(Path::new(SYS_BUS_PCI)).map_err(|e| {
        SriovError::Discovery(format!(
            "pci devices could not be found in {}: {}",
            SYS_BUS_PCI, e
        ))
    })?;

    if devices.is_empty() {
        return Err(SriovError::Discovery(format!(
            "pci devices could not be found in {}",
            SYS_BUS_PCI
        )));
    }

    let pfs: Vec<String> = devices
        .into_iter()
        .filter(|device| is_sriov_net_pf(sysfs, device))
        .collect();

    if pfs.is_empty() {
        return Err(SriovError::Discovery(
            "no sriov net devices found on host".to_string(),
        ));
    }

    debug!("Found {} SR-IOV network PFs", pfs.len());
    Ok(pfs)
}

/// Check whether a PCI device is an SR-IOV capable network controller.
///
/// An unreadable or malformed class file means "no", never an error.
pub fn is_sriov_net_pf(sysfs: &dyn Sysfs, pci_addr: &str) -> bool {
    let dir = device_dir(pci_addr);
    is_net_device(sysfs, &dir.join(CLASS_FILE)) && sysfs.exists(&dir.join(TOTAL_VF_FILE))
}

fn is_net_device(sysfs: &dyn Sysfs, class_file: &Path) -> bool {
    match sysfs.read_to_string(class_file) {
        Ok(raw) => parse_class_code(&raw) == Some(NET_CLASS),
        Err(_) => false,
    }
}

/// Parse a PCI class attribute as a base-prefixed integer.
///
/// Accepts an optional sign followed by `0x`/`0X` hex, `0b`/`0B` binary,
/// `0o`/`0O` or leading-zero octal, or plain decimal. Underscores may
/// separate digits only when a base prefix is present.
pub fn parse_class_code(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (negative, s) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let lower = s.to_ascii_lowercase();
    let (radix, digits, prefixed) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest, true)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest, true)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest, true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..], true)
    } else {
        (10, lower.as_str(), false)
    };

    let digits = if prefixed && digits.contains('_') {
        if digits.ends_with('_') || digits.contains("__") {
            return None;
        }
        digits.replace('_', "")
    } else {
        digits.to_string()
    };

    // from_str_radix tolerates its own sign, which would allow "0x-1"
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits
    };
    i64::from_str_radix(&signed, radix).ok()
}

/// Enumerate the VFs of a PF through its `virtfn<N>` symlinks.
///
/// Entries that are not symlinks or do not resolve are skipped. Only a PF
/// directory that cannot be inspected at all is reported as an error.
pub fn vf_list(sysfs: &dyn Sysfs, pf_address: &str) -> Result<VfMap> {
    let pf_dir = device_dir(pf_address);
    let enumeration_error = |source: std::io::Error| SriovError::Enumeration {
        pf: pf_address.to_string(),
        source,
    };

    sysfs.is_symlink(&pf_dir).map_err(enumeration_error)?;
    let entries = sysfs.read_dir(&pf_dir).map_err(enumeration_error)?;

    let mut vfs = VfMap::new();
    for entry in entries {
        let Some(index) = entry.strip_prefix(VF_LINK_PREFIX) else {
            continue;
        };
        let link = pf_dir.join(&entry);

        match sysfs.is_symlink(&link) {
            Ok(true) => {}
            _ => continue,
        }

        match sysfs.resolve_link(&link) {
            Ok(target) => {
                if let Some(address) = target.file_name() {
                    vfs.insert(index.to_string(), address.to_string_lossy().into_owned());
                }
            }
            Err(e) => debug!("Skipping {}: {}", link.display(), e),
        }
    }

    Ok(vfs)
}

/// Kernel interface name of a PF, or an empty string if it has none.
pub fn pf_name(sysfs: &dyn Sysfs, pf_address: &str) -> String {
    sysfs
        .read_dir(&device_dir(pf_address).join(NET_DIR))
        .ok()
        .and_then(|names| names.into_iter().next())
        .unwrap_or_default()
}

/// Name of the driver bound to a PF, or an empty string if unbound.
pub fn pf_driver(sysfs: &dyn Sysfs, pf_address: &str) -> String {
    sysfs
        .read_link(&device_dir(pf_address).join(DRIVER_LINK))
        .ok()
        .and_then(|target| {
            target
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}
