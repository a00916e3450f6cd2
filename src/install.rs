use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::platform::PlatformKey;

/// Name of the marker written beside the installed executable.
pub const VERSION_FILE: &str = "version.json";

/// Version information stored in `version.json` alongside the installed binary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub tag_name: String,
    pub repo: String,
    pub platform: String,
}

/// Result of promoting a finished download to its final location.
#[derive(Debug)]
pub struct InstallResult {
    pub success: bool,
    pub path: PathBuf,
    pub error: Option<Error>,
}

impl InstallResult {
    fn ok(path: &Path) -> Self {
        Self {
            success: true,
            path: path.to_owned(),
            error: None,
        }
    }

    fn failed(path: &Path, error: Error) -> Self {
        Self {
            success: false,
            path: path.to_owned(),
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<PathBuf> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.path),
        }
    }
}

/// Move `temp` to `target`, mark it executable and check it landed.
///
/// On failure nothing is left at `target` and `temp` is removed.
pub fn finalize(temp: &Path, target: &Path, platform: &PlatformKey) -> InstallResult {
    match promote(temp, target, platform) {
        Ok(()) => {
            info!(path = %target.display(), %platform, "installed");
            InstallResult::ok(target)
        }
        Err(e) => {
            warn!(path = %target.display(), error = %e, "install failed, cleaning up");
            discard(target);
            discard(temp);
            InstallResult::failed(target, e)
        }
    }
}

fn promote(temp: &Path, target: &Path, platform: &PlatformKey) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::filesystem("create directory", parent, e))?;
    }

    move_file(temp, target).map_err(|e| Error::filesystem("move download to", target, e))?;

    if !platform.is_windows() {
        make_executable(target).map_err(|e| Error::filesystem("set permissions on", target, e))?;
    }

    let meta = std::fs::metadata(target).map_err(|e| Error::filesystem("inspect", target, e))?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(Error::filesystem(
            "verify",
            target,
            io::Error::new(io::ErrorKind::InvalidData, "installed file is empty"),
        ));
    }
    Ok(())
}

/// Rename, falling back to copy + remove when crossing filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(error = %e, "rename failed, copying instead");
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove file");
        }
    }
}

/// Tracks what is installed in one directory through its `version.json`.
pub struct Install {
    install_dir: PathBuf,
}

impl Install {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    fn version_file_path(&self) -> PathBuf {
        self.install_dir.join(VERSION_FILE)
    }

    /// Whether `executable` is present, non-empty and recorded as `expected`.
    pub fn already_installed(&self, executable: &Path, expected: &VersionInfo) -> bool {
        let present = std::fs::metadata(executable)
            .map(|m| m.is_file() && m.len() > 0 && is_executable(&m))
            .unwrap_or(false);
        if !present {
            return false;
        }
        match self.get_installed_version() {
            Ok(info) => &info == expected,
            Err(e) => {
                debug!(error = %e, "no usable version marker");
                false
            }
        }
    }

    /// Write (or overwrite) the `version.json` file.
    pub fn create_version_file(&self, info: &VersionInfo) -> Result<()> {
        std::fs::create_dir_all(&self.install_dir)
            .map_err(|e| Error::filesystem("create directory", &self.install_dir, e))?;

        let path = self.version_file_path();
        let json = serde_json::to_string_pretty(info)
            .map_err(|e| Error::filesystem("serialize", &path, e.into()))?;

        std::fs::write(&path, json).map_err(|e| Error::filesystem("write", &path, e))
    }

    /// Read back the stored version information.
    pub fn get_installed_version(&self) -> Result<VersionInfo> {
        let path = self.version_file_path();
        let raw = std::fs::read_to_string(&path).map_err(|e| Error::filesystem("read", &path, e))?;

        serde_json::from_str(&raw).map_err(|e| Error::filesystem("parse", &path, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> PlatformKey {
        PlatformKey::new("linux", "x64")
    }

    #[test]
    fn finalize_moves_and_marks_executable() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join(".tool.part");
        let target = dir.path().join("nested").join("bin").join("tool");
        std::fs::write(&temp, vec![7u8; 5000]).unwrap();

        let result = finalize(&temp, &target, &linux());

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.path, target);
        assert!(!temp.exists());
        assert_eq!(std::fs::metadata(&target).unwrap().len(), 5000);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn empty_download_is_rejected_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join(".tool.part");
        let target = dir.path().join("tool");
        std::fs::write(&temp, b"").unwrap();

        let result = finalize(&temp, &target, &linux());

        assert!(!result.success);
        assert!(matches!(result.error, Some(Error::Filesystem { op: "verify", .. })));
        assert!(!target.exists());
        assert!(!temp.exists());
    }

    #[test]
    fn missing_temp_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = finalize(&dir.path().join("nope"), &dir.path().join("tool"), &linux());
        assert!(!result.success);
        assert!(result.into_result().is_err());
    }

    #[test]
    fn version_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let install = Install::new(dir.path());
        let info = VersionInfo {
            tag_name: "v2.0.0".into(),
            repo: "owner/repo".into(),
            platform: "linux-x64".into(),
        };
        install.create_version_file(&info).expect("create version file");
        assert_eq!(install.get_installed_version().unwrap(), info);
    }

    #[test]
    fn already_installed_needs_binary_and_matching_marker() {
        let dir = tempfile::tempdir().unwrap();
        let install = Install::new(dir.path());
        let exe = dir.path().join("tool");
        let info = VersionInfo {
            tag_name: "v1.2.0".into(),
            repo: "owner/repo".into(),
            platform: "linux-x64".into(),
        };

        install.create_version_file(&info).unwrap();
        assert!(!install.already_installed(&exe, &info));

        std::fs::write(&exe, b"binary").unwrap();
        make_executable(&exe).unwrap();
        assert!(install.already_installed(&exe, &info));

        let newer = VersionInfo {
            tag_name: "v1.3.0".into(),
            ..info
        };
        assert!(!install.already_installed(&exe, &newer));
    }

    #[cfg(unix)]
    #[test]
    fn binary_without_exec_bits_is_not_installed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let install = Install::new(dir.path());
        let exe = dir.path().join("tool");
        let info = VersionInfo {
            tag_name: "v1.2.0".into(),
            repo: "owner/repo".into(),
            platform: "linux-x64".into(),
        };
        install.create_version_file(&info).unwrap();
        std::fs::write(&exe, b"binary").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!install.already_installed(&exe, &info));

        make_executable(&exe).unwrap();
        assert!(install.already_installed(&exe, &info));
    }

    #[test]
    fn corrupt_marker_means_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let install = Install::new(dir.path());
        let exe = dir.path().join("tool");
        std::fs::write(&exe, b"binary").unwrap();
        std::fs::write(dir.path().join(VERSION_FILE), "{not json").unwrap();

        let info = VersionInfo {
            tag_name: "v1.2.0".into(),
            repo: "owner/repo".into(),
            platform: "linux-x64".into(),
        };
        assert!(!install.already_installed(&exe, &info));
    }
}
