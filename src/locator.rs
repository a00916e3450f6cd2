use std::path::{Path, PathBuf};

use crate::platform::PlatformKey;

/// Where to fetch the release artifact from and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub platform: PlatformKey,
    /// Fully qualified download URL.
    pub url: String,
    /// Scratch file the download streams into.
    pub temp_path: PathBuf,
    /// Final location of the executable.
    pub install_path: PathBuf,
    /// Executable filename, including the platform suffix.
    pub executable: String,
}

/// Expand a repository identity into its web base URL.
///
/// `owner/name` becomes `https://github.com/owner/name`; anything that already
/// carries a scheme is taken as-is so mirrors can be used.
pub fn repo_base_url(repo: &str) -> String {
    let repo = repo.trim_end_matches('/');
    if repo.starts_with("http://") || repo.starts_with("https://") {
        repo.to_owned()
    } else {
        format!("https://github.com/{repo}")
    }
}

/// Name of the release asset for `platform`, e.g. `leet-tui-linux-x64`.
pub fn asset_filename(bin_name: &str, platform: &PlatformKey) -> String {
    format!("{bin_name}-{platform}{}", platform.exe_suffix())
}

/// Download URL for `asset` in release `v{version}` of `repo`.
pub fn release_asset_url(repo: &str, version: &str, asset: &str) -> String {
    let version = version.strip_prefix('v').unwrap_or(version);
    format!(
        "{}/releases/download/v{}/{}",
        repo_base_url(repo),
        version,
        asset
    )
}

/// Build the descriptor for one run. Pure; the version is not validated.
pub fn locate(
    platform: &PlatformKey,
    version: &str,
    repo: &str,
    bin_name: &str,
    install_dir: &Path,
) -> AssetDescriptor {
    let executable = format!("{bin_name}{}", platform.exe_suffix());
    let url = release_asset_url(repo, version, &asset_filename(bin_name, platform));
    let temp_path = install_dir.join(format!(".{executable}.{}.part", std::process::id()));

    AssetDescriptor {
        platform: platform.clone(),
        url,
        temp_path,
        install_path: install_dir.join(&executable),
        executable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_url_follows_release_layout() {
        let key = PlatformKey::new("linux", "x64");
        let asset = locate(&key, "1.2.0", "trevor/leet-tui", "leet-tui", Path::new("bin"));
        assert_eq!(
            asset.url,
            "https://github.com/trevor/leet-tui/releases/download/v1.2.0/leet-tui-linux-x64"
        );
        assert_eq!(asset.executable, "leet-tui");
        assert_eq!(asset.install_path, Path::new("bin").join("leet-tui"));
    }

    #[test]
    fn windows_assets_carry_exe_suffix() {
        let key = PlatformKey::new("win32", "x64");
        let asset = locate(&key, "0.3.1", "trevor/leet-tui", "leet-tui", Path::new("bin"));
        assert!(asset.url.ends_with("/v0.3.1/leet-tui-win32-x64.exe"));
        assert_eq!(asset.executable, "leet-tui.exe");
    }

    #[test]
    fn temp_path_is_per_process_and_beside_install_path() {
        let key = PlatformKey::new("darwin", "arm64");
        let asset = locate(&key, "1.0.0", "o/r", "tool", Path::new("out"));
        assert_eq!(asset.temp_path.parent(), asset.install_path.parent());
        let name = asset.temp_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.contains(&std::process::id().to_string()));
        assert_ne!(asset.temp_path, asset.install_path);
    }

    #[test]
    fn explicit_base_urls_are_kept() {
        assert_eq!(
            release_asset_url("http://127.0.0.1:8080/", "v2.0.0", "a"),
            "http://127.0.0.1:8080/releases/download/v2.0.0/a"
        );
        assert_eq!(repo_base_url("owner/repo"), "https://github.com/owner/repo");
    }
}
