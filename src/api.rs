use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::downloader::{DownloadConfig, Downloader, ProxySetting};
use crate::error::Error;
use crate::install::{finalize, Install, VersionInfo};
use crate::locator::{locate, AssetDescriptor};
use crate::platform::{host_platform, PlatformKey, PlatformTable};
use crate::progress::{default_progress_fn, ProgressFn};
use crate::report::Outcome;

// ──────────────────────────────────────────────────────────────────────────────
// Api
// ──────────────────────────────────────────────────────────────────────────────

/// Top-level entry-point with a chainable builder API.
///
/// # Example
/// ```rust,no_run
/// use binfetch::Api;
///
/// #[tokio::main]
/// async fn main() {
///     let outcome = Api::new("leet-tui")
///         .set_install_dir("./bin")
///         .repo("trevor/leet-tui")
///         .version("1.2.0")
///         .install()
///         .await;
///     std::process::exit(outcome.exit_code().into());
/// }
/// ```
pub struct Api {
    bin_name: String,
    install_dir: PathBuf,
    table: PlatformTable,
    platform: Option<(String, String)>,
    download: DownloadConfig,
    progress: Option<ProgressFn>,
}

impl Api {
    /// Create a new `Api` for the executable `bin_name` with sensible defaults.
    ///
    /// Proxy follows `HTTPS_PROXY` / `HTTP_PROXY` / `NO_PROXY` from the environment.
    pub fn new(bin_name: &str) -> Self {
        Self {
            bin_name: bin_name.to_owned(),
            install_dir: PathBuf::from("bin"),
            table: PlatformTable::default(),
            platform: None,
            download: DownloadConfig::default(),
            progress: Some(default_progress_fn(bin_name)),
        }
    }

    /// Set the installation directory (builder).
    pub fn set_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    /// Replace the table of supported platforms (builder).
    pub fn set_platform_table(mut self, table: PlatformTable) -> Self {
        self.table = table;
        self
    }

    /// Override the detected host `(os, arch)` (builder).
    pub fn set_platform(mut self, os: &str, arch: &str) -> Self {
        self.platform = Some((os.to_owned(), arch.to_owned()));
        self
    }

    /// Override the progress callback (builder).
    pub fn set_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Disable progress output (builder).
    pub fn no_progress(mut self) -> Self {
        self.progress = None;
        self
    }

    /// Set the maximum number of redirect hops to follow (builder).
    pub fn set_max_redirects(mut self, hops: u32) -> Self {
        self.download.max_redirects = hops;
        self
    }

    /// Set a per-request timeout (builder).
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.download.timeout = Some(timeout);
        self
    }

    /// Set the number of retries after a transport failure (builder).
    pub fn set_retry_count(mut self, count: u32) -> Self {
        self.download.retry_count = count;
        self
    }

    /// Set the retry delay in seconds (builder).
    pub fn set_retry_delay_secs(mut self, secs: u64) -> Self {
        self.download.retry_delay = Duration::from_secs(secs);
        self
    }

    /// Set an explicit HTTP/HTTPS proxy URL (builder).
    pub fn set_proxy(mut self, proxy: &str) -> Self {
        self.download.proxy = ProxySetting::Explicit(proxy.to_owned());
        self
    }

    /// Ignore any proxy picked up from the environment (builder).
    pub fn no_proxy(mut self) -> Self {
        self.download.proxy = ProxySetting::Disabled;
        self
    }

    /// Select the repository releases are published under and return a [`RepoApi`].
    ///
    /// Either `owner/name` on GitHub or a full base URL.
    pub fn repo(self, repo: &str) -> RepoApi {
        RepoApi {
            api: self,
            repo: repo.to_owned(),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// RepoApi
// ──────────────────────────────────────────────────────────────────────────────

/// Intermediate builder after a repository has been specified.
pub struct RepoApi {
    api: Api,
    repo: String,
}

impl RepoApi {
    /// Target a specific release version (e.g. `"1.2.0"`).
    pub fn version(self, version: &str) -> VersionApi {
        VersionApi {
            api: self.api,
            repo: self.repo,
            version: version.to_owned(),
        }
    }

    /// Return the installed [`VersionInfo`] from the install directory.
    pub fn get_installed_version(&self) -> crate::Result<VersionInfo> {
        Install::new(&self.api.install_dir).get_installed_version()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// VersionApi
// ──────────────────────────────────────────────────────────────────────────────

/// Final builder stage: everything needed to run the pipeline.
pub struct VersionApi {
    api: Api,
    repo: String,
    version: String,
}

impl VersionApi {
    fn host(&self) -> (String, String) {
        self.api.platform.clone().unwrap_or_else(host_platform)
    }

    /// Resolve the target platform against the table.
    pub fn resolve(&self) -> Option<PlatformKey> {
        let (os, arch) = self.host();
        self.api.table.resolve(&os, &arch)
    }

    /// Like [`resolve`](Self::resolve), but an unsupported platform is an error.
    pub fn require_platform(&self) -> crate::Result<PlatformKey> {
        let (os, arch) = self.host();
        self.api
            .table
            .resolve(&os, &arch)
            .ok_or(Error::PlatformUnsupported { os, arch })
    }

    /// Descriptor for this run, or `None` when the platform is unsupported.
    pub fn asset(&self) -> Option<AssetDescriptor> {
        self.resolve().map(|platform| self.descriptor(&platform))
    }

    fn descriptor(&self, platform: &PlatformKey) -> AssetDescriptor {
        locate(
            platform,
            &self.version,
            &self.repo,
            &self.api.bin_name,
            &self.api.install_dir,
        )
    }

    /// Resolve, download and install the executable.
    ///
    /// Never returns an error; the [`Outcome`] says whether the run succeeded.
    pub async fn install(self) -> Outcome {
        let Some(platform) = self.resolve() else {
            let (os, arch) = self.host();
            info!(%os, %arch, "no prebuilt binary for platform");
            return Outcome::Unsupported {
                platform: format!("{os}-{arch}"),
                supported: self.api.table.supported_list(),
            };
        };
        let asset = self.descriptor(&platform);
        let platform = asset.platform.to_string();
        info!(%platform, url = %asset.url, "resolved release asset");

        let marker = VersionInfo {
            tag_name: format!("v{}", self.version.trim_start_matches('v')),
            repo: self.repo.clone(),
            platform: platform.clone(),
        };
        let install = Install::new(&self.api.install_dir);
        if install.already_installed(&asset.install_path, &marker) {
            info!(path = %asset.install_path.display(), "already installed, skipping download");
            return Outcome::AlreadyInstalled {
                platform,
                path: asset.install_path,
            };
        }

        let downloader = Downloader::new(self.api.download, self.api.progress);
        if let Err(error) = downloader.download(&asset.url, &asset.temp_path).await {
            return Outcome::Failed {
                url: asset.url,
                error,
            };
        }

        let path = match finalize(&asset.temp_path, &asset.install_path, &asset.platform).into_result() {
            Ok(path) => path,
            Err(error) => {
                return Outcome::Failed {
                    url: asset.url,
                    error,
                }
            }
        };

        // The marker only lets later runs skip the download.
        if let Err(e) = install.create_version_file(&marker) {
            warn!(error = %e, "could not record installed version");
        }

        Outcome::Installed { platform, path }
    }
}
