//! # binfetch
//!
//! Makes sure a working native executable is present after a package is
//! installed, by downloading the prebuilt release asset that matches the host
//! operating system and CPU architecture.
//!
//! The pipeline is: resolve the platform ([`platform`]), locate the release
//! asset ([`locator`]), stream it to a scratch file ([`downloader`]), promote
//! it to its final path ([`install`]) and report the [`Outcome`] ([`report`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use binfetch::Api;
//!
//! #[tokio::main]
//! async fn main() {
//!     let outcome = Api::new("leet-tui")
//!         .set_install_dir("./bin")
//!         .repo("trevor/leet-tui")
//!         .version("1.2.0")
//!         .install()
//!         .await;
//!     assert!(outcome.is_success());
//! }
//! ```

pub mod api;
pub mod downloader;
pub mod error;
pub mod install;
pub mod locator;
pub mod platform;
pub mod progress;
pub mod report;

pub use api::Api;
pub use downloader::{DownloadConfig, DownloadSession, Downloader, ProxySetting, SessionStatus};
pub use error::{Error, Result};
pub use install::{finalize, Install, InstallResult, VersionInfo};
pub use locator::{locate, AssetDescriptor};
pub use platform::{host_platform, PlatformKey, PlatformTable};
pub use report::{Outcome, Reporter};
