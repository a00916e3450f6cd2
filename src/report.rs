//! Turns the result of a pipeline run into console text and an exit status.
//!
//! An unsupported platform is a soft failure: the surrounding package install
//! must still succeed. A download or install failure is a hard failure.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::Error;

/// Terminal result of one fetch-and-install run.
#[derive(Debug)]
pub enum Outcome {
    Installed { platform: String, path: PathBuf },
    AlreadyInstalled { platform: String, path: PathBuf },
    Unsupported { platform: String, supported: Vec<String> },
    Failed { url: String, error: Error },
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Failed { .. } => 1,
            _ => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Writes user-facing messages for an [`Outcome`].
pub struct Reporter {
    bin_name: String,
    build_url: String,
}

impl Reporter {
    /// `build_url` is where manual build-from-source instructions live.
    pub fn new(bin_name: &str, build_url: &str) -> Self {
        Self {
            bin_name: bin_name.to_owned(),
            build_url: build_url.to_owned(),
        }
    }

    /// Print the resolved-platform notice.
    pub fn platform_notice(&self, out: &mut impl Write, platform: &str) -> io::Result<()> {
        writeln!(out, "[{}] Installing prebuilt binary for {platform}", self.bin_name)
    }

    /// Report `outcome`: notices go to `out`, warnings and failures to `err`.
    pub fn report(&self, out: &mut impl Write, err: &mut impl Write, outcome: &Outcome) -> io::Result<()> {
        let name = &self.bin_name;
        match outcome {
            Outcome::Installed { platform, path } => {
                writeln!(out, "[{name}] Binary installed successfully for {platform}")?;
                writeln!(out, "[{name}] Location: {}", path.display())
            }
            Outcome::AlreadyInstalled { platform, path } => writeln!(
                out,
                "[{name}] Binary for {platform} already installed at {}",
                path.display()
            ),
            Outcome::Unsupported { platform, supported } => {
                writeln!(err)?;
                writeln!(err, "[{name}] Warning: No prebuilt binary available for {platform}")?;
                writeln!(err, "Supported platforms: {}", supported.join(", "))?;
                writeln!(err, "You may need to build from source: {}", self.build_url)?;
                writeln!(err)
            }
            Outcome::Failed { url, error } => {
                writeln!(err)?;
                writeln!(err, "[{name}] Error: failed to install prebuilt binary")?;
                writeln!(err, "URL: {url}")?;
                writeln!(err, "Reason: {error}")?;
                writeln!(err, "To build from source instead, see {}", self.build_url)?;
                writeln!(err, "  cargo install --path . --locked")?;
                writeln!(err)
            }
        }
    }
}
