use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use binfetch::{host_platform, locator, Api, Reporter};

/// Post-install hook: fetch the prebuilt executable for this machine.
#[derive(Parser)]
#[command(name = "binfetch", version, about, long_about = None)]
struct Cli {
    /// Name of the executable, also the release asset prefix
    #[arg(long, default_value = "leet-tui")]
    bin_name: String,

    /// Repository releases are published under (`owner/name` or a base URL)
    #[arg(long, env = "BINFETCH_REPO", default_value = "trevor/leet-tui")]
    repo: String,

    /// Release version to install (defaults to the version of the package being installed)
    #[arg(long, env = "npm_package_version")]
    pkg_version: String,

    /// Directory the executable is installed into
    #[arg(long, env = "BINFETCH_INSTALL_DIR", default_value = "bin")]
    install_dir: PathBuf,

    /// Override the detected operating system (e.g. `linux`, `darwin`, `win32`)
    #[arg(long)]
    os: Option<String>,

    /// Override the detected CPU architecture (e.g. `x64`, `arm64`)
    #[arg(long)]
    arch: Option<String>,

    /// Redirect hops to follow before giving up
    #[arg(long, default_value_t = 5)]
    max_redirects: u32,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Retries after a network failure
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Do not draw a progress bar
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("BINFETCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (host_os, host_arch) = host_platform();
    let os = cli.os.unwrap_or(host_os);
    let arch = cli.arch.unwrap_or(host_arch);

    let mut api = Api::new(&cli.bin_name)
        .set_install_dir(&cli.install_dir)
        .set_platform(&os, &arch)
        .set_max_redirects(cli.max_redirects)
        .set_retry_count(cli.retries);
    if let Some(secs) = cli.timeout {
        api = api.set_timeout(Duration::from_secs(secs));
    }
    if cli.quiet {
        api = api.no_progress();
    }

    let reporter = Reporter::new(&cli.bin_name, &locator::repo_base_url(&cli.repo));
    let run = api.repo(&cli.repo).version(&cli.pkg_version);
    match run.require_platform() {
        Ok(platform) => {
            if let Err(e) = reporter.platform_notice(&mut io::stdout(), &platform.to_string()) {
                tracing::warn!(error = %e, "could not write platform notice");
            }
        }
        Err(e) => tracing::info!(error = %e, "skipping download"),
    }

    let outcome = run.install().await;
    if let Err(e) = reporter.report(&mut io::stdout(), &mut io::stderr(), &outcome) {
        tracing::warn!(error = %e, "could not write report");
    }
    ExitCode::from(outcome.exit_code())
}
