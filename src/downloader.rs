use std::io;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::progress::{percent, ProgressFn};

/// Lifecycle of a single download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Streaming,
    Complete,
    Failed,
}

/// Mutable state of one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSession {
    /// URL of the hop currently being requested.
    pub url: String,
    pub bytes_received: u64,
    /// Length advertised by the server, if any.
    pub total: Option<u64>,
    /// Number of redirect hops followed so far.
    pub redirects: u32,
    pub status: SessionStatus,
}

impl DownloadSession {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            bytes_received: 0,
            total: None,
            redirects: 0,
            status: SessionStatus::Pending,
        }
    }
}

/// Which proxy, if any, requests go through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxySetting {
    /// Whatever `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` say.
    #[default]
    FromEnv,
    /// Every request goes through this proxy URL.
    Explicit(String),
    /// Connect directly, ignoring the environment.
    Disabled,
}

/// Knobs for the download engine.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Redirect hops followed before giving up.
    pub max_redirects: u32,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub proxy: ProxySetting,
    /// Extra attempts after a transport failure.
    pub retry_count: u32,
    /// Delay between retries.
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            timeout: None,
            proxy: ProxySetting::FromEnv,
            retry_count: 0,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Streams a release asset to disk, chasing redirects within a bound.
pub struct Downloader {
    pub config: DownloadConfig,
    /// Optional progress callback.
    pub progress: Option<ProgressFn>,
}

/// Removes the scratch file on drop unless the download completed.
struct PartialFile<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = remove_partial(self.path) {
                warn!(path = %self.path.display(), error = %e, "could not remove partial download");
            }
        }
    }
}

fn remove_partial(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// `Location` of a redirect response, resolved against the request URL.
fn redirect_target(resp: &Response) -> Option<String> {
    let location = resp.headers().get(LOCATION)?.to_str().ok()?;
    resp.url().join(location).ok().map(String::from)
}

impl Downloader {
    pub fn new(config: DownloadConfig, progress: Option<ProgressFn>) -> Self {
        Self { config, progress }
    }

    /// Build an HTTP client that leaves redirects to us.
    fn build_client(&self) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("binfetch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &self.config.proxy {
            ProxySetting::FromEnv => builder,
            ProxySetting::Explicit(proxy_url) => builder.proxy(Proxy::all(proxy_url)?),
            ProxySetting::Disabled => builder.no_proxy(),
        };
        builder.build()
    }

    /// Download `url` into `dest`, retrying transport failures up to
    /// `retry_count` times. Each attempt gets a fresh session.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadSession> {
        let mut attempt = 0;
        loop {
            let mut session = DownloadSession::new(url);
            match self.fetch(url, dest, &mut session).await {
                Ok(_) => return Ok(session),
                Err(e) if e.is_transient() && attempt < self.config.retry_count => {
                    attempt += 1;
                    warn!(%url, attempt, error = %e, "download failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One download attempt. Leaves `session` in a terminal state and returns
    /// the number of bytes written. Nothing is left at `dest` on failure.
    pub async fn fetch(&self, url: &str, dest: &Path, session: &mut DownloadSession) -> Result<u64> {
        let mut partial = PartialFile::new(dest);
        match self.fetch_inner(url, dest, session).await {
            Ok(written) => {
                session.status = SessionStatus::Complete;
                partial.keep();
                info!(url = %session.url, bytes = written, redirects = session.redirects, "download complete");
                Ok(written)
            }
            Err(e) => {
                session.status = SessionStatus::Failed;
                warn!(%url, error = %e, "download failed");
                Err(e)
            }
        }
    }

    async fn fetch_inner(&self, url: &str, dest: &Path, session: &mut DownloadSession) -> Result<u64> {
        session.url = url.to_owned();
        let client = self.build_client().map_err(|e| Error::transport(url, e))?;

        loop {
            debug!(url = %session.url, hop = session.redirects, "requesting");
            let resp = client
                .get(session.url.as_str())
                .send()
                .await
                .map_err(|e| Error::transport(&session.url, e))?;
            let status = resp.status();

            if is_redirect(status) {
                remove_partial(dest).map_err(|e| Error::transport(&session.url, e))?;
                let next = redirect_target(&resp).ok_or_else(|| Error::Http {
                    url: session.url.clone(),
                    status: status.as_u16(),
                })?;
                session.redirects += 1;
                if session.redirects > self.config.max_redirects {
                    return Err(Error::RedirectLoop {
                        url: url.to_owned(),
                        limit: self.config.max_redirects,
                    });
                }
                debug!(from = %session.url, to = %next, hop = session.redirects, "following redirect");
                session.url = next;
                continue;
            }

            if !status.is_success() {
                return Err(Error::Http {
                    url: session.url.clone(),
                    status: status.as_u16(),
                });
            }

            return self.stream_to_file(resp, dest, session).await;
        }
    }

    /// Stream the body of a successful response into `dest`.
    async fn stream_to_file(&self, resp: Response, dest: &Path, session: &mut DownloadSession) -> Result<u64> {
        session.status = SessionStatus::Streaming;
        session.total = resp.content_length();

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::filesystem("create directory", parent, e))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::filesystem("create", dest, e))?;

        let src = session.url.clone();
        let mut last_percent = None;
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::transport(&src, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::transport(&src, e))?;
            session.bytes_received += chunk.len() as u64;

            let pct = percent(session.bytes_received, session.total);
            if pct.is_some() && pct != last_percent {
                last_percent = pct;
                if let Some(progress) = &self.progress {
                    progress(&src, session.bytes_received, session.total, false);
                }
            }
        }
        file.flush().await.map_err(|e| Error::transport(&src, e))?;

        if let Some(total) = session.total {
            if session.bytes_received != total {
                return Err(Error::transport(
                    &src,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("expected {total} bytes, received {}", session.bytes_received),
                    ),
                ));
            }
        }

        if let Some(progress) = &self.progress {
            progress(&src, session.bytes_received, session.total, true);
        }

        Ok(session.bytes_received)
    }
}
