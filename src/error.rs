use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced anywhere in the fetch-and-install pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// No entry in the platform table for the host pair.
    #[error("no prebuilt binary available for {os}-{arch}")]
    PlatformUnsupported { os: String, arch: String },

    /// Connection, name resolution or I/O failure while fetching.
    #[error("transport error while fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportFailure,
    },

    /// The server answered with a status that is neither success nor a redirect.
    #[error("download failed with status {status} for {url}")]
    Http { url: String, status: u16 },

    /// The redirect chain grew past the configured bound.
    #[error("too many redirects (limit {limit}) while fetching {url}")]
    RedirectLoop { url: String, limit: u32 },

    #[error("filesystem error: could not {op} {}: {source}", .path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn transport(url: &str, source: impl Into<TransportFailure>) -> Self {
        Error::Transport {
            url: url.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn filesystem(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// Transport failures are the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_carries_status() {
        let err = Error::Http {
            url: "https://example.com/a".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "download failed with status 404 for https://example.com/a"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn io_failures_are_transport_errors() {
        let err = Error::transport(
            "https://example.com/a",
            io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        );
        assert!(err.is_transient());
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn filesystem_error_names_the_path() {
        let err = Error::filesystem(
            "create directory",
            "/nope/bin",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "filesystem error: could not create directory /nope/bin: denied"
        );
    }
}
