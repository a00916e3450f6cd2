use std::fmt;

/// Canonical `{os}-{arch}` identifier used to pick a release artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    os: String,
    arch: String,
}

impl PlatformKey {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_owned(),
            arch: arch.to_owned(),
        }
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Whether executables for this platform carry an `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        self.os == "win32"
    }

    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Immutable set of platforms that have a published release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTable {
    entries: Vec<PlatformKey>,
}

impl PlatformTable {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(os, arch)| PlatformKey::new(os, arch))
                .collect(),
        }
    }

    /// Look up `(os, arch)`. `None` means there is no prebuilt artifact;
    /// that is an ordinary outcome, not an error.
    pub fn resolve(&self, os: &str, arch: &str) -> Option<PlatformKey> {
        self.entries
            .iter()
            .find(|key| key.os == os && key.arch == arch)
            .cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PlatformKey> {
        self.entries.iter()
    }

    /// Supported keys rendered as `darwin-arm64, linux-x64, ...`.
    pub fn supported_list(&self) -> Vec<String> {
        self.keys().map(ToString::to_string).collect()
    }
}

impl Default for PlatformTable {
    fn default() -> Self {
        Self::new([
            ("darwin", "arm64"),
            ("darwin", "x64"),
            ("linux", "x64"),
            ("linux", "arm64"),
            ("win32", "x64"),
        ])
    }
}

/// Host `(os, arch)` translated into the identifiers used by [`PlatformTable`].
///
/// Unknown values pass through untouched so they simply fail to resolve.
pub fn host_platform() -> (String, String) {
    (
        normalize_os(std::env::consts::OS).to_owned(),
        normalize_arch(std::env::consts::ARCH).to_owned(),
    )
}

pub fn normalize_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_pair_resolves() {
        let table = PlatformTable::default();
        for (os, arch, expected) in [
            ("darwin", "arm64", "darwin-arm64"),
            ("darwin", "x64", "darwin-x64"),
            ("linux", "x64", "linux-x64"),
            ("linux", "arm64", "linux-arm64"),
            ("win32", "x64", "win32-x64"),
        ] {
            let key = table.resolve(os, arch).expect("pair should resolve");
            assert_eq!(key.to_string(), expected);
        }
    }

    #[test]
    fn unknown_pairs_are_unresolved() {
        let table = PlatformTable::default();
        assert_eq!(table.resolve("freebsd", "x64"), None);
        assert_eq!(table.resolve("win32", "arm64"), None);
        assert_eq!(table.resolve("linux", "x86_64"), None);
        assert_eq!(table.resolve("", ""), None);
    }

    #[test]
    fn custom_table_is_respected() {
        let table = PlatformTable::new([("freebsd", "x64")]);
        assert!(table.resolve("freebsd", "x64").is_some());
        assert!(table.resolve("linux", "x64").is_none());
        assert_eq!(table.supported_list(), vec!["freebsd-x64".to_string()]);
    }

    #[test]
    fn windows_keys_get_exe_suffix() {
        assert_eq!(PlatformKey::new("win32", "x64").exe_suffix(), ".exe");
        assert_eq!(PlatformKey::new("linux", "x64").exe_suffix(), "");
    }

    #[test]
    fn host_identifiers_are_normalized() {
        assert_eq!(normalize_os("macos"), "darwin");
        assert_eq!(normalize_os("windows"), "win32");
        assert_eq!(normalize_os("freebsd"), "freebsd");
        assert_eq!(normalize_arch("x86_64"), "x64");
        assert_eq!(normalize_arch("aarch64"), "arm64");

        let (os, arch) = host_platform();
        assert!(!os.is_empty());
        assert!(!arch.is_empty());
    }
}
