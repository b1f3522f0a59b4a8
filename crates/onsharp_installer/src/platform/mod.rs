use std::fmt;

const OTHER_UNIX_MARKERS: &[&str] = &[
    "bsd", "solaris", "sunos", "illumos", "aix", "hp-ux", "android", "ios", "unix",
];

/// Operating system family of the host running the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOsOrOtherUnix,
    Unknown,
}

impl Platform {
    /// Classify the host this binary was built for.
    pub fn detect() -> Self {
        Self::classify(std::env::consts::OS)
    }

    /// Classify an OS name such as `"windows"`, `"Linux"` or `"Mac OS X"`.
    pub fn classify(os_name: &str) -> Self {
        let name = os_name.trim().to_ascii_lowercase();
        // "darwin" contains "win"; mac has to be matched first.
        if name.contains("mac") || name.contains("darwin") {
            Self::MacOsOrOtherUnix
        } else if name.contains("win") {
            Self::Windows
        } else if name.contains("nux") {
            Self::Linux
        } else if OTHER_UNIX_MARKERS.iter().any(|marker| name.contains(marker)) {
            Self::MacOsOrOtherUnix
        } else {
            Self::Unknown
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, Self::Windows | Self::Linux)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOsOrOtherUnix => "macos/other unix",
            Self::Unknown => "unknown platform",
        };
        f.write_str(label)
    }
}
