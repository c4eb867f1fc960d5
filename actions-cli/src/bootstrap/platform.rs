//! Host platform detection
//!
//! Release archives and container ports are keyed on the host OS and
//! architecture using the release naming scheme (`linux`, `darwin`,
//! `windows` / `amd64`, `arm64`, ...), not Rust's target names.

use std::fmt;

/// Operating system family relevant to the bootstrap steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Other(&'static str),
}

impl Os {
    fn from_rust(os: &'static str) -> Self {
        match os {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => Os::Other(other),
        }
    }

    /// Name used in release artifact file names
    pub fn release_name(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "darwin",
            Os::Windows => "windows",
            Os::Other(name) => name,
        }
    }
}

/// OS + architecture pair of the machine being bootstrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: &'static str,
}

impl Platform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        Self {
            os: Os::from_rust(std::env::consts::OS),
            arch: std::env::consts::ARCH,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Architecture name used in release artifact file names
    pub fn release_arch(&self) -> &'static str {
        match self.arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.release_name(), self.release_arch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_names() {
        let linux = Platform {
            os: Os::Linux,
            arch: "x86_64",
        };
        assert_eq!(linux.to_string(), "linux/amd64");

        let mac = Platform {
            os: Os::MacOs,
            arch: "aarch64",
        };
        assert_eq!(mac.to_string(), "darwin/arm64");
        assert!(!mac.is_windows());
    }

    #[test]
    fn test_unknown_arch_passes_through() {
        let platform = Platform {
            os: Os::Other("freebsd"),
            arch: "riscv64",
        };
        assert_eq!(platform.to_string(), "freebsd/riscv64");
    }
}
