//! Host platforms and their file naming conventions.

use serde::{Deserialize, Serialize};

/// A platform a target can be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    #[serde(alias = "unix")]
    Linux,
    #[serde(alias = "macos")]
    Mac,
}

impl Platform {
    /// Every known platform.
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::Mac];

    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
        }
    }

    /// Executable extension, without the dot.
    pub fn executable_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "exe",
            Platform::Linux | Platform::Mac => "",
        }
    }

    /// Shared library extension, without the dot.
    pub fn dynamic_lib_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "dll",
            Platform::Mac => "dylib",
            Platform::Linux => "so",
        }
    }

    /// Fallback static library extension when no compiler is known.
    pub fn static_lib_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "lib",
            Platform::Linux | Platform::Mac => "a",
        }
    }

    /// Native (kernel driver / system plugin) extension.
    pub fn native_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "sys",
            Platform::Linux | Platform::Mac => "",
        }
    }

    /// Prefix for shared libraries.
    pub fn dynamic_lib_prefix(&self) -> &'static str {
        match self {
            Platform::Windows => "",
            Platform::Linux | Platform::Mac => "lib",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append `.ext` to `name` unless `ext` is empty.
pub fn with_dot_ext(name: &str, ext: &str) -> String {
    if ext.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", name, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(Platform::Windows.executable_ext(), "exe");
        assert_eq!(Platform::Linux.executable_ext(), "");
        assert_eq!(Platform::Mac.dynamic_lib_ext(), "dylib");
        assert_eq!(Platform::Linux.dynamic_lib_prefix(), "lib");
        assert_eq!(Platform::Windows.dynamic_lib_prefix(), "");
    }

    #[test]
    fn test_with_dot_ext() {
        assert_eq!(with_dot_ext("foo", ""), "foo");
        assert_eq!(with_dot_ext("foo", "so"), "foo.so");
    }
}
