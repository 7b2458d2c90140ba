//! Core data structures: build configuration and the platform descriptor.
//!
//! The `Platform` descriptor is resolved exactly once at startup. Every
//! platform conditional in the composers consumes its fields instead of
//! re-testing `cfg!` at each call site, so platform behavior is decided in
//! one place.

use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::{BuildError, Result};

/// Whether the compiled output is a monolithic static archive or a
/// component (shared library) build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Monolithic static library (`.lib` / `.a`).
    Static,
    /// Component build producing a shared library (`.dll` / `.so`).
    Dll,
}

impl LinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Static => "static",
            LinkMode::Dll => "dll",
        }
    }

    /// Ninja target name for this link mode.
    pub fn compile_target(&self) -> &'static str {
        match self {
            LinkMode::Static => "v8_monolithic",
            LinkMode::Dll => "v8",
        }
    }
}

/// Optimization configuration of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Optimized build (default).
    Release,
    /// Build with debug symbols.
    Debug,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Release => "release",
            BuildMode::Debug => "debug",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildMode::Debug)
    }
}

/// Supported host OS families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OsFamily {
    Windows,
    Linux,
    FreeBsd,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::FreeBsd => "freebsd",
        }
    }
}

/// Platform capability descriptor, resolved once at startup.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Platform {
    pub family: OsFamily,

    /// Invoke commands through the platform command interpreter. Required on
    /// Windows where depot_tools entry points are batch scripts, not
    /// binaries.
    pub uses_shell_indirection: bool,

    /// The native compiler family defaults to clang here; Windows defaults
    /// to MSVC instead.
    pub clang_is_default: bool,

    /// Extensions tried when resolving a tool name against the search path.
    pub exe_extensions: &'static [&'static str],
}

impl Platform {
    /// Detect the host platform. Unsupported hosts are rejected up front
    /// rather than producing a build that fails halfway through.
    pub fn detect() -> Result<Self> {
        if cfg!(target_os = "windows") {
            Ok(Platform {
                family: OsFamily::Windows,
                uses_shell_indirection: true,
                clang_is_default: false,
                exe_extensions: &[".exe", ".bat", ".cmd"],
            })
        } else if cfg!(target_os = "linux") {
            Ok(Platform {
                family: OsFamily::Linux,
                uses_shell_indirection: false,
                clang_is_default: true,
                exe_extensions: &[],
            })
        } else if cfg!(target_os = "freebsd") {
            Ok(Platform {
                family: OsFamily::FreeBsd,
                uses_shell_indirection: false,
                clang_is_default: true,
                exe_extensions: &[],
            })
        } else {
            Err(BuildError::Workspace(format!(
                "unsupported host platform `{}`; supported: windows, linux, freebsd",
                std::env::consts::OS
            )))
        }
    }

    /// Python interpreter name expected on this platform.
    pub fn python(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => "python",
            _ => "python3",
        }
    }

    /// File name of the monolithic static library artifact.
    pub fn static_lib_name(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => "v8_monolithic.lib",
            _ => "libv8_monolithic.a",
        }
    }

    /// File name of the component-build shared library artifact.
    pub fn shared_lib_name(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => "v8.dll",
            _ => "libv8.so",
        }
    }
}

/// User-supplied build options, immutable once the pipeline begins.
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfiguration {
    /// Workspace root; relative paths are resolved against the current
    /// directory before any stage runs.
    pub workspace: PathBuf,

    pub link_mode: LinkMode,
    pub build_mode: BuildMode,

    /// Optional line-oriented GN argument override file.
    pub gn_args_file: Option<PathBuf>,

    /// Alternate source repository; when set, the fetched checkout is
    /// redirected to this remote before the revision checkout.
    pub source_url: Option<String>,

    /// Branch, tag, or commit to check out.
    pub revision: String,

    /// Force clang even where it is not the platform default (Windows).
    pub use_clang: bool,

    /// Build ICU-backed internationalization support.
    pub i18n: bool,

    /// Build against the bundled libc++ instead of the system C++ library.
    pub custom_libcxx: bool,
}
