//! Execution-environment composition and prerequisite resolution.
//!
//! The composed `ExecutionEnvironment` is an explicit, immutable value built
//! once per pipeline run and passed to every command invocation. The host
//! process environment is never mutated: depot_tools is prepended to a copy
//! of `PATH`, so toolchain-local executables shadow same-named system ones
//! only for the processes this orchestrator spawns.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};
use crate::models::{OsFamily, Platform};

/// Tools that must exist before the bootstrap stage can run.
pub fn pre_bootstrap_tools(platform: &Platform) -> Vec<&'static str> {
    vec!["git", platform.python()]
}

/// Tools provided by depot_tools, checkable only after bootstrap.
pub const TOOLCHAIN_TOOLS: &[&str] = &["gclient", "fetch", "gn", "ninja"];

/// Immutable name-to-value environment map for spawned commands.
///
/// Backed by a sorted map so iteration order (and therefore anything derived
/// from it, like logs) is deterministic.
#[derive(Debug, Clone)]
pub struct ExecutionEnvironment {
    vars: BTreeMap<String, String>,
    path_key: String,
    exe_extensions: &'static [&'static str],
}

impl ExecutionEnvironment {
    /// Compose the environment for one pipeline run.
    ///
    /// Inherits the host environment, prepends `depot_tools_dir` to the
    /// search path, and applies platform-conditional overrides (Windows:
    /// `DEPOT_TOOLS_WIN_TOOLCHAIN=0`, disabling the Google-internal
    /// toolchain auto-download).
    pub fn compose(depot_tools_dir: &Path, platform: &Platform) -> Self {
        Self::compose_from(env::vars().collect(), depot_tools_dir, platform)
    }

    fn compose_from(
        mut vars: BTreeMap<String, String>,
        depot_tools_dir: &Path,
        platform: &Platform,
    ) -> Self {
        // Windows conventionally spells the variable `Path`, and its spawn
        // environment is case-insensitive: the augmented value must land
        // under the inherited spelling or the un-augmented one wins in the
        // child.
        let path_key = search_path_key(&vars, platform);

        let inherited = vars.get(&path_key).cloned().unwrap_or_default();
        let mut entries = vec![depot_tools_dir.to_path_buf()];
        entries.extend(env::split_paths(&inherited));
        match env::join_paths(&entries) {
            Ok(joined) => {
                vars.insert(path_key.clone(), joined.to_string_lossy().into_owned());
            }
            Err(e) => log::warn!(
                "cannot prepend {} to the search path ({e}); toolchain-local \
                 executables will not shadow system ones",
                depot_tools_dir.display()
            ),
        }

        if platform.family == OsFamily::Windows {
            vars.insert("DEPOT_TOOLS_WIN_TOOLCHAIN".to_string(), "0".to_string());
        }

        ExecutionEnvironment {
            vars,
            path_key,
            exe_extensions: platform.exe_extensions,
        }
    }

    /// All variables, sorted by name.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Resolve a tool name against the composed search path, honoring
    /// platform executable extensions (`.exe`/`.bat`/`.cmd` on Windows).
    pub fn resolve(&self, tool: &str) -> Option<PathBuf> {
        let path = self.vars.get(&self.path_key)?;
        for dir in env::split_paths(path) {
            let bare = dir.join(tool);
            if bare.is_file() {
                return Some(bare);
            }
            for ext in self.exe_extensions {
                let candidate = dir.join(format!("{tool}{ext}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Verify that every listed tool resolves; returns the full list of
    /// missing names rather than failing on the first, so the user sees
    /// everything to install in one pass.
    pub fn check_prerequisites(&self, tools: &[&str]) -> Result<()> {
        let mut missing = Vec::new();
        for tool in tools {
            match self.resolve(tool) {
                Some(path) => log::debug!("prerequisite `{}` -> {}", tool, path.display()),
                None => missing.push((*tool).to_string()),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BuildError::MissingPrerequisites(missing))
        }
    }
}

/// Name of the search-path variable as the inherited environment spells it.
/// Windows matches case-insensitively (`Path`, `PATH`, ...); elsewhere the
/// spelling is exactly `PATH`.
fn search_path_key(vars: &BTreeMap<String, String>, platform: &Platform) -> String {
    if platform.family == OsFamily::Windows {
        if let Some(key) = vars.keys().find(|k| k.eq_ignore_ascii_case("PATH")) {
            return key.clone();
        }
    }
    "PATH".to_string()
}
