//! Workspace lifecycle: layout, advisory checks, and all-or-nothing
//! teardown.
//!
//! The controller has exactly two terminal states. Either every stage
//! succeeded and the workspace holds the artifact (`ArtifactReady`), or
//! something failed and the entire workspace root has been removed
//! (`CleanedUp`). No partially-torn-down terminal state exists: a failed
//! run leaves nothing behind, so the next invocation starts clean.

use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::{self, ExecutionEnvironment};
use crate::error::{BuildError, Result};
use crate::models::{BuildConfiguration, BuildMode, LinkMode, OsFamily, Platform};
use crate::pipeline::StageSequencer;

pub const DEPOT_TOOLS_SUBDIR: &str = "depot_tools";
pub const SOURCE_SUBDIR: &str = "v8";

/// Windows tooling starts misbehaving well before MAX_PATH; warn early.
const LONG_PATH_WARN_THRESHOLD: usize = 150;

/// One pipeline run's workspace: an absolute root plus the derived layout
/// of every checkout and output directory beneath it.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    pub platform: Platform,
}

impl Workspace {
    /// Resolve the configured root to an absolute path. The directory
    /// itself may not exist yet; creation happens at pipeline start.
    pub fn resolve(root: &Path, platform: Platform) -> Result<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Workspace { root, platform })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn depot_tools_dir(&self) -> PathBuf {
        self.root.join(DEPOT_TOOLS_SUBDIR)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_SUBDIR)
    }

    /// Output directory relative to the source tree, as passed to
    /// `gn gen` and `ninja -C`. Forward slashes are fine on every
    /// supported platform.
    pub fn out_dir_relative(mode: BuildMode) -> String {
        format!("out.gn/x64.{}", mode.as_str())
    }

    pub fn out_dir(&self, mode: BuildMode) -> PathBuf {
        self.source_dir()
            .join("out.gn")
            .join(format!("x64.{}", mode.as_str()))
    }

    /// Public header directory shipped with the artifact.
    pub fn header_dir(&self) -> PathBuf {
        self.source_dir().join("include")
    }

    /// Expected artifact location for the link mode on this platform.
    pub fn artifact_path(&self, config: &BuildConfiguration) -> PathBuf {
        let out = self.out_dir(config.build_mode);
        match config.link_mode {
            LinkMode::Static => out.join("obj").join(self.platform.static_lib_name()),
            LinkMode::Dll => out.join(self.platform.shared_lib_name()),
        }
    }
}

/// Terminal pipeline outcomes.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// All stages succeeded; the workspace is retained.
    ArtifactReady { artifact: PathBuf, headers: PathBuf },
    /// A stage failed; the workspace root has been removed (best effort).
    CleanedUp { cause: BuildError },
}

impl PipelineOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineOutcome::ArtifactReady { .. } => 0,
            PipelineOutcome::CleanedUp { cause } => cause.exit_code(),
        }
    }
}

/// Drive the whole pipeline for one configuration, owning setup and
/// failure teardown. Never returns an error: every failure resolves to
/// `CleanedUp`.
pub async fn run_pipeline(config: &BuildConfiguration, platform: Platform) -> PipelineOutcome {
    let sequencer = StageSequencer::standard(config, &platform);
    run_pipeline_with(config, platform, sequencer).await
}

/// Same as [`run_pipeline`] but with a caller-supplied stage list.
pub async fn run_pipeline_with(
    config: &BuildConfiguration,
    platform: Platform,
    sequencer: StageSequencer,
) -> PipelineOutcome {
    let workspace = match Workspace::resolve(&config.workspace, platform) {
        Ok(workspace) => workspace,
        // Nothing was created yet, so there is nothing to tear down.
        Err(cause) => return PipelineOutcome::CleanedUp { cause },
    };

    match run_stages(&workspace, &sequencer).await {
        Ok(()) => {
            let artifact = workspace.artifact_path(config);
            let headers = workspace.header_dir();
            log::info!("build complete");
            log::info!("artifact: {}", artifact.display());
            log::info!("headers:  {}", headers.display());
            PipelineOutcome::ArtifactReady { artifact, headers }
        }
        Err(cause) => {
            log::error!("pipeline failed: {cause}");
            teardown(&workspace);
            PipelineOutcome::CleanedUp { cause }
        }
    }
}

async fn run_stages(workspace: &Workspace, sequencer: &StageSequencer) -> Result<()> {
    warn_on_long_path(workspace);

    fs::create_dir_all(workspace.root())?;
    log::info!("workspace: {}", workspace.root().display());

    let env = ExecutionEnvironment::compose(&workspace.depot_tools_dir(), &workspace.platform);
    // First of the two prerequisite passes: externally-required tools,
    // checked before anything irreversible happens. The toolchain-provided
    // tools are verified by stage 2 once bootstrap has produced them.
    env.check_prerequisites(&environment::pre_bootstrap_tools(&workspace.platform))?;

    sequencer.run(workspace, &env).await
}

/// Remove the workspace root recursively, suppressing deletion errors. A
/// half-deleted workspace is acceptable: the next run recreates it from
/// scratch.
fn teardown(workspace: &Workspace) {
    let root = workspace.root();
    if !root.exists() {
        return;
    }
    log::warn!("removing workspace {} after failure", root.display());
    if let Err(e) = fs::remove_dir_all(root) {
        log::warn!("cleanup of {} incomplete: {e}", root.display());
    }
}

/// Informational only; long paths break some Windows build tools but the
/// user may know their setup tolerates it.
fn warn_on_long_path(workspace: &Workspace) {
    if workspace.platform.family != OsFamily::Windows {
        return;
    }
    let len = workspace.root().as_os_str().len();
    if len > LONG_PATH_WARN_THRESHOLD {
        log::warn!(
            "workspace path is {len} characters long; Windows build tools can fail past 260. \
             Consider a shorter workspace path such as C:\\build"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildMode, LinkMode, OsFamily};

    fn linux_platform() -> Platform {
        Platform {
            family: OsFamily::Linux,
            uses_shell_indirection: false,
            clang_is_default: true,
            exe_extensions: &[],
        }
    }

    fn windows_platform() -> Platform {
        Platform {
            family: OsFamily::Windows,
            uses_shell_indirection: true,
            clang_is_default: false,
            exe_extensions: &[".exe", ".bat", ".cmd"],
        }
    }

    fn config_at(root: &Path, link_mode: LinkMode, build_mode: BuildMode) -> BuildConfiguration {
        BuildConfiguration {
            workspace: root.to_path_buf(),
            link_mode,
            build_mode,
            gn_args_file: None,
            source_url: None,
            revision: "main".to_string(),
            use_clang: false,
            i18n: true,
            custom_libcxx: true,
        }
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let workspace =
            Workspace::resolve(Path::new("some_workspace"), linux_platform()).unwrap();
        assert!(workspace.root().is_absolute());
        assert!(workspace.root().ends_with("some_workspace"));
    }

    #[test]
    fn test_derived_layout() {
        let workspace = Workspace::resolve(Path::new("/ws"), linux_platform()).unwrap();
        assert_eq!(workspace.depot_tools_dir(), PathBuf::from("/ws/depot_tools"));
        assert_eq!(workspace.source_dir(), PathBuf::from("/ws/v8"));
        assert_eq!(
            workspace.out_dir(BuildMode::Release),
            PathBuf::from("/ws/v8/out.gn/x64.release")
        );
        assert_eq!(workspace.header_dir(), PathBuf::from("/ws/v8/include"));
        assert_eq!(Workspace::out_dir_relative(BuildMode::Debug), "out.gn/x64.debug");
    }

    #[test]
    fn test_static_artifact_path_linux() {
        let workspace = Workspace::resolve(Path::new("/ws"), linux_platform()).unwrap();
        let config = config_at(Path::new("/ws"), LinkMode::Static, BuildMode::Release);
        assert_eq!(
            workspace.artifact_path(&config),
            PathBuf::from("/ws/v8/out.gn/x64.release/obj/libv8_monolithic.a")
        );
    }

    #[test]
    fn test_shared_artifact_path_windows() {
        let workspace = Workspace::resolve(Path::new("/ws"), windows_platform()).unwrap();
        let config = config_at(Path::new("/ws"), LinkMode::Dll, BuildMode::Debug);
        assert_eq!(
            workspace.artifact_path(&config),
            PathBuf::from("/ws/v8/out.gn/x64.debug/v8.dll")
        );
    }

    #[test]
    fn test_teardown_removes_populated_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ws");
        fs::create_dir_all(root.join("v8/out.gn")).unwrap();
        fs::write(root.join("v8/DEPS"), "deps").unwrap();

        let workspace = Workspace::resolve(&root, linux_platform()).unwrap();
        teardown(&workspace);
        assert!(!root.exists());
    }

    #[test]
    fn test_teardown_tolerates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("never-created");
        let workspace = Workspace::resolve(&root, linux_platform()).unwrap();
        teardown(&workspace);
        assert!(!root.exists());
    }
}
