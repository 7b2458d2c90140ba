//! The six concrete stages of the V8 build pipeline.
//!
//! Stage bodies only sequence external tools; nothing here compiles
//! anything. Command construction pulls its paths from the `Workspace` and
//! its flags from the `BuildConfiguration` captured at pipeline definition
//! time.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::environment::{ExecutionEnvironment, TOOLCHAIN_TOOLS};
use crate::error::{BuildError, Result};
use crate::executor::{self, invocation, CommandInvocation};
use crate::gn_args;
use crate::models::{BuildConfiguration, BuildMode, LinkMode, Platform};
use crate::pipeline::PipelineStage;
use crate::workspace::Workspace;

/// Upstream depot_tools repository.
pub const DEPOT_TOOLS_URL: &str =
    "https://chromium.googlesource.com/chromium/tools/depot_tools.git";

/// Remote alias used when building from an alternate source repository.
pub const FORK_REMOTE: &str = "forked";

/// Stage 1: clone depot_tools and let `gclient` self-bootstrap its pinned
/// dependencies. Skipped wholesale once `depot_tools/` exists.
pub struct BootstrapStage;

#[async_trait]
impl PipelineStage for BootstrapStage {
    fn name(&self) -> &'static str {
        "bootstrap"
    }

    fn completion_marker(&self, workspace: &Workspace) -> Option<PathBuf> {
        Some(workspace.depot_tools_dir())
    }

    async fn execute(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        let target = workspace.depot_tools_dir();
        let clone = CommandInvocation::new(
            "git",
            [
                "clone".to_string(),
                DEPOT_TOOLS_URL.to_string(),
                target.to_string_lossy().into_owned(),
            ],
            workspace.root(),
        );
        executor::execute(&clone, env, &workspace.platform).await?;

        // First bare gclient run downloads depot_tools' own toolchain.
        let bootstrap = invocation("gclient", &[], workspace.root());
        executor::execute(&bootstrap, env, &workspace.platform).await
    }
}

/// Stage 2: verify the executables the bootstrap stage should have put on
/// the search path. Always runs; the check is cheap and the tools only
/// exist after stage 1 completes.
pub struct VerifyToolchainStage;

#[async_trait]
impl PipelineStage for VerifyToolchainStage {
    fn name(&self) -> &'static str {
        "verify-toolchain"
    }

    async fn execute(&self, _workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        env.check_prerequisites(TOOLCHAIN_TOOLS)
    }
}

/// Stage 3: fetch the V8 source tree, optionally redirecting the checkout
/// to an alternate repository, then check out the configured revision.
/// Skipped wholesale once `v8/` exists.
pub struct FetchSourceStage {
    source_url: Option<String>,
    revision: String,
}

impl FetchSourceStage {
    pub fn new(config: &BuildConfiguration) -> Self {
        FetchSourceStage {
            source_url: config.source_url.clone(),
            revision: config.revision.clone(),
        }
    }
}

#[async_trait]
impl PipelineStage for FetchSourceStage {
    fn name(&self) -> &'static str {
        "fetch-source"
    }

    fn completion_marker(&self, workspace: &Workspace) -> Option<PathBuf> {
        Some(workspace.source_dir())
    }

    async fn execute(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        let fetch = invocation("fetch", &["v8"], workspace.root());
        executor::execute(&fetch, env, &workspace.platform).await?;

        let src = workspace.source_dir();
        if let Some(url) = &self.source_url {
            reconcile_fork_remote(&src, url, workspace, env).await?;
            let git_fetch = invocation("git", &["fetch", FORK_REMOTE], &src);
            executor::execute(&git_fetch, env, &workspace.platform).await?;
        }

        let checkout = invocation("git", &["checkout", &self.revision], &src);
        executor::execute(&checkout, env, &workspace.platform).await
    }
}

/// Outcome of the non-fatal remote-alias probe. "Not found" is an expected
/// answer, not a failure; any other nonzero exit stays fatal.
#[derive(Debug, PartialEq, Eq)]
enum RemoteProbe {
    Found(String),
    NotFound,
}

async fn probe_fork_remote(
    src: &Path,
    workspace: &Workspace,
    env: &ExecutionEnvironment,
) -> Result<RemoteProbe> {
    let inv = invocation("git", &["remote", "get-url", FORK_REMOTE], src);
    let out = executor::probe(&inv, env, &workspace.platform).await?;
    match out.code {
        0 => Ok(RemoteProbe::Found(out.stdout)),
        // git exits 2 for "no such remote".
        2 => Ok(RemoteProbe::NotFound),
        code => Err(BuildError::CommandFailed {
            command: inv.command_line(),
            dir: src.to_path_buf(),
            code,
        }),
    }
}

/// Point the fork alias at `url`, updating an existing alias in place
/// instead of tripping the tool's duplicate-alias error.
async fn reconcile_fork_remote(
    src: &Path,
    url: &str,
    workspace: &Workspace,
    env: &ExecutionEnvironment,
) -> Result<()> {
    match probe_fork_remote(src, workspace, env).await? {
        RemoteProbe::Found(existing) if existing == url => {
            log::debug!("remote `{FORK_REMOTE}` already points at {url}");
            Ok(())
        }
        RemoteProbe::Found(existing) => {
            log::info!("remote `{FORK_REMOTE}` points at {existing}, updating to {url}");
            let set_url = invocation("git", &["remote", "set-url", FORK_REMOTE, url], src);
            executor::execute(&set_url, env, &workspace.platform).await
        }
        RemoteProbe::NotFound => {
            let add = invocation("git", &["remote", "add", FORK_REMOTE, url], src);
            executor::execute(&add, env, &workspace.platform).await
        }
    }
}

/// Stage 4: synchronize the checkout's pinned dependencies. `gclient sync`
/// is idempotent, so this always runs.
pub struct SyncDepsStage;

#[async_trait]
impl PipelineStage for SyncDepsStage {
    fn name(&self) -> &'static str {
        "sync-deps"
    }

    async fn execute(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        let sync = invocation("gclient", &["sync"], &workspace.source_dir());
        executor::execute(&sync, env, &workspace.platform).await
    }
}

/// Stage 5: generate ninja build files from the composed GN arguments.
pub struct GenerateStage {
    build_mode: BuildMode,
    gn_args: Vec<String>,
}

impl GenerateStage {
    /// The argument list is composed once, here, so the stage definition
    /// (and anything logged about it) is fixed before the pipeline runs.
    pub fn new(config: &BuildConfiguration, platform: &Platform) -> Self {
        GenerateStage {
            build_mode: config.build_mode,
            gn_args: gn_args::build_configure_args(config, platform),
        }
    }
}

#[async_trait]
impl PipelineStage for GenerateStage {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn execute(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        let out_rel = Workspace::out_dir_relative(self.build_mode);
        let args_value = format!("--args={}", self.gn_args.join(" "));
        let gen = CommandInvocation::new(
            "gn",
            ["gen".to_string(), out_rel, args_value],
            workspace.source_dir(),
        );
        executor::execute(&gen, env, &workspace.platform).await
    }
}

/// Stage 6: compile the link-mode-selected target with ninja.
pub struct CompileStage {
    build_mode: BuildMode,
    link_mode: LinkMode,
}

impl CompileStage {
    pub fn new(config: &BuildConfiguration) -> Self {
        CompileStage {
            build_mode: config.build_mode,
            link_mode: config.link_mode,
        }
    }
}

#[async_trait]
impl PipelineStage for CompileStage {
    fn name(&self) -> &'static str {
        "compile"
    }

    async fn execute(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        let out_rel = Workspace::out_dir_relative(self.build_mode);
        let jobs = num_cpus::get().to_string();
        let compile = CommandInvocation::new(
            "ninja",
            [
                "-C".to_string(),
                out_rel,
                "-j".to_string(),
                jobs,
                self.link_mode.compile_target().to_string(),
            ],
            workspace.source_dir(),
        );
        executor::execute(&compile, env, &workspace.platform).await
    }
}
