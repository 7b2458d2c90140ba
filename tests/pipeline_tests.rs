//! Integration tests for the pipeline controller: the workspace must end
//! fully built or absent, never in between.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use v8forge::environment::ExecutionEnvironment;
use v8forge::error::BuildError;
use v8forge::models::{BuildConfiguration, BuildMode, LinkMode, Platform};
use v8forge::pipeline::{PipelineStage, StageSequencer};
use v8forge::workspace::{self, PipelineOutcome, Workspace};

fn config_at(root: &Path) -> BuildConfiguration {
    BuildConfiguration {
        workspace: root.to_path_buf(),
        link_mode: LinkMode::Static,
        build_mode: BuildMode::Release,
        gn_args_file: None,
        source_url: None,
        revision: "main".to_string(),
        use_clang: false,
        i18n: true,
        custom_libcxx: true,
    }
}

/// Pre-bootstrap prerequisites (git, python3) must resolve for the
/// controller to reach the stages at all; skip on exotic hosts.
fn prerequisites_available(platform: &Platform) -> bool {
    let env = ExecutionEnvironment::compose(Path::new("/nonexistent"), platform);
    env.resolve("git").is_some() && env.resolve(platform.python()).is_some()
}

struct FailingStage {
    code: i32,
}

#[async_trait]
impl PipelineStage for FailingStage {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn execute(&self, workspace: &Workspace, _env: &ExecutionEnvironment) -> v8forge::Result<()> {
        Err(BuildError::CommandFailed {
            command: "ninja -C out.gn/x64.release v8_monolithic".to_string(),
            dir: workspace.source_dir(),
            code: self.code,
        })
    }
}

/// Writes the expected artifact, standing in for the whole build chain.
struct ArtifactWritingStage;

#[async_trait]
impl PipelineStage for ArtifactWritingStage {
    fn name(&self) -> &'static str {
        "artifact-writer"
    }

    async fn execute(&self, workspace: &Workspace, _env: &ExecutionEnvironment) -> v8forge::Result<()> {
        let out = workspace.out_dir(BuildMode::Release).join("obj");
        std::fs::create_dir_all(&out)?;
        std::fs::write(out.join(workspace.platform.static_lib_name()), "archive")?;
        std::fs::create_dir_all(workspace.header_dir())?;
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_run_removes_workspace_root() {
    let platform = Platform::detect().unwrap();
    if !prerequisites_available(&platform) {
        eprintln!("skipping: git/python3 not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ws");
    let config = config_at(&root);

    let sequencer = StageSequencer::new(vec![Box::new(FailingStage { code: 9 })]);
    let outcome = workspace::run_pipeline_with(&config, platform, sequencer).await;

    match outcome {
        PipelineOutcome::CleanedUp { ref cause } => {
            assert!(cause.to_string().contains("failing"));
        }
        other => panic!("expected CleanedUp, got {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 9);
    assert!(!root.exists(), "failed run must leave no workspace behind");
}

#[tokio::test]
async fn test_successful_run_retains_workspace_and_reports_artifact() {
    let platform = Platform::detect().unwrap();
    if !prerequisites_available(&platform) {
        eprintln!("skipping: git/python3 not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ws");
    let config = config_at(&root);

    let sequencer = StageSequencer::new(vec![Box::new(ArtifactWritingStage)]);
    let outcome = workspace::run_pipeline_with(&config, platform, sequencer).await;

    let expected = Workspace::resolve(&root, platform).unwrap();
    match outcome {
        PipelineOutcome::ArtifactReady { ref artifact, ref headers } => {
            assert_eq!(*artifact, expected.artifact_path(&config));
            assert!(artifact.exists());
            assert_eq!(*headers, expected.header_dir());
        }
        other => panic!("expected ArtifactReady, got {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 0);
    assert!(root.exists(), "successful run must retain the workspace");
}

#[tokio::test]
async fn test_marker_satisfied_stage_launches_nothing() {
    let platform = Platform::detect().unwrap();
    if !prerequisites_available(&platform) {
        eprintln!("skipping: git/python3 not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ws");
    let config = config_at(&root);

    // A stage guarded by a pre-satisfied marker that would fail if run.
    struct GuardedFailingStage {
        marker: PathBuf,
    }

    #[async_trait]
    impl PipelineStage for GuardedFailingStage {
        fn name(&self) -> &'static str {
            "guarded"
        }

        fn completion_marker(&self, _workspace: &Workspace) -> Option<PathBuf> {
            Some(self.marker.clone())
        }

        async fn execute(
            &self,
            _workspace: &Workspace,
            _env: &ExecutionEnvironment,
        ) -> v8forge::Result<()> {
            panic!("stage with satisfied marker must not execute");
        }
    }

    std::fs::create_dir_all(&root).unwrap();
    let marker = root.join("checkout-done");
    std::fs::write(&marker, "").unwrap();

    let sequencer = StageSequencer::new(vec![Box::new(GuardedFailingStage { marker })]);
    let outcome = workspace::run_pipeline_with(&config, platform, sequencer).await;
    assert_eq!(outcome.exit_code(), 0);
}
