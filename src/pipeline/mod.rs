//! Staged pipeline sequencing with idempotency markers.
//!
//! The sequencer runs stages strictly in declaration order. A stage whose
//! completion marker already exists on disk is skipped entirely, not
//! re-verified; the first failure aborts the whole sequence and is reported
//! upward tagged with the failing stage's name. Retry and rollback are
//! deliberately absent: failure handling happens at whole-pipeline
//! granularity in the workspace controller.

pub mod stages;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::environment::ExecutionEnvironment;
use crate::error::{BuildError, Result};
use crate::models::{BuildConfiguration, Platform};
use crate::workspace::Workspace;

/// One named, ordered, idempotent unit of the build pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Path whose existence marks this stage as already complete. Stages
    /// without a marker always run (their tools are themselves idempotent).
    fn completion_marker(&self, _workspace: &Workspace) -> Option<PathBuf> {
        None
    }

    async fn execute(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()>;
}

/// Executes a fixed list of stages against one workspace.
pub struct StageSequencer {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl StageSequencer {
    pub fn new(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        StageSequencer { stages }
    }

    /// The fixed six-stage V8 pipeline for the given configuration.
    pub fn standard(config: &BuildConfiguration, platform: &Platform) -> Self {
        StageSequencer::new(vec![
            Box::new(stages::BootstrapStage),
            Box::new(stages::VerifyToolchainStage),
            Box::new(stages::FetchSourceStage::new(config)),
            Box::new(stages::SyncDepsStage),
            Box::new(stages::GenerateStage::new(config, platform)),
            Box::new(stages::CompileStage::new(config)),
        ])
    }

    /// Run every stage in order. Returns at the first failure, wrapped with
    /// the failing stage's name.
    pub async fn run(&self, workspace: &Workspace, env: &ExecutionEnvironment) -> Result<()> {
        for stage in &self.stages {
            if let Some(marker) = stage.completion_marker(workspace) {
                if marker.exists() {
                    log::info!(
                        "stage `{}` already satisfied ({} exists), skipping",
                        stage.name(),
                        marker.display()
                    );
                    continue;
                }
            }

            log::info!("stage `{}` starting", stage.name());
            stage
                .execute(workspace, env)
                .await
                .map_err(|e| BuildError::StageFailed {
                    stage: stage.name(),
                    source: Box::new(e),
                })?;
            log::info!("stage `{}` complete", stage.name());
        }
        Ok(())
    }
}
