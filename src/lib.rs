//! v8forge: a bootstrap-and-build orchestrator for the V8 JavaScript
//! engine.
//!
//! Given an isolated workspace directory, the pipeline clones depot_tools,
//! fetches the V8 source tree, synchronizes its dependencies, generates
//! ninja build files from composed GN arguments, and compiles the requested
//! library target, sequencing and supervising the external tools (git,
//! gclient, fetch, gn, ninja) without ever compiling anything itself.
//! Re-runs are tolerated through per-stage idempotency markers, and any
//! failure removes the whole workspace so a run ends fully built or absent.
//!
//! Module map:
//! - **error**: unified `BuildError` taxonomy and exit-code mapping
//! - **models**: build configuration and the platform descriptor
//! - **logger**: console backend for the `log` facade
//! - **environment**: immutable composed execution environment and
//!   prerequisite resolution
//! - **executor**: streaming external-process supervision
//! - **gn_args**: deterministic GN configure-argument composition
//! - **pipeline**: stage trait, sequencer, and the six concrete stages
//! - **workspace**: layout, lifecycle, and all-or-nothing teardown

pub mod environment;
pub mod error;
pub mod executor;
pub mod gn_args;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod workspace;

pub use error::{BuildError, Result};
pub use models::{BuildConfiguration, BuildMode, LinkMode, OsFamily, Platform};
pub use workspace::{PipelineOutcome, Workspace};
