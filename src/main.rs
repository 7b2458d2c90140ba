use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use v8forge::models::{BuildConfiguration, BuildMode, LinkMode, Platform};
use v8forge::{logger, workspace};

/// Build V8 in an isolated workspace on Windows, Linux, or FreeBSD.
#[derive(Debug, Parser)]
#[command(name = "v8forge", version, about)]
struct Cli {
    /// Directory where all work is done; created if absent.
    #[arg(long, default_value = "v8_build")]
    workspace: PathBuf,

    /// "static" (monolithic .lib/.a) or "dll" (component/shared .dll/.so).
    #[arg(long, value_enum, default_value = "static")]
    build_type: LinkMode,

    /// "release" (optimized) or "debug" (with debug symbols).
    #[arg(long, value_enum, default_value = "release")]
    config: BuildMode,

    /// File with additional GN arguments, one key=value per line; blank
    /// lines and #-comments are ignored.
    #[arg(long)]
    gn_args_file: Option<PathBuf>,

    /// Build from this repository instead of upstream V8.
    #[arg(long)]
    source_url: Option<String>,

    /// Branch, tag, or commit to check out.
    #[arg(long, default_value = "main")]
    revision: String,

    /// Use clang even where it is not the platform default (Windows).
    #[arg(long)]
    use_clang: bool,

    /// Skip ICU-backed internationalization support.
    #[arg(long)]
    no_i18n: bool,

    /// Link against the system C++ library instead of the bundled libc++.
    #[arg(long)]
    no_custom_libcxx: bool,

    /// Enable debug-level diagnostics.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_configuration(self) -> BuildConfiguration {
        BuildConfiguration {
            workspace: self.workspace,
            link_mode: self.build_type,
            build_mode: self.config,
            gn_args_file: self.gn_args_file,
            source_url: self.source_url,
            revision: self.revision,
            use_clang: self.use_clang,
            i18n: !self.no_i18n,
            custom_libcxx: !self.no_custom_libcxx,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let platform = match Platform::detect() {
        Ok(platform) => platform,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let config = cli.into_configuration();
    log::info!(
        "starting V8 build: os={} type={} config={} revision={}",
        platform.family.as_str(),
        config.link_mode.as_str(),
        config.build_mode.as_str(),
        config.revision
    );
    match serde_json::to_string(&config).context("serializing resolved configuration") {
        Ok(json) => log::debug!("resolved configuration: {json}"),
        Err(e) => log::debug!("resolved configuration unavailable: {e:#}"),
    }

    let outcome = workspace::run_pipeline(&config, platform).await;
    let code = outcome.exit_code();
    // Exit codes are capped at u8 range; anything larger degrades to 1.
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
