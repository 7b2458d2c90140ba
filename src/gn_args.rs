//! GN configure-argument composition.
//!
//! Produces the deterministic `key=value` list handed to `gn gen`. User
//! overrides from the args file are appended verbatim after every computed
//! argument; GN's last-occurrence-wins convention makes position, not
//! de-duplication, the precedence mechanism.

use std::fs;

use crate::models::{BuildConfiguration, LinkMode, OsFamily, Platform};

/// Build the full GN argument list for the generate stage.
///
/// Pure with respect to its inputs: identical configuration and override
/// file content always yield an identical, order-stable sequence.
pub fn build_configure_args(config: &BuildConfiguration, platform: &Platform) -> Vec<String> {
    let mut args = vec![
        format!("is_debug={}", config.build_mode.is_debug()),
        "target_cpu=\"x64\"".to_string(),
        // Snapshot data compiled in; external startup files complicate
        // embedding for no benefit in this pipeline.
        "v8_use_external_startup_data=false".to_string(),
        // Upstream warning churn must not break downstream builds.
        "treat_warnings_as_errors=false".to_string(),
    ];

    match platform.family {
        OsFamily::Linux => args.push("is_clang=true".to_string()),
        OsFamily::FreeBsd => {
            args.push("is_clang=true".to_string());
            args.push("target_os=\"freebsd\"".to_string());
        }
        OsFamily::Windows => {
            // MSVC is the default; emit the override pair only when the
            // caller explicitly asked for clang.
            if config.use_clang {
                args.push("is_clang=true".to_string());
            }
        }
    }

    match config.link_mode {
        LinkMode::Static => {
            args.push("is_component_build=false".to_string());
            args.push("v8_monolithic=true".to_string());
        }
        LinkMode::Dll => {
            args.push("is_component_build=true".to_string());
            args.push("v8_monolithic=false".to_string());
        }
    }

    if !config.i18n {
        args.push("v8_enable_i18n_support=false".to_string());
    }
    if !config.custom_libcxx {
        args.push("use_custom_libcxx=false".to_string());
    }

    if let Some(path) = &config.gn_args_file {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let overrides = override_lines(&contents);
                log::info!(
                    "appending {} override(s) from {}",
                    overrides.len(),
                    path.display()
                );
                args.extend(overrides);
            }
            // Intentionally non-fatal: a missing override file downgrades to
            // a build without overrides, unlike every other error in the
            // pipeline.
            Err(e) => log::warn!(
                "GN args file {} is unreadable ({}); continuing without overrides",
                path.display(),
                e
            ),
        }
    }

    args
}

/// Non-empty, non-comment lines, trimmed, in file order.
fn override_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildMode, OsFamily, Platform};
    use std::io::Write;
    use std::path::PathBuf;

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

    fn base_config() -> BuildConfiguration {
        BuildConfiguration {
            workspace: PathBuf::from("v8_build"),
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

    #[test]
    fn test_static_release_on_clang_platform() {
        let args = build_configure_args(&base_config(), &linux_platform());
        assert_eq!(
            args,
            vec![
                "is_debug=false",
                "target_cpu=\"x64\"",
                "v8_use_external_startup_data=false",
                "treat_warnings_as_errors=false",
                "is_clang=true",
                "is_component_build=false",
                "v8_monolithic=true",
            ]
        );
    }

    #[test]
    fn test_dll_debug_flips_link_pair_and_debug_flag() {
        let mut config = base_config();
        config.link_mode = LinkMode::Dll;
        config.build_mode = BuildMode::Debug;
        let args = build_configure_args(&config, &linux_platform());
        assert!(args.contains(&"is_debug=true".to_string()));
        assert!(args.contains(&"is_component_build=true".to_string()));
        assert!(args.contains(&"v8_monolithic=false".to_string()));
    }

    #[test]
    fn test_windows_default_omits_clang_until_requested() {
        let mut config = base_config();
        let args = build_configure_args(&config, &windows_platform());
        assert!(!args.iter().any(|a| a.starts_with("is_clang")));

        config.use_clang = true;
        let args = build_configure_args(&config, &windows_platform());
        assert!(args.contains(&"is_clang=true".to_string()));
    }

    #[test]
    fn test_subsystem_opt_outs() {
        let mut config = base_config();
        config.i18n = false;
        config.custom_libcxx = false;
        let args = build_configure_args(&config, &linux_platform());
        assert!(args.contains(&"v8_enable_i18n_support=false".to_string()));
        assert!(args.contains(&"use_custom_libcxx=false".to_string()));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let config = base_config();
        let platform = linux_platform();
        assert_eq!(
            build_configure_args(&config, &platform),
            build_configure_args(&config, &platform)
        );
    }

    #[test]
    fn test_override_lines_filter_blank_and_comments() {
        let contents = "\n# a comment\nv8_enable_i18n_support=false\n   \n  v8_enable_webassembly=false  \n#another\n";
        assert_eq!(
            override_lines(contents),
            vec!["v8_enable_i18n_support=false", "v8_enable_webassembly=false"]
        );
    }

    #[test]
    fn test_override_file_appends_after_computed_args() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "v8_enable_i18n_support=false").unwrap();
        writeln!(file).unwrap();

        let mut config = base_config();
        config.gn_args_file = Some(file.path().to_path_buf());
        let args = build_configure_args(&config, &linux_platform());

        // Exactly one extra token, at the very end.
        assert_eq!(args.last().unwrap(), "v8_enable_i18n_support=false");
        let computed = build_configure_args(&base_config(), &linux_platform());
        assert_eq!(args.len(), computed.len() + 1);
    }

    #[test]
    fn test_missing_override_file_is_nonfatal() {
        let mut config = base_config();
        config.gn_args_file = Some(PathBuf::from("/no/such/override/file.txt"));
        let args = build_configure_args(&config, &linux_platform());
        assert_eq!(args, build_configure_args(&base_config(), &linux_platform()));
    }
}
