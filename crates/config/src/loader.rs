use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    schema::SandboxConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "testdirs.toml",
    "testdirs.yaml",
    "testdirs.yml",
    "testdirs.json",
];

const ENV_ROOT: &str = "TESTDIRS_ROOT";
const ENV_MAX_ATTEMPTS: &str = "TESTDIRS_MAX_ATTEMPTS";
const ENV_RETAIN_ON_FAILURE: &str = "TESTDIRS_RETAIN_ON_FAILURE";
const ENV_TEST_SUFFIXES: &str = "TESTDIRS_TEST_SUFFIXES";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SandboxConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply
/// `TESTDIRS_*` environment overrides.
///
/// Search order:
/// 1. `./testdirs.{toml,yaml,yml,json}` (working directory)
/// 2. `$CARGO_MANIFEST_DIR/testdirs.{toml,yaml,yml,json}` (crate under test)
///
/// A file that fails to load is reported and replaced by defaults.
pub fn discover_and_load() -> SandboxConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading sandbox config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load sandbox config, using defaults"
                );
                SandboxConfig::default()
            },
        }
    } else {
        debug!("no sandbox config file found, using defaults");
        SandboxConfig::default()
    };

    if let Err(e) = apply_env_overrides(&mut config) {
        warn!(error = %e, "ignoring invalid sandbox environment override");
    }
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(manifest_dir) = std::env::var_os("CARGO_MANIFEST_DIR") {
        dirs.push(PathBuf::from(manifest_dir));
    }
    find_config_in(&dirs)
}

fn find_config_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

/// Apply `TESTDIRS_*` variables from the process environment.
///
/// All or nothing: if any variable is invalid the config is left unchanged.
pub fn apply_env_overrides(config: &mut SandboxConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Same as [`apply_env_overrides`] with a custom lookup, so tests do not
/// have to mutate the process environment.
fn apply_env_overrides_with(
    config: &mut SandboxConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let root = lookup(ENV_ROOT)
        .filter(|v| !v.trim().is_empty())
        .map(|v| PathBuf::from(v.trim()));

    let max_attempts = match lookup(ENV_MAX_ATTEMPTS) {
        None => None,
        Some(raw) => match raw.trim() {
            "" | "unbounded" => Some(None),
            n => Some(Some(
                n.parse::<u32>()
                    .map_err(|_| Error::invalid_env(ENV_MAX_ATTEMPTS, n))?,
            )),
        },
    };

    let retain_on_failure = match lookup(ENV_RETAIN_ON_FAILURE) {
        None => None,
        Some(raw) => Some(
            parse_flag(&raw).ok_or_else(|| Error::invalid_env(ENV_RETAIN_ON_FAILURE, raw))?,
        ),
    };

    let test_suffixes = lookup(ENV_TEST_SUFFIXES).map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    });

    // Every variable parsed: only now touch the config.
    if let Some(root) = root {
        config.root = Some(root);
    }
    if let Some(max_attempts) = max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(retain_on_failure) = retain_on_failure {
        config.retain_on_failure = retain_on_failure;
    }
    if let Some(test_suffixes) = test_suffixes {
        config.test_suffixes = test_suffixes;
    }
    Ok(())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<SandboxConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}
