//! Configuration loading, env overrides, and validation for sandbox allocation.
//!
//! Config files: `testdirs.toml`, `testdirs.yaml`, `testdirs.yml`, or
//! `testdirs.json`. Searched in `./` then in `$CARGO_MANIFEST_DIR`.
//!
//! `TESTDIRS_*` environment variables override whatever the file says.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, discover_and_load, find_config_file, load_config},
    schema::{DEFAULT_TEST_SUFFIXES, SandboxConfig, default_root},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
