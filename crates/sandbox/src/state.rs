//! Process-wide sandbox state: the shared root and the name counter.
//!
//! Both live for the whole process. The settings are fixed by the first
//! [`configure`] call or, failing that, discovered on first use. The counter
//! starts at 1 and only ever grows.

use std::{
    path::{Path, PathBuf},
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    testdirs_config::{SandboxConfig, Severity, discover_and_load, validate},
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);
static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Take the next value of the process-wide counter.
///
/// No two calls in one process ever return the same value, whichever
/// threads they come from.
pub fn next_counter() -> u64 {
    TEST_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A validated [`SandboxConfig`] with its root made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    root: PathBuf,
    config: SandboxConfig,
}

impl Settings {
    /// Validate `config` and pin its root. Validation warnings are logged.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let report = validate(&config);
        for diagnostic in &report.diagnostics {
            if diagnostic.severity == Severity::Warning {
                warn!(field = diagnostic.field, "{}", diagnostic.message);
            }
        }
        report.into_result()?;
        Ok(Self::new_unchecked(config))
    }

    fn new_unchecked(config: SandboxConfig) -> Self {
        let root = config.resolved_root();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root, config }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

/// Fix the process-wide settings. Must run before the first sandbox is
/// allocated through [`settings`].
///
/// Calling it again with the same root is accepted (the first settings stay
/// in force); a different root fails with [`Error::RootAlreadyConfigured`].
pub fn configure(config: SandboxConfig) -> Result<&'static Settings> {
    let candidate = Settings::new(config)?;
    let requested = candidate.clone();
    let installed = SETTINGS.get_or_init(|| candidate);

    if installed.root != requested.root {
        return Err(Error::RootAlreadyConfigured {
            current: installed.root.clone(),
        });
    }
    if installed.config != requested.config {
        warn!(
            root = %installed.root.display(),
            "sandbox settings already configured, keeping the first ones"
        );
    }
    debug!(root = %installed.root.display(), "sandbox root configured");
    Ok(installed)
}

/// The process-wide settings, discovered from config files and `TESTDIRS_*`
/// variables if [`configure`] was never called.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| {
        let config = discover_and_load();
        match Settings::new(config) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "invalid sandbox config, using defaults");
                Settings::new_unchecked(SandboxConfig::default())
            },
        }
    })
}

/// The shared root every sandbox in this process is created under.
pub fn root() -> &'static Path {
    settings().root()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{collections::HashSet, thread};

    use super::*;

    #[test]
    fn counter_values_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| (0..100).map(|_| next_counter()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(value >= 1);
                assert!(seen.insert(value), "counter value {value} handed out twice");
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn counter_only_grows() {
        let first = next_counter();
        let second = next_counter();
        assert!(second > first);
    }

    #[test]
    fn settings_make_root_absolute() {
        let settings = Settings::new(SandboxConfig {
            root: Some(PathBuf::from("target/sandboxes")),
            ..Default::default()
        })
        .unwrap();
        assert!(settings.root().is_absolute());
        assert!(settings.root().ends_with("target/sandboxes"));
    }

    #[test]
    fn settings_reject_invalid_config() {
        let err = Settings::new(SandboxConfig {
            max_attempts: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
