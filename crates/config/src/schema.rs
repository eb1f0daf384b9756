use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Type-name suffixes that mark a test type when the identity has to be
/// guessed from caller context.
pub const DEFAULT_TEST_SUFFIXES: &[&str] = &["Test", "Spec"];

/// Directory name used under the system temp dir when no root is configured.
const DEFAULT_ROOT_DIR: &str = "testdirs";

/// Settings shared by every sandbox allocated in the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// Parent of every sandbox. `None` means [`default_root`].
    pub root: Option<PathBuf>,
    /// Suffixes recognized by the caller-context fallback. See
    /// [`SandboxConfig::is_test_type`] for how they match.
    pub test_suffixes: Vec<String>,
    /// Upper bound on collision retries. `None` keeps retrying forever.
    pub max_attempts: Option<u32>,
    /// Leave the sandbox of a failed test on disk.
    pub retain_on_failure: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: None,
            test_suffixes: DEFAULT_TEST_SUFFIXES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_attempts: None,
            retain_on_failure: false,
        }
    }
}

impl SandboxConfig {
    /// The configured root, or [`default_root`] when none is set.
    #[must_use]
    pub fn resolved_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(default_root)
    }

    /// Returns `true` if `type_name` ends with one of the test suffixes as a
    /// whole word.
    ///
    /// A suffix matches exactly at the end of a CamelCase name
    /// (`AllocatorTest`), or in any ASCII case when it is the whole name or
    /// follows an `_` (`allocator_test`). `latest` and `Contest` do not match.
    #[must_use]
    pub fn is_test_type(&self, type_name: &str) -> bool {
        self.test_suffixes
            .iter()
            .any(|suffix| ends_with_word(type_name, suffix))
    }
}

fn ends_with_word(name: &str, suffix: &str) -> bool {
    if suffix.is_empty() || name.len() < suffix.len() {
        return false;
    }
    let split = name.len() - suffix.len();
    if !name.is_char_boundary(split) {
        return false;
    }
    let (head, tail) = name.split_at(split);
    if !tail.eq_ignore_ascii_case(suffix) {
        return false;
    }
    match head.chars().next_back() {
        None | Some('_') => true,
        Some(_) => tail == suffix && suffix.starts_with(|c: char| c.is_uppercase()),
    }
}

/// `<system temp dir>/testdirs`.
#[must_use]
pub fn default_root() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_ROOT_DIR)
}
