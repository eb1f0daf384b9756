//! The per-test sandbox allocator.
//!
//! An allocator names its sandbox after the test it serves, creates it
//! lazily under the shared root, and removes it again on teardown. Layout:
//!
//! ```text
//! <root>/<Class>/<method>        first sandbox for this identity
//! <root>/<Class>/<method>2       next one, and so on
//! ```
//!
//! Creating the directory is what claims a name: `create_dir` fails when
//! anything already sits at the candidate path, and the loser moves on to
//! the next number. That holds across threads and against leftovers from
//! earlier runs.

use std::{
    fmt, fs, io,
    path::{Component, Path, PathBuf},
};

use {
    testdirs_config::SandboxConfig,
    tracing::{debug, warn},
};

use crate::{
    context::{CallerContext, ThreadNameContext, derive_name_from_context},
    error::{Error, Result},
    naming::test_prefix,
    paths::canonicalize_lenient,
    state::{Settings, settings},
};

/// Method name used when a runner reports a class-level (not per-method)
/// start.
const CLASS_LEVEL_METHOD_NAME: &str = "SandboxAllocator";

/// Allocates and cleans up one test's sandbox directory.
pub struct SandboxAllocator {
    settings: Settings,
    context: Box<dyn CallerContext + Send>,
    prefix: Option<String>,
    directory: Option<PathBuf>,
}

impl fmt::Debug for SandboxAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxAllocator")
            .field("root", &self.settings.root())
            .field("prefix", &self.prefix)
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl Default for SandboxAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxAllocator {
    /// An allocator using the process-wide settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(settings().clone())
    }

    /// An allocator with its own settings, independent of the process-wide
    /// ones. The counter stays shared.
    pub fn with_config(config: SandboxConfig) -> Result<Self> {
        Ok(Self::with_settings(Settings::new(config)?))
    }

    /// Shorthand for [`with_config`](Self::with_config) with only a root.
    pub fn in_root(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(SandboxConfig {
            root: Some(root.into()),
            ..Default::default()
        })
    }

    fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            context: Box::new(ThreadNameContext),
            prefix: None,
            directory: None,
        }
    }

    /// Replace the caller context consulted when no identity was set.
    #[must_use]
    pub fn with_caller_context(mut self, context: impl CallerContext + Send + 'static) -> Self {
        self.context = Box::new(context);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.settings.root()
    }

    /// The prefix, if one was set or derived already.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The sandbox, if it was created already.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Name the sandbox after a test. A `None` method means the runner
    /// reported a class-level start.
    ///
    /// The first prefix wins: once set (here or by the caller-context
    /// fallback) it is never replaced.
    pub fn set_identity(&mut self, method_name: Option<&str>, class_name: &str) {
        if self.prefix.is_some() {
            return;
        }
        let prefix = test_prefix(class_name, method_name.unwrap_or(CLASS_LEVEL_METHOD_NAME));
        debug!(prefix = %prefix, "sandbox identity set");
        self.prefix = Some(prefix);
    }

    /// The sandbox directory, created on first call.
    ///
    /// Every later call returns the same path. Without an identity the
    /// prefix is guessed from the caller context first.
    pub fn resolve_directory(&mut self) -> Result<&Path> {
        let directory = match self.directory.take() {
            Some(directory) => directory,
            None => self.allocate()?,
        };
        Ok(self.directory.insert(directory).as_path())
    }

    fn resolve_prefix(&mut self) -> String {
        let context = &self.context;
        let config = self.settings.config();
        self.prefix
            .get_or_insert_with(|| derive_name_from_context(&**context, config))
            .clone()
    }

    fn allocate(&mut self) -> Result<PathBuf> {
        let prefix = self.resolve_prefix();
        let root = self.settings.root();
        let max_attempts = self.settings.config().max_attempts;

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            if let Some(max) = max_attempts
                && attempt > max
            {
                return Err(Error::AttemptsExhausted {
                    prefix,
                    attempts: max,
                });
            }

            let candidate = candidate_path(root, &prefix, attempt);
            if !is_below(root, &candidate) {
                return Err(Error::path_resolution(
                    candidate,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("sandbox name {prefix:?} leaves the root {}", root.display()),
                    ),
                ));
            }
            if let Some(parent) = candidate.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| Error::directory_creation(parent, source))?;
            }

            match fs::create_dir(&candidate) {
                Ok(()) => {
                    debug!(path = %candidate.display(), attempt, "created sandbox");
                    return Ok(candidate);
                },
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %candidate.display(), attempt, "sandbox name taken, retrying");
                },
                Err(source) => return Err(Error::directory_creation(candidate, source)),
            }
        }
    }

    /// The sandbox joined with `segments`, canonicalized.
    ///
    /// Paths that resolve outside the sandbox, through `..` or a symlink,
    /// are rejected with [`Error::PathResolution`].
    pub fn build_path<I, S>(&mut self, segments: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let sandbox = self.resolve_directory()?.to_path_buf();
        let mut joined = sandbox.clone();
        for segment in segments {
            joined.push(segment);
        }

        let canonical_sandbox =
            fs::canonicalize(&sandbox).map_err(|source| Error::path_resolution(&sandbox, source))?;
        let resolved =
            canonicalize_lenient(&joined).map_err(|source| Error::path_resolution(&joined, source))?;

        if !resolved.starts_with(&canonical_sandbox) {
            return Err(Error::path_resolution(
                joined,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{} is outside the sandbox {}",
                        resolved.display(),
                        canonical_sandbox.display()
                    ),
                ),
            ));
        }
        Ok(resolved)
    }

    /// Create an empty file (and its parent directories) unless it exists.
    /// An existing file is left as is; a directory in its place is an
    /// [`Error::FileCreation`].
    pub fn create_file<I, S>(&mut self, segments: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let path = self.build_path(segments)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::file_creation(&path, source))?;
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => debug!(path = %path.display(), "created sandbox file"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && !path.is_dir() => {},
            Err(source) => return Err(Error::file_creation(path, source)),
        }
        Ok(path)
    }

    /// Create a directory and any missing ancestors inside the sandbox.
    pub fn create_directory<I, S>(&mut self, segments: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let path = self.build_path(segments)?;
        fs::create_dir_all(&path).map_err(|source| Error::directory_creation(&path, source))?;
        Ok(path)
    }

    /// Remove the sandbox tree, if one was ever created.
    ///
    /// Best effort: failures are logged and swallowed, and a tree that is
    /// already gone is not an error. Teardown never fails a test.
    ///
    /// Once the tree is gone the cached directory is forgotten, so a later
    /// [`resolve_directory`](Self::resolve_directory) allocates a fresh one
    /// under the same prefix. A tree that could not be removed stays cached.
    pub fn teardown(&mut self) {
        let Some(directory) = &self.directory else {
            return;
        };
        match fs::remove_dir_all(directory) {
            Ok(()) => debug!(path = %directory.display(), "removed sandbox"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => {
                warn!(path = %directory.display(), error = %e, "failed to remove sandbox");
                return;
            },
        }
        self.directory = None;
    }
}

/// Whether `candidate` names an entry strictly inside `root` using only
/// plain path segments.
fn is_below(root: &Path, candidate: &Path) -> bool {
    candidate.strip_prefix(root).is_ok_and(|rest| {
        rest.components().next().is_some()
            && rest.components().all(|c| matches!(c, Component::Normal(_)))
    })
}

/// `root/prefix` for the first attempt, `root/prefix<n>` after that.
fn candidate_path(root: &Path, prefix: &str, attempt: u32) -> PathBuf {
    if attempt == 1 {
        root.join(prefix)
    } else {
        root.join(format!("{prefix}{attempt}"))
    }
}
