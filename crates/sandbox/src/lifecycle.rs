//! Hooking sandboxes into a test's start and finish.
//!
//! Three ways in, from most to least manual:
//! - drive [`TestLifecycle`] from your own runner integration,
//! - wrap the test body with [`run_in_sandbox`],
//! - hold a [`SandboxGuard`] (or `sandbox!()`) for the test's duration.

use std::{
    ops::{Deref, DerefMut},
    panic::{self, AssertUnwindSafe},
};

use tracing::info;

use crate::allocator::SandboxAllocator;

/// How a test ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
}

impl TestOutcome {
    /// `Failed` while the current thread is unwinding from a panic.
    #[must_use]
    pub fn current() -> Self {
        if std::thread::panicking() {
            Self::Failed
        } else {
            Self::Passed
        }
    }
}

/// Callbacks a test runner fires around each test.
pub trait TestLifecycle {
    /// The test is about to run. `method_name` is `None` for class-level
    /// starts.
    fn test_started(&mut self, method_name: Option<&str>, class_name: &str);

    /// The test body returned or panicked.
    fn test_finished(&mut self, outcome: TestOutcome);
}

impl TestLifecycle for SandboxAllocator {
    fn test_started(&mut self, method_name: Option<&str>, class_name: &str) {
        self.set_identity(method_name, class_name);
    }

    fn test_finished(&mut self, outcome: TestOutcome) {
        if outcome == TestOutcome::Failed && self.settings().config().retain_on_failure {
            if let Some(directory) = self.directory() {
                info!(path = %directory.display(), "keeping sandbox of failed test");
            }
            return;
        }
        self.teardown();
    }
}

/// Who a test is: the `class` and `method` halves of its sandbox name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    pub class_name: String,
    pub method_name: Option<String>,
}

impl TestIdentity {
    #[must_use]
    pub fn new(class_name: impl Into<String>, method_name: Option<&str>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.map(String::from),
        }
    }

    /// Split a function path such as `my_crate::store::tests::reopens`
    /// into class `store` and method `reopens`.
    ///
    /// Closure segments and the marker function planted by `sandbox!()` are
    /// skipped, and so is a `tests`/`test` module directly above the
    /// function. A single-segment path becomes a class-level identity.
    #[must_use]
    pub fn from_fn_path(path: &str) -> Self {
        let mut segments: Vec<&str> = path
            .split("::")
            .filter(|s| !s.is_empty() && !s.starts_with('{') && *s != MARKER_FN)
            .collect();

        let method = if segments.len() > 1 {
            segments.pop()
        } else {
            None
        };
        if segments.len() > 1 && matches!(segments.last(), Some(&("tests" | "test"))) {
            segments.pop();
        }
        let class = segments.last().copied().unwrap_or(path);
        Self::new(class, method)
    }
}

/// Name of the marker function `sandbox!()` and `test_identity!()` declare
/// to learn where they were expanded.
#[doc(hidden)]
pub const MARKER_FN: &str = "__testdirs_marker";

/// Run `body` between `test_started` and `test_finished`.
///
/// A panicking body is reported as [`TestOutcome::Failed`] and the panic
/// resumes once the lifecycle has finished.
pub fn run_in_sandbox<L, T>(
    lifecycle: &mut L,
    identity: &TestIdentity,
    body: impl FnOnce(&mut L) -> T,
) -> T
where
    L: TestLifecycle + ?Sized,
{
    lifecycle.test_started(identity.method_name.as_deref(), &identity.class_name);
    match panic::catch_unwind(AssertUnwindSafe(|| body(&mut *lifecycle))) {
        Ok(value) => {
            lifecycle.test_finished(TestOutcome::Passed);
            value
        },
        Err(payload) => {
            lifecycle.test_finished(TestOutcome::Failed);
            panic::resume_unwind(payload)
        },
    }
}

/// A sandbox that lives as long as the guard.
///
/// Dropping the guard finishes the test: [`TestOutcome::Failed`] when the
/// drop happens during a panic, [`TestOutcome::Passed`] otherwise.
#[derive(Debug)]
pub struct SandboxGuard {
    allocator: SandboxAllocator,
}

impl SandboxGuard {
    /// Start a test on an allocator using the process-wide settings.
    #[must_use]
    pub fn start(identity: TestIdentity) -> Self {
        Self::with_allocator(SandboxAllocator::new(), identity)
    }

    #[must_use]
    pub fn with_allocator(mut allocator: SandboxAllocator, identity: TestIdentity) -> Self {
        allocator.test_started(identity.method_name.as_deref(), &identity.class_name);
        Self { allocator }
    }
}

impl Deref for SandboxGuard {
    type Target = SandboxAllocator;

    fn deref(&self) -> &Self::Target {
        &self.allocator
    }
}

impl DerefMut for SandboxGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.allocator
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        self.allocator.test_finished(TestOutcome::current());
    }
}

/// The [`TestIdentity`] of the enclosing function.
#[macro_export]
macro_rules! test_identity {
    () => {{
        fn __testdirs_marker() {}
        $crate::TestIdentity::from_fn_path(::std::any::type_name_of_val(&__testdirs_marker))
    }};
}

/// A [`SandboxGuard`] for the enclosing test function, or for an explicit
/// `(class, method)` pair.
///
/// ```no_run
/// fn writes_report() {
///     let mut sandbox = testdirs_sandbox::sandbox!();
///     let report = sandbox.create_file(["out", "report.txt"]).unwrap();
///     assert!(report.exists());
/// }
/// ```
#[macro_export]
macro_rules! sandbox {
    () => {
        $crate::SandboxGuard::start($crate::test_identity!())
    };
    ($class:expr, $method:expr) => {
        $crate::SandboxGuard::start($crate::TestIdentity::new($class, Some($method)))
    };
}
