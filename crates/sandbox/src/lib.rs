//! Unique, self-cleaning sandbox directories for tests.
//!
//! Each test gets `<root>/<Class>/<method>[n]`: named after the test,
//! created on first use, and removed when the test finishes. A numeric
//! suffix keeps repeated or parallel runs of the same test apart.
//!
//! The root and a few knobs come from `testdirs.toml` (see
//! [`testdirs_config`]) or from [`configure`].

pub mod allocator;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod naming;
mod paths;
pub mod state;

pub use {
    allocator::SandboxAllocator,
    context::{CallerContext, FrameListContext, ThreadNameContext},
    error::{Error, Result},
    lifecycle::{SandboxGuard, TestIdentity, TestLifecycle, TestOutcome, run_in_sandbox},
    logging::init_test_logging,
    state::{Settings, configure, root, settings},
    testdirs_config::SandboxConfig,
};
