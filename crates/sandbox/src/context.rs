//! Guessing a test's name when nobody told the allocator who it is.
//!
//! This happens when a sandbox is requested before any lifecycle hook ran,
//! e.g. while a fixture is being built. The guess is only as good as the
//! [`CallerContext`] behind it; explicit identities are always preferred.

use {testdirs_config::SandboxConfig, tracing::debug};

use crate::{naming::sanitize_segment, state::next_counter};

/// Source of the type names on the caller's side, innermost first.
pub trait CallerContext {
    fn frames(&self) -> Vec<String>;
}

/// Reads the current thread's name.
///
/// The libtest harness names each test thread after the test's path
/// (`module::tests::case`), which makes every enclosing module a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadNameContext;

impl CallerContext for ThreadNameContext {
    fn frames(&self) -> Vec<String> {
        std::thread::current()
            .name()
            .map(frames_from_path)
            .unwrap_or_default()
    }
}

/// A fixed list of frames, for runners that know their own call chain.
#[derive(Debug, Clone, Default)]
pub struct FrameListContext {
    frames: Vec<String>,
}

impl FrameListContext {
    pub fn new<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
        }
    }
}

impl CallerContext for FrameListContext {
    fn frames(&self) -> Vec<String> {
        self.frames.clone()
    }
}

/// Expand `a::b::c` into `["a::b::c", "a::b", "a"]`.
#[must_use]
pub fn frames_from_path(path: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        frames.push(rest.to_string());
        match rest.rfind("::") {
            Some(idx) => rest = &rest[..idx],
            None => break,
        }
    }
    frames
}

/// Last segment of a `::`- or `.`-qualified type name.
#[must_use]
pub fn simple_type_name(qualified: &str) -> &str {
    qualified
        .rsplit([':', '.'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(qualified)
}

/// Build a fallback prefix from the first frame that looks like a test type:
/// `<Type>/unknown-test-<n>`, or `unknown-test-class-<n>` if none does.
///
/// Always consumes one value of the process-wide counter.
pub fn derive_name_from_context(context: &dyn CallerContext, config: &SandboxConfig) -> String {
    let frames = context.frames();
    let test_type = frames
        .iter()
        .map(|frame| simple_type_name(frame))
        .find(|name| config.is_test_type(name));

    let name = match test_type {
        Some(type_name) => format!(
            "{}/unknown-test-{}",
            sanitize_segment(type_name),
            next_counter()
        ),
        None => format!("unknown-test-class-{}", next_counter()),
    };
    debug!(name = %name, frames = frames.len(), "derived sandbox name from caller context");
    name
}
