#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end use of the process-wide root, the way a test suite sees it.

use std::{fs, path::PathBuf, thread};

use testdirs_sandbox::{
    Error, FrameListContext, SandboxAllocator, SandboxConfig, TestIdentity, configure,
    init_test_logging, root, run_in_sandbox, sandbox,
};

fn suite_root() -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("testdirs-sandbox-it")
}

fn setup() {
    init_test_logging();
    configure(SandboxConfig {
        root: Some(suite_root()),
        ..Default::default()
    })
    .unwrap();
}

#[test]
fn macro_names_sandbox_after_test_fn() {
    setup();
    let mut sandbox = sandbox!();
    assert_eq!(
        sandbox.prefix(),
        Some("sandbox_macro/macro_names_sandbox_after_test_fn")
    );

    let dir = sandbox.resolve_directory().unwrap().to_path_buf();
    assert!(dir.starts_with(root()));
    assert!(dir.is_dir());

    drop(sandbox);
    assert!(!dir.exists());
}

#[test]
fn explicit_identity_is_sanitized() {
    setup();
    let mut sandbox = sandbox!("ReportTest", "writes a \"csv\": fast");
    assert_eq!(sandbox.prefix(), Some("ReportTest/writes_a__csv___fast"));

    let file = sandbox.create_file(["out", "report.csv"]).unwrap();
    fs::write(&file, "a,b\n").unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "a,b\n");
}

#[test]
fn reconfiguring_a_different_root_fails() {
    setup();
    let err = configure(SandboxConfig {
        root: Some(suite_root().join("elsewhere")),
        ..Default::default()
    })
    .unwrap_err();

    assert!(matches!(err, Error::RootAlreadyConfigured { ref current } if *current == suite_root()));
    assert_eq!(root(), suite_root());
}

#[test]
fn fixture_without_identity_uses_caller_context() {
    setup();
    let mut sandbox =
        SandboxAllocator::new().with_caller_context(FrameListContext::new(["ImportSpec"]));

    let dir = sandbox.create_directory(["fixtures"]).unwrap();
    assert!(dir.is_dir());
    assert!(sandbox.prefix().unwrap().starts_with("ImportSpec/unknown-test-"));
    sandbox.teardown();
}

#[test]
fn parallel_tests_with_one_name_get_their_own_sandbox() {
    setup();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let mut allocator = SandboxAllocator::new();
                let identity = TestIdentity::new("ParallelTest", Some("same name"));
                run_in_sandbox(&mut allocator, &identity, |s| {
                    let marker = s.create_file([format!("worker-{i}")]).unwrap();
                    let dir = s.resolve_directory().unwrap().to_path_buf();
                    let entries = fs::read_dir(&dir).unwrap().count();
                    assert_eq!(entries, 1, "{} is shared", dir.display());
                    assert!(marker.starts_with(fs::canonicalize(&dir).unwrap()));
                    dir
                })
            })
        })
        .collect();

    let mut dirs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for dir in &dirs {
        assert!(!dir.exists());
    }
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 8);
}
