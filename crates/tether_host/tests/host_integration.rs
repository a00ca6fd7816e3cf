//! # Host Integration Tests
//!
//! End-to-end checks of the factory, the owner thread and the synchronous
//! access path, driven through a scripted runtime.
//!
//! Run with: cargo test --package tether_host --test host_integration

mod common;

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use common::ScriptRuntime;
use tether_core::{
    execute_synchronously_on_same_thread, try_execute_synchronously_on_same_thread,
    DecoratedRuntime, ExecutorError, InspectorRegistry, Runtime, RuntimeError, ThreadToken,
    Value,
};
use tether_host::{ExecutorConfig, ExecutorFactory, HostError, LockedRuntime, ENGINE_TAG_GLOBAL};

fn temp_config_path() -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("test_tether_executor_{id}.toml"))
}

#[test]
fn test_config_file_to_running_host() {
    let path = temp_config_path();
    std::fs::write(
        &path,
        r#"
        queue_name = "js-main"
        queue_capacity = 16
        engine_tag = "script"
        "#,
    )
    .unwrap();

    let config = ExecutorConfig::from_toml_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let host = ExecutorFactory::new(config)
        .unwrap()
        .create_executor(ScriptRuntime::new())
        .unwrap();

    let (answer, tag) = host
        .run_sync(|rt| (rt.evaluate("answer = 42", "main.js"), rt.global(ENGINE_TAG_GLOBAL)))
        .unwrap();
    assert_eq!(answer, Ok(Value::from(42)));
    assert_eq!(tag, Some(Value::from("script")));

    assert_eq!(host.executor().name(), "js-main");

    host.shutdown().unwrap();
}

#[test]
fn test_inspector_pages_follow_runtime_lifetime() {
    let registry = InspectorRegistry::new();
    let factory = ExecutorFactory::with_registry(
        ExecutorConfig::default().with_inspector("Bundle"),
        registry.clone(),
    )
    .unwrap();

    let first = factory.create_executor(ScriptRuntime::new()).unwrap();
    let second = factory.create_executor(ScriptRuntime::new()).unwrap();
    assert_eq!(registry.len(), 2);

    let page = registry.page(first.inspector_page().unwrap()).unwrap();
    assert_eq!(page.title, "Bundle");
    assert_eq!(page.vm, "ScriptRuntime 0.1");

    first.shutdown().unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.page(second.inspector_page().unwrap()).is_some());

    drop(second);
    assert!(registry.is_empty());
}

#[test]
fn test_queued_jobs_run_before_sync_call() {
    let host = ExecutorFactory::default()
        .create_executor(ScriptRuntime::new())
        .unwrap();

    host.execute(|rt| {
        rt.evaluate("defer ready", "boot.js").unwrap();
    });
    host.execute(|rt| {
        rt.drain_microtasks().unwrap();
    });

    let ready = host.run_sync(|rt| rt.global("ready")).unwrap();
    assert_eq!(ready, Some(Value::from(true)));
}

#[test]
fn test_sync_call_runs_on_caller_thread() {
    let host = ExecutorFactory::default()
        .create_executor(ScriptRuntime::new())
        .unwrap();
    let me = ThreadToken::current();
    assert!(!host.is_on_runtime_thread());

    let (ran_on, guard_owner) = host
        .run_sync(|rt| {
            let _scope = rt.guard().scope();
            (ThreadToken::current(), rt.guard().owner())
        })
        .unwrap();

    assert_eq!(ran_on, me);
    let expected_owner = if cfg!(debug_assertions) { Some(me) } else { None };
    assert_eq!(guard_owner, expected_owner);
}

#[test]
fn test_script_error_leaves_runtime_usable() {
    let host = ExecutorFactory::default()
        .create_executor(ScriptRuntime::new())
        .unwrap();

    let result = host.run_sync(|rt| rt.evaluate("throw boom", "app.js")).unwrap();
    assert_eq!(
        result,
        Err(RuntimeError::Evaluation {
            source_url: "app.js".to_owned(),
            message: "boom".to_owned(),
        })
    );

    let missing = host.run_sync(|rt| rt.evaluate("nothing", "app.js")).unwrap();
    assert_eq!(missing, Err(RuntimeError::PropertyNotFound("nothing".to_owned())));

    let (held, evaluations) = host
        .run_sync(|rt| (rt.guard().is_held(), rt.with(|inner| inner.evaluations)))
        .unwrap();
    assert!(!held);
    assert_eq!(evaluations, 2);
}

#[test]
fn test_evaluate_surfaces_runtime_errors() {
    let host = ExecutorFactory::default()
        .create_executor(ScriptRuntime::new())
        .unwrap();

    assert_eq!(host.evaluate("x = 1.5", "a.js"), Ok(Value::from(1.5)));
    assert_eq!(host.evaluate("x", "a.js"), Ok(Value::from(1.5)));
    assert_eq!(
        host.evaluate("y", "a.js"),
        Err(HostError::Runtime(RuntimeError::PropertyNotFound("y".to_owned())))
    );
    host.shutdown().unwrap();
}

#[test]
fn test_many_threads_share_one_runtime() {
    const THREADS: usize = 8;
    const CALLS: usize = 25;

    let host = ExecutorFactory::new(ExecutorConfig::default().with_queue_capacity(2))
        .unwrap()
        .create_executor(ScriptRuntime::new())
        .unwrap();
    host.run_sync(|rt| rt.set_global("n", Value::from(0))).unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..CALLS {
                    host.run_sync(|rt| {
                        let n = rt.global("n").and_then(|v| v.as_number()).unwrap();
                        rt.set_global("n", Value::from(n + 1.0));
                    })
                    .unwrap();
                }
            });
        }
    });

    let n = host.run_sync(|rt| rt.global("n")).unwrap();
    assert_eq!(n, Some(Value::from((THREADS * CALLS) as f64)));

    let stats = host.stats();
    host.shutdown().unwrap();
    assert_eq!(
        stats.jobs_executed.load(std::sync::atomic::Ordering::Relaxed),
        (THREADS * CALLS + 2) as u64
    );
}

#[test]
fn test_panicking_sync_callback_releases_owner() {
    let host = ExecutorFactory::default()
        .create_executor(ScriptRuntime::new())
        .unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        host.run_sync(|rt| {
            rt.set_global("before", Value::from(1));
            panic!("callback failed");
        })
    }));
    assert!(outcome.is_err());

    let before = host.run_sync(|rt| rt.global("before")).unwrap();
    assert_eq!(before, Some(Value::from(1)));
    host.shutdown().unwrap();
}

#[test]
fn test_executor_outliving_host_reports_drop() {
    let host = ExecutorFactory::default()
        .create_executor(ScriptRuntime::new())
        .unwrap();
    let executor = host.executor();
    host.shutdown().unwrap();

    let result = try_execute_synchronously_on_same_thread(&executor, |rt: &mut DecoratedRuntime<ScriptRuntime>| {
        rt.global("anything")
    });
    assert_eq!(result, Err(ExecutorError::CallbackDropped));
}

#[test]
fn test_panicking_async_job_surfaces_at_shutdown() {
    let host = ExecutorFactory::new(ExecutorConfig::default().with_queue_name("js-crash"))
        .unwrap()
        .create_executor(ScriptRuntime::new())
        .unwrap();

    host.execute(|_| panic!("job failed"));

    assert_eq!(
        host.shutdown(),
        Err(HostError::QueuePanicked("js-crash".to_owned()))
    );
}

#[test]
fn test_locked_runtime_runs_inline() {
    let locked = LockedRuntime::new(DecoratedRuntime::new(ScriptRuntime::new()));
    let executor = locked.executor();
    let me = ThreadToken::current();

    let (value, ran_on) = execute_synchronously_on_same_thread(&executor, |rt: &mut DecoratedRuntime<ScriptRuntime>| {
        (rt.evaluate("x = 3", "inline.js"), ThreadToken::current())
    });

    assert_eq!(value, Ok(Value::from(3)));
    assert_eq!(ran_on, me);
    assert_eq!(locked.with(|rt| rt.global("x")), Some(Value::from(3)));
}
