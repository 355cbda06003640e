//! Orchestrator behavior against a recording engine.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use shipwright::config::PartialBuildConfiguration;
use shipwright::{
    AxumHost, BridgeError, BuildMode, HostContext, HostServer, HostSignal, HttpHost,
    LifecycleOptions, Phase, Shipwright, ShipwrightError, Stage,
};
use support::{Behavior, FAKE_ASSET_BODY, FAKE_ASSET_PATH, RecordingEngine, write_app};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn context(dir: &TempDir, mode: BuildMode, http: Arc<dyn HttpHost>) -> HostContext {
    HostContext::new(dir.path(), http).with_mode(mode)
}

#[tokio::test]
async fn dev_server_attaches_before_serving_and_closes_before_listener() {
    let dir = TempDir::new().unwrap();
    write_app(dir.path());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let engine = RecordingEngine::new(Behavior::default());
    let log = engine.log.clone();
    let server = engine.server.clone();
    let configs = engine.configs.clone();

    let http = AxumHost::new();
    let ctx = context(&dir, BuildMode::Development, Arc::new(http.clone())).with_port(addr.port());
    let hooks = ctx.hooks.clone();

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();
    assert_eq!(lifecycle.phase(), Phase::Serving);
    assert!(lifecycle.has_dev_server());
    assert_eq!(http.middleware_count(), 0, "attached before the host was ready");

    let config = configs.lock()[0].clone();
    assert_eq!(config.server.as_ref().unwrap().port, Some(addr.port()));
    assert_eq!(
        config.source.entries["app"],
        dir.path().join("assets/js/app.js")
    );

    // Runs after the orchestrator's own hooks for each signal.
    let (lifted_tx, lifted_rx) = oneshot::channel();
    {
        let log = log.clone();
        let http = http.clone();
        hooks.subscribe(HostSignal::HttpLoaded, move || async move {
            log.push(format!("host:loaded middleware={}", http.middleware_count()));
            Ok(())
        });
    }
    {
        let log = log.clone();
        hooks.subscribe(HostSignal::Lifted, move || async move {
            log.push("host:lifted");
            let _ = lifted_tx.send(());
            Ok(())
        });
    }
    {
        let log = log.clone();
        hooks.subscribe(HostSignal::Lowering, move || async move {
            let still_open = reqwest::get(format!("http://{addr}/"))
                .await
                .is_ok();
            log.push(format!("host:lowering listener_open={still_open}"));
            Ok(())
        });
    }

    let app = Router::new()
        .route("/", get(|| async { "home" }))
        .route(FAKE_ASSET_PATH, get(|| async { "host route" }));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let host = tokio::spawn(HostServer::new(app, http.clone(), hooks.clone()).run(
        listener,
        async move {
            let _ = stop_rx.await;
        },
    ));

    lifted_rx.await.unwrap();
    let asset = reqwest::get(format!("http://{addr}{FAKE_ASSET_PATH}"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(asset, FAKE_ASSET_BODY);
    let home = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(home, "home");
    assert_eq!(server.open_handles(), 1);

    stop_tx.send(()).unwrap();
    host.await.unwrap().unwrap();

    assert_eq!(
        log.events(),
        vec![
            "create",
            "dev_server",
            "middleware",
            "upgrade_handler",
            "host:loaded middleware=1",
            "after_listen",
            "host:lifted",
            "close",
            "host:lowering listener_open=true",
        ]
    );
    assert_eq!(server.open_handles(), 0);
    assert_eq!(server.close_count(), 1);
    assert_eq!(lifecycle.phase(), Phase::ShutDown);
    assert!(!lifecycle.has_dev_server());
}

#[tokio::test]
async fn production_builds_once_without_dev_server() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior::default());
    let log = engine.log.clone();
    let http = AxumHost::new();
    let ctx = context(&dir, BuildMode::Production, Arc::new(http.clone()));
    let hooks = ctx.hooks.clone();

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();

    assert!(matches!(lifecycle.phase(), Phase::Built { .. }));
    assert_eq!(log.events(), vec!["create", "build"]);
    assert_eq!(hooks.subscriber_count(HostSignal::HttpLoaded), 0);
    assert_eq!(hooks.subscriber_count(HostSignal::Lowering), 0);
    assert!(!lifecycle.has_dev_server());
}

#[tokio::test]
async fn failed_build_leaves_host_running() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior {
        fail_build: true,
        ..Behavior::default()
    });
    let ctx = context(&dir, BuildMode::Production, Arc::new(AxumHost::new()));

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();

    match lifecycle.phase() {
        Phase::Failed { stage, error } => {
            assert_eq!(stage, Stage::Building);
            assert!(error.contains("syntax error"));
        }
        other => panic!("expected failed build, got {other:?}"),
    }
    assert_eq!(lifecycle.tags().scripts(), "");
    lifecycle.shutdown().await.unwrap();
}

#[tokio::test]
async fn creation_failure_skips_dev_server() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior {
        fail_create: true,
        ..Behavior::default()
    });
    let log = engine.log.clone();
    let ctx = context(&dir, BuildMode::Development, Arc::new(AxumHost::new()));
    let hooks = ctx.hooks.clone();

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();

    assert!(matches!(
        lifecycle.phase(),
        Phase::Failed { stage: Stage::Creating, .. }
    ));
    assert_eq!(log.events(), vec!["create"]);
    assert_eq!(hooks.subscriber_count(HostSignal::HttpLoaded), 0);
}

#[tokio::test]
async fn slow_creation_times_out() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior {
        create_delay: Some(Duration::from_secs(5)),
        ..Behavior::default()
    });
    let ctx = context(&dir, BuildMode::Production, Arc::new(AxumHost::new()));
    let options = LifecycleOptions {
        creation_timeout: Duration::from_millis(20),
        ..LifecycleOptions::default()
    };

    let lifecycle = Shipwright::new(engine)
        .with_options(options)
        .initialize(ctx)
        .await
        .unwrap();

    match lifecycle.phase() {
        Phase::Failed { stage, error } => {
            assert_eq!(stage, Stage::Creating);
            assert!(error.contains("timed out"), "{error}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn dev_server_creation_failure_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior {
        fail_dev_server: true,
        ..Behavior::default()
    });
    let ctx = context(&dir, BuildMode::Development, Arc::new(AxumHost::new()));
    let hooks = ctx.hooks.clone();

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();

    assert!(matches!(
        lifecycle.phase(),
        Phase::Failed { stage: Stage::DevServer, .. }
    ));
    assert_eq!(hooks.subscriber_count(HostSignal::Lifted), 0);
}

#[tokio::test]
async fn host_without_middleware_support_reports_attach_failure() {
    struct BareHost;
    impl HttpHost for BareHost {}

    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior::default());
    let server = engine.server.clone();
    let ctx = context(&dir, BuildMode::Development, Arc::new(BareHost));
    let hooks = ctx.hooks.clone();

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();

    let errors = hooks.emit(HostSignal::HttpLoaded).await;
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        ShipwrightError::BridgeAttach(BridgeError::Unsupported(_))
    ));

    assert!(hooks.emit(HostSignal::Lifted).await.is_empty());
    assert!(hooks.emit(HostSignal::Lowering).await.is_empty());
    assert_eq!(server.open_handles(), 0);
    assert_eq!(server.close_count(), 1);
    assert_eq!(lifecycle.phase(), Phase::ShutDown);
}

#[tokio::test]
async fn invalid_configuration_is_an_error() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior::default());
    let log = engine.log.clone();
    let overrides = PartialBuildConfiguration::default().with_entry("app", "");
    let ctx = context(&dir, BuildMode::Production, Arc::new(AxumHost::new()))
        .with_overrides(overrides);

    let err = Shipwright::new(engine).initialize(ctx).await.err().unwrap();

    assert!(matches!(err, ShipwrightError::Config(_)));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn tag_accessors_are_installed_when_manifest_enabled() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, BuildMode::Production, Arc::new(AxumHost::new()));
    let views = ctx.views.clone();

    Shipwright::new(RecordingEngine::new(Behavior::default()))
        .initialize(ctx)
        .await
        .unwrap();

    assert!(views.contains("shipwright", "scripts"));
    assert!(views.contains("shipwright", "styles"));
    assert_eq!(views.call("shipwright", "scripts").unwrap(), "");
}

#[tokio::test]
async fn tag_accessors_are_skipped_when_manifest_disabled() {
    let dir = TempDir::new().unwrap();
    let overrides = PartialBuildConfiguration::from_value(serde_json::json!({
        "output": { "manifest": false }
    }))
    .unwrap();
    let ctx = context(&dir, BuildMode::Production, Arc::new(AxumHost::new()))
        .with_overrides(overrides);
    let views = ctx.views.clone();

    Shipwright::new(RecordingEngine::new(Behavior::default()))
        .initialize(ctx)
        .await
        .unwrap();

    assert!(views.names("shipwright").is_empty());
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let engine = RecordingEngine::new(Behavior::default());
    let server = engine.server.clone();
    let ctx = context(&dir, BuildMode::Development, Arc::new(AxumHost::new()));

    let lifecycle = Shipwright::new(engine).initialize(ctx).await.unwrap();
    lifecycle.shutdown().await.unwrap();
    lifecycle.shutdown().await.unwrap();

    assert_eq!(server.close_count(), 1);
    assert_eq!(lifecycle.phase(), Phase::ShutDown);
}
