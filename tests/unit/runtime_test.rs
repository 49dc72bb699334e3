//! Tests for tokio spawner utilities and API models

use container_dispatch::core::ErrorKind;
use container_dispatch::runtime::{DispatchRequest, DispatchResponse, Spawn, TokioSpawner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::current();

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_owned_runtime_spawner() {
    let spawner = TokioSpawner::with_worker_threads(1).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(async move {
        tx.send("done").unwrap();
    });
    assert_eq!(
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap(),
        "done"
    );
}

#[test]
fn test_response_wire_format() {
    let ok = serde_json::to_string(&DispatchResponse::Ok("hi".into())).unwrap();
    assert_eq!(ok, r#"{"ok":"hi"}"#);

    let err = serde_json::to_string(&DispatchResponse::Error(ErrorKind::CapacityExceeded)).unwrap();
    assert_eq!(err, r#"{"error":"CapacityExceeded"}"#);
}

#[test]
fn test_request_parses_without_args() {
    let req: DispatchRequest = serde_json::from_str(r#"{"user":"user1","kind":"alpha"}"#).unwrap();
    assert_eq!(req.user, "user1");
    assert!(req.args.prompt().is_none());

    let raw = r#"{"user":"admin","kind":"RuntimeBeta","args":{"prompt":"lunch?"}}"#;
    let req: DispatchRequest = serde_json::from_str(raw).unwrap();
    assert_eq!(req.args.prompt(), Some("lunch?"));
}
