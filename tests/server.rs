//! End-to-end tests against a bound server.

use std::time::Duration;

use srest::config::Config;
use srest::{Handler, Server, ServerError, Signal};

mod common;

use common::{client, text};

fn local_config() -> Config {
    let mut config = Config::default();
    config.listener.host = "127.0.0.1".to_string();
    config
}

#[tokio::test]
async fn test_serves_requests_until_shutdown() {
    let mut server = Server::new(local_config());
    server.get("/hello", text("hello"), &[]).unwrap();

    let running = server.run(0).await.unwrap();
    let addr = running.local_addr();
    assert_ne!(addr.port(), 0);

    let res = client()
        .get(format!("http://{addr}/hello/"))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "hello");

    running.shutdown().await.unwrap();

    let after = client()
        .get(format!("http://{addr}/hello"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(after.is_err(), "listener still accepting after shutdown");
}

#[tokio::test]
async fn test_injected_signal_reaches_caller() {
    let mut running = Server::new(local_config()).run(0).await.unwrap();

    running.notifier().send(Signal::Terminate).await.unwrap();
    let received = tokio::time::timeout(Duration::from_secs(1), running.wait_for_signal())
        .await
        .expect("signal not delivered");
    assert_eq!(received, Some(Signal::Terminate));

    // A signal alone does not stop the listener.
    let res = client()
        .get(format!("http://{}/missing", running.local_addr()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    running.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_port_in_use_is_reported() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let err = Server::new(local_config()).run(port).await.unwrap_err();
    match err {
        ServerError::Bind { address, .. } => assert_eq!(address, format!("127.0.0.1:{port}")),
        other => panic!("expected bind error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_requests() {
    let slow = Handler::new(|_req| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        "done"
    });
    let mut server = Server::new(local_config());
    server.get("/slow", slow, &[]).unwrap();
    let running = server.run(0).await.unwrap();
    let url = format!("http://{}/slow", running.local_addr());

    let in_flight = tokio::spawn(async move { client().get(url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    running.shutdown().await.unwrap();

    let res = in_flight.await.unwrap().expect("in-flight request dropped");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "done");
}

#[tokio::test]
async fn test_request_timeout() {
    let mut config = local_config();
    config.limits.request_timeout_secs = 1;
    let never = Handler::new(|_req| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        "late"
    });
    let mut server = Server::new(config);
    server.get("/never", never, &[]).unwrap();
    let running = server.run(0).await.unwrap();

    let res = client()
        .get(format!("http://{}/never", running.local_addr()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 408);

    running.shutdown().await.unwrap();
}
