use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::common::{BASE, setup_test_app};

#[tokio::test]
async fn shutdown_finishes_admitted_jobs() {
    let app = setup_test_app().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(multiplex_server::run(
        listener,
        Arc::clone(&app.state),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .post(format!("http://{addr}{BASE}/links"))
        .json(&[app.link("/sleep/300")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);
    let id = response.text().await.unwrap();

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert!(app.state.service.is_idle());
    assert!(app.store.path().join(format!("{id}.json")).exists());

    let refused = app.state.service.submit(vec![app.link("/echo/X")]);
    assert!(refused.is_err());
}
