// tests/live_reload.rs

mod common;
use crate::common::{init_tracing, with_timeout, write_file};

use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use assetpipe::reload::{server, LiveReload, ReloadEvent};

type TestResult = Result<(), Box<dyn Error>>;

fn event(binding: &str) -> ReloadEvent {
    ReloadEvent {
        binding: binding.to_string(),
        paths: vec!["app/css/style.css".to_string()],
    }
}

#[test]
fn notify_without_observers_is_not_an_error() {
    init_tracing();
    let reload = LiveReload::new();
    assert_eq!(reload.observers(), 0);
    assert_eq!(reload.notify(event("styles")), 0);
}

#[tokio::test]
async fn every_connected_observer_receives_the_event() -> TestResult {
    with_timeout(async {
        init_tracing();
        let reload = LiveReload::new();
        let mut first = reload.subscribe();
        let mut second = reload.clone().subscribe();

        assert_eq!(reload.notify(event("styles")), 2);

        assert_eq!(first.recv().await?, event("styles"));
        assert_eq!(second.recv().await?, event("styles"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn late_observer_misses_earlier_events() -> TestResult {
    with_timeout(async {
        init_tracing();
        let reload = LiveReload::new();
        let _early = reload.subscribe();
        reload.notify(event("before"));

        let mut late = reload.subscribe();
        reload.notify(event("after"));

        assert_eq!(late.recv().await?.binding, "after");
        Ok(())
    })
    .await
}

async fn get(addr: SocketAddr, path: &str) -> std::io::Result<String> {
    let mut stream = loop {
        match TcpStream::connect(addr).await {
            Ok(s) => break s,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    };
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

#[tokio::test]
async fn server_serves_static_files_and_client_script() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        write_file(dir.path(), "index.html", "<h1>hello</h1>");

        let listener = server::bind("127.0.0.1:0".parse()?).await?;
        let addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(server::serve(
            listener,
            dir.path().to_path_buf(),
            LiveReload::new(),
            stop_rx,
        ));

        let page = get(addr, "/index.html").await?;
        assert!(page.starts_with("HTTP/1.1 200"), "{page}");
        assert!(page.contains("<h1>hello</h1>"));

        let script = get(addr, server::CLIENT_SCRIPT_PATH).await?;
        assert!(script.contains("EventSource"));

        let missing = get(addr, "/nope.html").await?;
        assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

        stop_tx.send(true)?;
        handle.await??;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn shutdown_closes_open_reload_streams() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let reload = LiveReload::new();

        let listener = server::bind("127.0.0.1:0".parse()?).await?;
        let addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(server::serve(
            listener,
            dir.path().to_path_buf(),
            reload.clone(),
            stop_rx,
        ));

        let mut stream = TcpStream::connect(addr).await?;
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n",
            server::RELOAD_PATH
        );
        stream.write_all(request.as_bytes()).await?;

        let mut head = [0u8; 64];
        let n = stream.read(&mut head).await?;
        let head = String::from_utf8_lossy(&head[..n]);
        assert!(head.starts_with("HTTP/1.1 200"), "{head}");

        while reload.observers() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        stop_tx.send(true)?;
        tokio::time::timeout(Duration::from_secs(2), handle).await???;

        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut rest)).await??;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn bind_reports_a_taken_port() -> TestResult {
    with_timeout(async {
        init_tracing();
        let taken = server::bind("127.0.0.1:0".parse()?).await?;
        let addr = taken.local_addr()?;

        let err = server::bind(addr).await.unwrap_err();
        assert!(
            format!("{err:#}").contains("binding live-reload server"),
            "{err:#}"
        );
        Ok(())
    })
    .await
}
