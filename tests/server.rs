//! One real round trip over TCP through `Server`.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use strand::{App, Next, Request, Response, Server};

async fn hello(req: &mut Request, res: &mut Response) -> Next {
    let name = req.param("name").unwrap_or("nobody").to_owned();
    res.text(format!("hello, {name}"));
    Next::Done
}

async fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn serves_routes_and_404_then_shuts_down() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let app = App::new().get("/hello/:name", hello).unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(app, async {
        let _ = stopped.await;
    }));

    let ok = roundtrip(addr, "GET /hello/world HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n").await;
    assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"), "{ok}");
    assert!(ok.contains("content-type: text/plain; charset=utf-8\r\n"), "{ok}");
    assert!(ok.ends_with("\r\n\r\nhello, world"), "{ok}");

    let missing = roundtrip(addr, "GET /nope HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"), "{missing}");
    assert!(missing.ends_with("\r\n\r\nNot Found"), "{missing}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_closes_idle_keep_alive_connections() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let app = App::new().get("/hello/:name", hello).unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(app, async {
        let _ = stopped.await;
    }));

    // no `connection: close`, so the server keeps the socket open afterwards
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /hello/keep-alive HTTP/1.1\r\nhost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    let mut buf = [0; 1024];
    while !response.ends_with(b"hello, keep-alive") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before the response arrived");
        response.extend_from_slice(&buf[..n]);
    }
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server kept waiting on an idle connection")
        .unwrap()
        .unwrap();

    // the idle connection was closed by the server
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
}

#[test]
fn bind_rejects_bad_addresses() {
    assert!(matches!(Server::bind("not an address"), Err(strand::Error::Addr(_))));
}
