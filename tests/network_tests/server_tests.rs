//! Server Tests
//!
//! Tests verify:
//! - A completed command is answered with the whole log
//! - Commands split across sends are reassembled per connection
//! - Several commands in one send are all kept
//! - The connection limit is enforced
//! - Timestamp commands are appended
//! - Graceful shutdown

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cmdlog::config::Config;
use cmdlog::network::{Server, ShutdownHandle};
use cmdlog::{Engine, Result};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: String,
    engine: Arc<Engine>,
    handle: ShutdownHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let engine = Arc::new(Engine::new(config.clone()).unwrap());
        let mut server = Server::bind(config, Arc::clone(&engine)).unwrap();
        let addr = server.local_addr().to_string();
        let handle = server.shutdown_handle();

        let thread = thread::spawn(move || server.run());

        Self {
            addr,
            engine,
            handle,
            thread: Some(thread),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(&self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    fn stop(&mut self) -> Result<()> {
        self.handle.shutdown();
        self.thread.take().unwrap().join().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.stop();
        }
    }
}

fn base_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .capacity(10)
        .read_timeout_ms(50)
        .timestamp_interval_ms(None)
        .build()
}

fn read_exact_string(stream: &mut TcpStream, len: usize) -> String {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

// =============================================================================
// Request / Reply Tests
// =============================================================================

#[test]
fn test_command_is_echoed_with_log() {
    let server = TestServer::start(base_config());
    let mut client = server.connect();

    client.write_all(b"hello\n").unwrap();
    assert_eq!(read_exact_string(&mut client, 6), "hello\n");

    client.write_all(b"world\n").unwrap();
    assert_eq!(read_exact_string(&mut client, 12), "hello\nworld\n");
}

#[test]
fn test_log_shared_between_clients() {
    let server = TestServer::start(base_config());

    let mut first = server.connect();
    first.write_all(b"from first\n").unwrap();
    assert_eq!(read_exact_string(&mut first, 11), "from first\n");

    let mut second = server.connect();
    second.write_all(b"from second\n").unwrap();
    assert_eq!(
        read_exact_string(&mut second, 23),
        "from first\nfrom second\n"
    );
}

#[test]
fn test_fragmented_command_reassembled() {
    let server = TestServer::start(base_config());
    let mut client = server.connect();

    client.write_all(b"par").unwrap();
    client.flush().unwrap();
    thread::sleep(Duration::from_millis(50));
    client.write_all(b"tial\n").unwrap();

    assert_eq!(read_exact_string(&mut client, 8), "partial\n");
}

#[test]
fn test_multiple_commands_in_one_send_all_kept() {
    let server = TestServer::start(base_config());
    let mut client = server.connect();

    client.write_all(b"a\nb\nc\n").unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    let mut reply = Vec::new();
    client.read_to_end(&mut reply).unwrap();
    assert!(reply.ends_with(b"a\nb\nc\n"));

    assert_eq!(&server.engine.snapshot()[..], b"a\nb\nc\n");
}

#[test]
fn test_unfinished_command_discarded_on_disconnect() {
    let server = TestServer::start(base_config());

    {
        let mut client = server.connect();
        client.write_all(b"never terminated").unwrap();
        client.shutdown(Shutdown::Write).unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }

    let mut client = server.connect();
    client.write_all(b"next\n").unwrap();
    assert_eq!(read_exact_string(&mut client, 5), "next\n");
}

#[test]
fn test_retention_bound_visible_to_clients() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .capacity(2)
        .read_timeout_ms(50)
        .timestamp_interval_ms(None)
        .build();
    let server = TestServer::start(config);
    let mut client = server.connect();

    client.write_all(b"1\n").unwrap();
    read_exact_string(&mut client, 2);
    client.write_all(b"2\n").unwrap();
    read_exact_string(&mut client, 4);
    client.write_all(b"3\n").unwrap();
    assert_eq!(read_exact_string(&mut client, 4), "2\n3\n");
}

// =============================================================================
// Limits / Ticker / Shutdown Tests
// =============================================================================

#[test]
fn test_connection_limit_refuses_extra_clients() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .read_timeout_ms(50)
        .timestamp_interval_ms(None)
        .build();
    let server = TestServer::start(config);

    // First client is fully established once it gets a reply
    let mut first = server.connect();
    first.write_all(b"one\n").unwrap();
    assert_eq!(read_exact_string(&mut first, 4), "one\n");

    // Second client is closed without being served
    let mut second = server.connect();
    let _ = second.write_all(b"two\n");
    let mut buf = [0u8; 16];
    match second.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert!(matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
        )),
    }

    assert_eq!(&server.engine.snapshot()[..], b"one\n");
}

#[test]
fn test_timestamps_are_appended() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .read_timeout_ms(50)
        .timestamp_interval_ms(Some(40))
        .build();
    let server = TestServer::start(config);

    thread::sleep(Duration::from_millis(150));

    let snapshot = server.engine.snapshot();
    let text = std::str::from_utf8(&snapshot).unwrap();
    let stamps = text.lines().filter(|l| l.starts_with("timestamp:")).count();
    assert!(stamps >= 2, "expected several timestamps, got {:?}", text);
}

#[test]
fn test_shutdown_stops_server_with_idle_client() {
    let mut server = TestServer::start(base_config());

    let mut client = server.connect();
    client.write_all(b"idle after this\n").unwrap();
    read_exact_string(&mut client, 16);

    // The idle connection must not keep the server alive
    assert!(!server.handle.is_shutdown());
    server.stop().unwrap();
    assert!(server.handle.is_shutdown());

    let mut buf = [0u8; 8];
    match client.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(_) => {}
    }
}
