//! End-to-end tests: sessions, alert broadcast, and the TCP transport.

use chrono::{Local, TimeZone};
use relayctl_io::SimulatedBank;
use relayctl_server::monitor::spawn_alert_dispatcher;
use relayctl_server::session::{start_stream_session, ServerContext, SessionKind};
use relayctl_server::{tcp, Config};
use std::sync::Arc;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn quiet_config() -> Config {
    Config {
        send_date_stamp: false,
        send_counts: true,
        ..Config::default()
    }
}

async fn read_line<R: AsyncRead + Unpin>(reader: &mut R) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte).await.unwrap();
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8(line).unwrap()
}

#[tokio::test]
async fn test_input_alert_reaches_every_stream_session() {
    let (bank, events) = SimulatedBank::new();
    let ctx = Arc::new(ServerContext::new(quiet_config(), Arc::new(bank.clone())));
    spawn_alert_dispatcher(events, ctx.clone());

    let (client_a, server_a) = duplex(1024);
    let (read_a, write_a) = tokio::io::split(server_a);
    start_stream_session("a", SessionKind::Tcp, read_a, write_a, ctx.clone());

    let (client_b, server_b) = duplex(1024);
    let (read_b, write_b) = tokio::io::split(server_b);
    start_stream_session("b", SessionKind::Tcp, read_b, write_b, ctx.clone());

    bank.set_input(4, true);

    let (mut reader_a, _keep_a) = tokio::io::split(client_a);
    let (mut reader_b, _keep_b) = tokio::io::split(client_b);
    assert_eq!(read_line(&mut reader_a).await, "din4=1,1");
    assert_eq!(read_line(&mut reader_b).await, "din4=1,1");
}

#[tokio::test]
async fn test_command_from_one_session_alerts_the_other() {
    let (bank, events) = SimulatedBank::new();
    let ctx = Arc::new(ServerContext::new(quiet_config(), Arc::new(bank)));
    spawn_alert_dispatcher(events, ctx.clone());

    let (client_a, server_a) = duplex(1024);
    let (read_a, write_a) = tokio::io::split(server_a);
    start_stream_session("a", SessionKind::Tcp, read_a, write_a, ctx.clone());

    let (client_b, server_b) = duplex(1024);
    let (read_b, write_b) = tokio::io::split(server_b);
    start_stream_session("b", SessionKind::Tcp, read_b, write_b, ctx.clone());

    let (mut reader_a, mut writer_a) = tokio::io::split(client_a);
    writer_a.write_all(b"c2\n").await.unwrap();

    // Both sessions get the relay transition alert; the sender gets no
    // direct reply, so the alert is the first thing it reads.
    let (mut reader_b, _keep_b) = tokio::io::split(client_b);
    assert_eq!(read_line(&mut reader_b).await, "rout2=1");
    assert_eq!(read_line(&mut reader_a).await, "rout2=1");
}

#[tokio::test]
async fn test_alerts_suppressed_when_disabled() {
    let (bank, events) = SimulatedBank::new();
    let config = Config {
        send_unsolicited_alerts: false,
        ..quiet_config()
    };
    let ctx = Arc::new(ServerContext::new(config, Arc::new(bank.clone())));
    spawn_alert_dispatcher(events, ctx.clone());

    let (client, server) = duplex(1024);
    let (read_half, write_half) = tokio::io::split(server);
    start_stream_session("a", SessionKind::Tcp, read_half, write_half, ctx);

    bank.set_input(1, true);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Nothing was queued; a query is the first reply the client sees.
    let (mut reader, mut writer) = tokio::io::split(client);
    writer.write_all(b"din1?\n").await.unwrap();
    assert_eq!(read_line(&mut reader).await, "din1=1,1");
}

#[tokio::test]
async fn test_broadcast_carries_transition_timestamp() {
    let (bank, _events) = SimulatedBank::new();
    let config = Config {
        send_date_stamp: true,
        ..Config::default()
    };
    let ctx = Arc::new(ServerContext::new(config, Arc::new(bank)));

    let (client, server) = duplex(1024);
    let (read_half, write_half) = tokio::io::split(server);
    start_stream_session("a", SessionKind::Tcp, read_half, write_half, ctx.clone());

    let timestamp_ms: i64 = 1_700_000_000_123;
    ctx.registry.broadcast("rout9=1", timestamp_ms);

    let expected_stamp = Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .unwrap()
        .format("%m/%d/%y %H:%M:%S%.3f")
        .to_string();

    let (mut reader, _keep) = tokio::io::split(client);
    assert_eq!(
        read_line(&mut reader).await,
        format!("{} rout9=1", expected_stamp)
    );
}

#[tokio::test]
async fn test_tcp_query_roundtrip() {
    let (bank, _events) = SimulatedBank::new();
    bank.set_input(1, true);
    let ctx = Arc::new(ServerContext::new(quiet_config(), Arc::new(bank)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(tcp::serve(listener, ctx));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"din1?\n").await.unwrap();
    assert_eq!(read_line(&mut stream).await, "din1=1,1");

    stream.write_all(b"c3\nrout3?\n").await.unwrap();
    assert_eq!(read_line(&mut stream).await, "rout3=1");
}
