//! Per-connection protocol sessions.
//!
//! A stream session (serial or TCP) owns two tasks: a reader that splits
//! the byte stream into messages and dispatches them, and a writer that
//! owns the write half and renders queued messages one at a time. Replies
//! and broadcast alerts both go through the writer's queue, so a session's
//! sends never interleave on the wire.

use crate::config::Config;
use crate::registry::BroadcastRegistry;
use chrono::{Local, TimeZone};
use relayctl_io::IoBank;
use relayctl_protocol::{
    classify, execute, format_din_reply, format_rout_reply, format_unknown_reply, Inbound,
    TerminatorCodec,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Fixed-width datestamp prepended to outgoing messages (ms precision).
const DATE_FORMAT: &str = "%m/%d/%y %H:%M:%S%.3f";

/// Outbound queue depth per session.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared state handed to every session.
pub struct ServerContext {
    pub config: Config,
    pub bank: Arc<dyn IoBank>,
    pub registry: BroadcastRegistry,
    pub incoming_terminator: Vec<u8>,
    pub outgoing_terminator: Vec<u8>,
}

impl ServerContext {
    /// Build the shared context, decoding the terminator strings once.
    pub fn new(config: Config, bank: Arc<dyn IoBank>) -> Self {
        let incoming_terminator = config.incoming_terminator_bytes();
        let outgoing_terminator = config.outgoing_terminator_bytes();
        ServerContext {
            config,
            bank,
            registry: BroadcastRegistry::new(),
            incoming_terminator,
            outgoing_terminator,
        }
    }
}

/// Transport a session arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Serial,
    Tcp,
    Udp,
}

/// One queued outgoing message. A `timestamp_ms` overrides the datestamp
/// time; broadcasts use it to carry the transition time instead of the
/// wall-clock send time.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub text: String,
    pub timestamp_ms: Option<i64>,
}

/// Cloneable handle for queueing messages to one session's writer.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    name: Arc<str>,
    kind: SessionKind,
    tx: mpsc::Sender<OutboundMessage>,
}

impl SessionHandle {
    /// Create a handle with a fresh session id around an outbound queue.
    pub fn new(name: &str, kind: SessionKind, tx: mpsc::Sender<OutboundMessage>) -> Self {
        SessionHandle {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            kind,
            tx,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Queue a reply, stamped with the send time.
    pub async fn send(&self, text: &str) {
        let message = OutboundMessage {
            text: text.to_string(),
            timestamp_ms: None,
        };
        if self.tx.send(message).await.is_err() {
            warn!("{} send failed: writer is gone", self.name);
        }
    }

    /// Queue a message carrying an explicit timestamp, without waiting for
    /// queue space. Used by the broadcast fan-out.
    pub fn try_send_at(
        &self,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<(), mpsc::error::TrySendError<OutboundMessage>> {
        self.tx.try_send(OutboundMessage {
            text: text.to_string(),
            timestamp_ms: Some(timestamp_ms),
        })
    }
}

/// Start a stream session over a read/write pair.
///
/// The session registers for broadcasts immediately and unregisters when
/// the reader sees end-of-stream or a read error. The returned handle can
/// queue messages to the session from anywhere.
pub fn start_stream_session<R, W>(
    name: &str,
    kind: SessionKind,
    reader: R,
    writer: W,
    ctx: Arc<ServerContext>,
) -> SessionHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let handle = SessionHandle::new(name, kind, tx);
    ctx.registry.register(handle.clone());
    info!("{} session started", handle.name());

    tokio::spawn(writer_task(handle.name.clone(), writer, rx, ctx.clone()));
    tokio::spawn(reader_task(reader, ctx, handle.clone()));

    handle
}

/// Renders and writes queued messages one at a time. A write failure is
/// logged and the session keeps serving.
async fn writer_task<W>(
    name: Arc<str>,
    mut writer: W,
    mut rx: mpsc::Receiver<OutboundMessage>,
    ctx: Arc<ServerContext>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let bytes = render_outbound(&message, &ctx);
        if let Err(err) = writer.write_all(&bytes).await {
            warn!("{} write failed: {}", name, err);
            continue;
        }
        if let Err(err) = writer.flush().await {
            warn!("{} flush failed: {}", name, err);
            continue;
        }
        // Logged with the message's own timestamp semantics; broadcasts can
        // therefore appear out of wall-clock order across sessions.
        info!("{} sent: {}", name, message.text);
    }
}

async fn reader_task<R>(mut reader: R, ctx: Arc<ServerContext>, handle: SessionHandle)
where
    R: AsyncRead + Unpin,
{
    let mut codec = TerminatorCodec::new(ctx.incoming_terminator.clone());
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                codec.push(&buf[..n]);
                while let Some(message) = codec.decode() {
                    process_message(&message, &ctx, &handle).await;
                }
            }
            Err(err) => {
                warn!("{} read failed: {}", handle.name(), err);
                break;
            }
        }
    }
    ctx.registry.unregister(handle.id());
    info!("{} session finished", handle.name());
}

/// Dispatch one decoded inbound message.
///
/// Control commands never get a reply, valid or not; queries and
/// unrecognized text are answered through the session's writer.
pub async fn process_message(message: &str, ctx: &ServerContext, handle: &SessionHandle) {
    info!("{} received: {}", handle.name(), message);
    match classify(message) {
        Inbound::Control(cmd) => execute(&cmd, ctx.bank.as_ref()),
        Inbound::DinQuery(channel) => {
            let state = bit_state(ctx.bank.input_states(), channel);
            let counter = if ctx.config.send_counts {
                channel
                    .checked_sub(1)
                    .map(|index| ctx.bank.input_counter(index))
            } else {
                None
            };
            handle.send(&format_din_reply(channel, state, counter)).await;
        }
        Inbound::RoutQuery(channel) => {
            let state = bit_state(ctx.bank.output_states(), channel);
            handle.send(&format_rout_reply(channel, state)).await;
        }
        Inbound::Unknown => {
            handle.send(&format_unknown_reply(message)).await;
        }
    }
}

/// State of a 1-based channel in a bitfield; out-of-range reads as low.
fn bit_state(field: u32, channel: u32) -> bool {
    channel
        .checked_sub(1)
        .and_then(|index| field.checked_shr(index))
        .map(|shifted| shifted & 1 == 1)
        .unwrap_or(false)
}

/// Render one outgoing message: optional datestamp, body, terminator.
fn render_outbound(message: &OutboundMessage, ctx: &ServerContext) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(message.text.len() + 32);
    if ctx.config.send_date_stamp {
        let timestamp_ms = message.timestamp_ms.unwrap_or_else(now_ms);
        bytes.extend_from_slice(format_datestamp(timestamp_ms).as_bytes());
        bytes.push(b' ');
    }
    bytes.extend_from_slice(message.text.as_bytes());
    bytes.extend_from_slice(&ctx.outgoing_terminator);
    bytes
}

fn format_datestamp(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .unwrap_or_else(Local::now)
        .format(DATE_FORMAT)
        .to_string()
}

fn now_ms() -> i64 {
    Local::now().timestamp_millis()
}
