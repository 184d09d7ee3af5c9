//! Line-delimited stdio transport for the rmcp server loop.
//!
//! rmcp answers each request on its own task. [`LineTransport`] admits one
//! request at a time: the next line is not read until every admitted request
//! has been answered, so responses leave in arrival order. Lines rmcp cannot
//! decode are answered here with a JSON-RPC error and the session carries on.

use std::io;
use std::sync::{Arc, Mutex as StdMutex};

use rmcp::model::{
    ClientJsonRpcMessage, ErrorCode, ErrorData, JsonRpcBatchRequestItem, JsonRpcMessage,
    ServerJsonRpcMessage,
};
use rmcp::service::RoleServer;
use rmcp::transport::Transport;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::{watch, Mutex};

use crate::api::session::Session;
use crate::core::error::SessionError;

/// Client request methods rmcp routes. Other methods get "method not found".
const CLIENT_METHODS: &[&str] = &[
    "initialize",
    "ping",
    "tools/list",
    "tools/call",
    "completion/complete",
    "logging/setLevel",
    "prompts/get",
    "prompts/list",
    "resources/list",
    "resources/templates/list",
    "resources/read",
    "resources/subscribe",
    "resources/unsubscribe",
];

/// First I/O error the transport ran into, if any.
pub type TransportFault = Arc<StdMutex<Option<io::Error>>>;

pub struct LineTransport<R, W> {
    lines: Lines<R>,
    writer: Arc<Mutex<W>>,
    owed: Arc<watch::Sender<usize>>,
    settled: watch::Receiver<usize>,
    fault: TransportFault,
}

enum Inbound {
    Message(ClientJsonRpcMessage),
    Reject(Value),
    Ignore,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        let (owed, settled) = watch::channel(0);
        Self {
            lines: reader.lines(),
            writer: Arc::new(Mutex::new(writer)),
            owed: Arc::new(owed),
            settled,
            fault: TransportFault::default(),
        }
    }

    pub fn fault(&self) -> TransportFault {
        self.fault.clone()
    }
}

impl<R, W> Transport<RoleServer> for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = io::Error;

    fn send(
        &mut self,
        item: ServerJsonRpcMessage,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send + 'static {
        let answers = matches!(item, JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_));
        let line = serde_json::to_string(&item);
        let writer = self.writer.clone();
        let owed = self.owed.clone();
        let fault = self.fault.clone();
        async move {
            match line {
                Ok(line) => deliver(writer, owed, fault, line, answers).await,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode response");
                    if answers {
                        settle(&owed);
                    }
                    Err(e.into())
                }
            }
        }
    }

    async fn receive(&mut self) -> Option<ClientJsonRpcMessage> {
        loop {
            let ready = self.settled.wait_for(|owed| *owed == 0).await.is_ok();
            if !ready {
                return None;
            }

            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read from peer");
                    record(&self.fault, e);
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match decode_line(&line) {
                Inbound::Message(msg) => {
                    let owed = responses_owed(&msg);
                    if owed > 0 {
                        self.owed.send_modify(|n| *n += owed);
                    }
                    return Some(msg);
                }
                Inbound::Reject(reply) => {
                    self.owed.send_modify(|n| *n += 1);
                    tokio::spawn(deliver(
                        self.writer.clone(),
                        self.owed.clone(),
                        self.fault.clone(),
                        reply.to_string(),
                        true,
                    ));
                }
                Inbound::Ignore => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.writer.lock().await.flush().await
    }
}

/// Run the MCP session over stdin/stdout until the peer disconnects.
pub async fn serve_stdio(session: Session) -> Result<(), SessionError> {
    let (stdin, stdout) = rmcp::transport::stdio();
    session.run(BufReader::new(stdin), stdout).await
}

async fn deliver<W>(
    writer: Arc<Mutex<W>>,
    owed: Arc<watch::Sender<usize>>,
    fault: TransportFault,
    line: String,
    answers: bool,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = {
        let mut w = writer.lock().await;
        write_line(&mut *w, &line).await
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "failed to write to peer");
        record(&fault, io::Error::new(e.kind(), e.to_string()));
    }
    if answers {
        settle(&owed);
    }
    result
}

async fn write_line<W: AsyncWrite + Unpin>(w: &mut W, line: &str) -> io::Result<()> {
    w.write_all(line.as_bytes()).await?;
    w.write_all(b"\n").await?;
    w.flush().await
}

fn settle(owed: &watch::Sender<usize>) {
    owed.send_modify(|n| *n = n.saturating_sub(1));
}

fn record(fault: &TransportFault, e: io::Error) {
    if let Ok(mut slot) = fault.lock() {
        slot.get_or_insert(e);
    }
}

fn responses_owed(msg: &ClientJsonRpcMessage) -> usize {
    match msg {
        JsonRpcMessage::Request(_) => 1,
        JsonRpcMessage::BatchRequest(items) => items
            .iter()
            .filter(|i| matches!(i, JsonRpcBatchRequestItem::Request(_)))
            .count(),
        _ => 0,
    }
}

fn decode_line(line: &str) -> Inbound {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return reject(
                Value::Null,
                ErrorData::parse_error(format!("parse error: {e}"), None),
            )
        }
    };
    let cause = match serde_json::from_value::<ClientJsonRpcMessage>(value.clone()) {
        Ok(msg) => return Inbound::Message(msg),
        Err(e) => e,
    };

    let Some(obj) = value.as_object() else {
        return reject(
            Value::Null,
            ErrorData::invalid_request("invalid request: expected a JSON object", None),
        );
    };
    let Some(id) = obj.get("id").cloned() else {
        tracing::debug!(error = %cause, "ignoring undecodable notification");
        return Inbound::Ignore;
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return reject(
            id,
            ErrorData::invalid_request("invalid request: jsonrpc must be \"2.0\"", None),
        );
    }
    if !(id.is_string() || id.is_u64()) {
        return reject(
            id,
            ErrorData::invalid_request(
                "invalid request: id must be a string or a non-negative integer",
                None,
            ),
        );
    }
    match obj.get("method").and_then(Value::as_str) {
        None => reject(id, ErrorData::invalid_request("invalid request: missing method", None)),
        Some(m) if CLIENT_METHODS.contains(&m) => reject(
            id,
            ErrorData::invalid_params(format!("invalid params for {m}: {cause}"), None),
        ),
        Some(m) => reject(
            id,
            ErrorData::new(ErrorCode::METHOD_NOT_FOUND, format!("unknown method: {m}"), None),
        ),
    }
}

fn reject(id: Value, error: ErrorData) -> Inbound {
    tracing::warn!(id = %id, code = error.code.0, message = %error.message, "rejecting message");
    Inbound::Reject(json!({ "jsonrpc": "2.0", "id": id, "error": error }))
}
