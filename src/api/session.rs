//! MCP session: the rmcp server handler for the search tool and the loop that serves it.
//!
//! rmcp owns the protocol (handshake, version negotiation, routing). The
//! transport underneath admits one request at a time, so each request is
//! handled to completion, search included, before the next one is read.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, ServerInitializeError};
use rmcp::{serve_server, ErrorData, RoleServer, ServerHandler};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::core::error::SessionError;
use crate::infra::runtime::mcp_transport::{LineTransport, TransportFault};
use crate::search::{SearchAdapter, SearchProvider};
use crate::tools::{build_registry, Dispatcher, ToolRegistry};

pub const SERVER_NAME: &str = "search-mcp";

const INSTRUCTIONS: &str =
    "Use web_search to look things up on the web. Results come back as a numbered text list.";

/// rmcp handler: discovery from the registry, invocation through the dispatcher.
#[derive(Clone)]
pub struct SearchSvc {
    registry: ToolRegistry,
    dispatcher: Dispatcher,
}

impl SearchSvc {
    pub fn new(registry: ToolRegistry, adapter: SearchAdapter) -> Self {
        let dispatcher = Dispatcher::new(registry.clone(), adapter);
        Self { registry, dispatcher }
    }

    /// Advertised tools, in registry order. Aliases are not listed.
    pub fn tools(&self) -> Vec<Tool> {
        self.registry
            .list_tools()
            .iter()
            .map(|t| t.to_mcp_tool())
            .collect()
    }
}

impl ServerHandler for SearchSvc {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = SERVER_NAME.into();
        info.server_info.version = env!("CARGO_PKG_VERSION").into();
        info.instructions = Some(INSTRUCTIONS.into());
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.unwrap_or_default();
        Ok(self.dispatcher.invoke(&request.name, arguments).await)
    }
}

/// One MCP peer served over a line-delimited reader/writer pair.
pub struct Session {
    svc: SearchSvc,
}

impl Session {
    pub fn new(registry: ToolRegistry, adapter: SearchAdapter) -> Self {
        Self {
            svc: SearchSvc::new(registry, adapter),
        }
    }

    /// Session over the default registry, searching through `provider`.
    pub fn with_provider(provider: Arc<dyn SearchProvider>) -> Self {
        Self::new(build_registry(), SearchAdapter::new(provider))
    }

    pub fn service(&self) -> &SearchSvc {
        &self.svc
    }

    /// Serve until the reader reports end of stream.
    ///
    /// Only transport failures and a broken handshake end the session with an
    /// error; every malformed or failing request still gets a response.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tracing::info!(server = SERVER_NAME, version = env!("CARGO_PKG_VERSION"), "session started");
        let transport = LineTransport::new(reader, writer);
        let fault = transport.fault();

        let running = match serve_server(self.svc, transport).await {
            Ok(running) => running,
            Err(ServerInitializeError::ConnectionClosed(context)) => {
                tracing::info!(%context, "peer left before the handshake completed");
                return take_fault(&fault);
            }
            Err(e) => {
                tracing::error!(error = %e, "handshake failed");
                return Err(e.into());
            }
        };

        let reason = running.waiting().await?;
        tracing::info!(?reason, "transport closed; session ended");
        take_fault(&fault)
    }
}

fn take_fault(fault: &TransportFault) -> Result<(), SessionError> {
    match fault.lock().ok().and_then(|mut slot| slot.take()) {
        Some(e) => Err(SessionError::Transport(e)),
        None => Ok(()),
    }
}
