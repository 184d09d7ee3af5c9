use thiserror::Error;

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Reasons a tool call is rejected before reaching the search adapter.
///
/// The display strings are sent to the peer verbatim as response text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Error: Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },
    #[error("Error: 'query' parameter is required")]
    MissingQuery,
    #[error("Error: invalid arguments for '{tool}': {detail}")]
    InvalidArguments { tool: String, detail: String },
}

/// Faults that end a session. Nothing else does.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("MCP handshake failed: {0}")]
    Handshake(#[from] rmcp::service::ServerInitializeError),
    #[error("session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
