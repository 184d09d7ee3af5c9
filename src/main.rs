use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    search_mcp::cli::run().await
}
