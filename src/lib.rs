//! search-mcp: a Model Context Protocol server exposing one `web_search` tool over stdio.

pub mod api;
pub mod cli;
pub mod clients;
pub mod core;
pub mod domain;
pub mod infra;
pub mod search;
pub mod tools;
