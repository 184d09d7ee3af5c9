//! Search pipeline: provider abstraction, adapter and result formatting.

pub mod adapter;
pub mod format;
pub mod provider;

pub use adapter::{SearchAdapter, SearchReply};
pub use format::format_results;
pub use provider::{FnProvider, SearchProvider};
