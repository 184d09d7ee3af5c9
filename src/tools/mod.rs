pub mod dispatch;
pub mod registry;

pub use dispatch::{Dispatcher, InvocationRequest};
pub use registry::{build_registry, ToolDescriptor, ToolRegistry};
