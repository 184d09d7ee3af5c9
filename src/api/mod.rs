pub mod session;

pub use session::{SearchSvc, Session};
