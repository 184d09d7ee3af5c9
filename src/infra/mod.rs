pub mod boot;
pub mod config;
pub mod logging;
pub mod http {
    pub mod headers;
}
pub mod runtime;
