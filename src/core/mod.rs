//! Core types: the error model shared by every layer.

pub mod error;
