//! smsbridge library
//!
//! Exposes the CLI plumbing for integration testing

pub mod cli;
pub mod config;
pub mod responder;
pub mod session;
