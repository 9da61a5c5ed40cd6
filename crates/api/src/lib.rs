//! HTTP API and command-line entry points for the inventory service.

pub mod app;
pub mod cli;
pub mod config;
