//! LogLens command line client.
//!
//! The interesting part is [`tail`], the live-tail engine behind
//! `loglens stream`; the rest wires it to the HTTP API and the terminal.

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod login;
pub mod support;
pub mod tail;
