//! Liaison - a professional connection graph engine.
//!
//! This crate computes multi-degree connection networks, enforces a
//! role-based connection policy, manages the invitation lifecycle and
//! reports invitation analytics. It ships both a library and a CLI backed by
//! JSONL storage.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod analytics;
pub mod domain;
pub mod error;
pub mod hydrate;
pub mod id_generation;
pub mod lifecycle;
pub mod network;
pub mod pending;
pub mod policy;
pub mod storage;
pub mod traversal;

// Application context and configuration
pub mod app;
pub mod config;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// Output formatting for the CLI
pub(crate) mod output;
