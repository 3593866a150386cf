//! Command implementations that do not need a loaded [`App`](crate::app::App).

pub mod init;
