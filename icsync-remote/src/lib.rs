//! Remote side of icsync.
//!
//! This crate provides:
//! - `Token` and `TokenStore`, the OAuth token and its on-disk form
//! - `AuthClient`, which refreshes tokens and runs the device authorization flow
//! - `SyncClient`, which decodes ICS text and inserts its events through the remote API

pub mod auth;
pub mod config;
pub mod error;
pub mod sync;
pub mod token;

pub use auth::{AuthClient, DeviceAuthorization, DevicePrompt, QuietPrompt, TerminalPrompt};
pub use config::RemoteConfig;
pub use error::{RemoteError, RemoteResult};
pub use sync::{ImportReport, SyncClient};
pub use token::{Token, TokenStore};
