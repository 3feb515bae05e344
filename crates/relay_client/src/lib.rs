//! Relay client for communicating with Jito block engines
//!
//! This crate handles the JSON-RPC bundle API (tip accounts, submission,
//! status queries), the streaming bundle result subscription, and the
//! upstream Solana RPC used to fetch recent blockhashes.

pub mod client;
pub mod rpc;
pub mod stream;
pub mod traits;

pub use client::*;
pub use rpc::*;
pub use stream::*;
pub use traits::*;
