//! RPC surface for the porter CAS transfer client.
//!
//! This crate provides:
//! - Wire message types for the CAS RPCs
//! - Status codes and RPC error types
//! - The collaborator traits the client core is written against
//! - The retry engine

pub mod error;
pub mod messages;
pub mod retry;
pub mod status;
pub mod traits;

pub use error::{RpcError, RpcResult};
pub use messages::{decode, encode};
pub use retry::Retrier;
pub use status::{RpcStatus, StatusCode};
pub use traits::{ByteStreamTransport, CasService, TreePageStream};
