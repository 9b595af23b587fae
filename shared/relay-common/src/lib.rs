//! Relay Common Library
//!
//! Wire protocol shared by the relay broker and user automation servers.

pub mod protocol;

pub use protocol::*;
