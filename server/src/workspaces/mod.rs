//! Workspace Registry
//!
//! One record per Slack installation, driving routing and authorization:
//!
//! ```text
//!   OAuth install ──► pending ──(register + auth code)──► active
//!                        ▲                                  │
//!                        │                        (signed unregister)
//!                        │                                  ▼
//!                        └────────(OAuth install)──────  inactive
//! ```
//!
//! Records are never deleted. Bot tokens are encrypted at rest.

pub mod error;
pub mod registry;
pub mod token_crypto;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use registry::{hash_auth_code, WorkspaceRegistry};
pub use types::{WorkspaceRecord, WorkspaceStatus};
