//! Client registry for boxoffice.
//!
//! This crate owns the answer to "client identity -> client state":
//!
//! 1. **Client state**: [`ClientRecord`] and its state machine
//!    ([`ClientStatus`], [`Transition`])
//! 2. **Shared access**: [`ClientRegistry`], the single locked path every
//!    actor uses to read or change an entry
//! 3. **Routing**: resolving a client's inbox so replies and screening
//!    events reach the right actor
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher / Room schedulers  ← resolve inboxes through the registry
//!     ↕
//! Registry (this crate)         ← client identity and state
//!     ↕
//! Channel + Protocol (below)    ← inbox handles, notification types
//! ```

mod client;
mod error;
mod registry;

pub use client::{ClientProfile, ClientRecord, ClientStatus, IgnoreReason, Transition};
pub use error::RegistryError;
pub use registry::ClientRegistry;
