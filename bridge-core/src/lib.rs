//! Bridge infrastructure for exposing the async storage client across a
//! crash-resistant foreign boundary.
//!
//! The foreign side cannot participate in Rust's ownership model, so this
//! crate provides the four mechanisms the C surface is built from:
//!
//! - [`registry`]: opaque integer handles mapping to a closed tagged union of
//!   managed objects. Handles are never reused and lookups are type-checked,
//!   so a stale or mistyped handle degrades into a reportable error instead
//!   of undefined behavior.
//! - [`scope`]: a tree of cancellation scopes. Every session owns a root
//!   scope and every sub-operation a child, so freeing a handle aborts all
//!   work started under it without affecting siblings or parents.
//! - [`runtime`]: the blocking entry point that parks a foreign thread on an
//!   async client call while racing it against the scope's cancellation
//!   signal.
//! - [`cursor`]: the lazy three-call (next/item/err) iteration state machine
//!   backing every paginated listing.
//!
//! Nothing in here is a process-wide singleton; the FFI layer constructs one
//! instance of each and tests construct their own.

pub mod cursor;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod scope;

pub use cursor::LazyCursor;
pub use error::{BridgeError, Result};
pub use registry::{
    AccessEntry, DownloadEntry, Entry, Handle, HandleKind, HandleRegistry, PartUploadEntry,
    ProjectEntry, UploadEntry,
};
pub use runtime::BlockingRuntime;
pub use scope::{Scope, ScopeConfig};
