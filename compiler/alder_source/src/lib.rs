//! Source buffer management and location tracking.
//!
//! The [`SourceManager`] is the sole owner of source text. Every other
//! subsystem refers to source content through opaque [`SourceLocation`]s
//! (a buffer id plus a byte offset) and borrows text only transiently.
//!
//! Buffers come in two flavors:
//!
//! - **File** buffers own text loaded from disk or assigned in memory,
//!   along with a display name and a lazily computed line-offset table.
//! - **Expansion** buffers are synthetic: they record the result of a
//!   macro substitution together with the location of the use site, so
//!   that diagnostics can be reported either at the expansion or at the
//!   original source at the caller's option.
//!
//! Buffer ids are dense, monotonic, and never reused for the lifetime
//! of the manager.

mod location;
mod manager;

pub use location::{BufferId, SourceLocation, SourceRange};
pub use manager::{SourceError, SourceManager};
