//! Coursework file store adapters.
//!
//! Implements the [`FileStore`](grading::FileStore) port defined in the
//! [`grading`] crate:
//!
//! - [`MemoryStore`]: an ordered in-memory map, used by tests and dry runs.
//! - [`DirectoryStore`]: a directory on the local filesystem, typically a
//!   checkout of the course's grades repository.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Path
//! validation is shared with the port via [`grading::store::validate_path`].

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
