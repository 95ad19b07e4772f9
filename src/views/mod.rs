//! HTML view subsystem.
//!
//! # Data Flow
//! ```text
//! load("views,themes/dark", funcs)
//!     → store.rs walks each root, collects *.html
//!     → one minijinja Environment per load (templates can include each other)
//!     → swapped in under the write lock
//!
//! render(name, ctx)
//!     → [debug mode: reload first]
//!     → read lock → lookup → execute → Html body
//!
//! watcher.rs (optional)
//!     file change under a root → reload()
//! ```

pub mod error;
pub mod funcs;
pub mod store;
pub mod watcher;

pub use error::{ViewError, NOT_FOUND_BODY};
pub use funcs::FuncMap;
pub use store::ViewStore;
pub use watcher::ViewWatcher;
