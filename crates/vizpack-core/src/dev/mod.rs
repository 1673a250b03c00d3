//! Development session: incremental rebuilds driven by file changes.
//!
//! The HTTP side lives in the CLI; this module owns the session state, the
//! rebuild policy and the file watcher feeding it.

pub mod session;
pub mod watch;

pub use session::{DevSession, SessionEvent, SessionState};
pub use watch::{should_ignore, watch_project, DEBOUNCE};
