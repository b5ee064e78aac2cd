//! The feed orchestrator: wires user input, the fetch controller, the
//! visibility tracker and the session store together.

mod headless;
mod session;
mod view;

pub use headless::{HeadlessViewport, MemoryLocation, ObservedIds};
pub use session::{ReaderDeps, ReaderOptions, ReaderSession};
pub use view::FeedView;

/// The addressable location of the current view (a URL bar, a window title).
pub trait Location: Send {
    /// Replace the current location without adding a history entry.
    fn replace(&mut self, path: &str);
}
