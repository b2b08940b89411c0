mod loader;
mod source;

pub use loader::{OverlayHandle, OverlayLoader, OverlayState};
pub use source::{DirectoryOverlaySource, MemoryOverlaySource, OverlaySource};
