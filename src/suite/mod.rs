pub mod layout;
pub mod session;
pub mod walk;


pub use layout::{CONFIG_FILE, Layout, REGRESS_DIR, ensure_dir};
pub use session::{FileError, RunSummary, Session};
pub use walk::{Folder, Suite};
