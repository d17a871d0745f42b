pub mod history;
pub mod inbox;
pub mod workspace;

pub use history::{list_history, resolve_public_path, HistoryEntry, MAX_HISTORY_LIMIT};
pub use inbox::stage_archive;
pub use workspace::{remove_dir_if_exists, remove_file_if_exists, JobWorkspace};
