//! Folder watching and run orchestration

pub mod inbox;
pub mod pipeline;
pub mod watcher;

pub use inbox::{Inbox, InputPair, PairSignature};
pub use pipeline::{Pipeline, RunReport};
pub use watcher::{FolderWatcher, PollOutcome, WatchState};
