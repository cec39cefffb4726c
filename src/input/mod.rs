//! Input processing: file type detection and text extraction

pub mod file_detector;
pub mod manager;
pub mod text_extractor;

pub use file_detector::{FileType, JOB_DESCRIPTION_EXTENSIONS};
pub use manager::{InputManager, ResumeDocument};
