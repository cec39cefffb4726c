//! Document processing: extraction, alignment and reconstruction

pub mod alignment;
pub mod classify;
pub mod docx;
pub mod extractor;
pub mod fingerprint;
pub mod reconstruct;
pub mod validator;

pub use extractor::{extract, extract_text};
pub use fingerprint::FormattingFingerprint;
pub use reconstruct::{ReconstructionOutcome, Tier, TieredReconstructor};
pub use validator::FormattingReport;
