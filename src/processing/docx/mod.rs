//! `.docx` container and WordprocessingML writing

pub mod builder;
pub mod package;

pub use builder::DocumentBuilder;
pub use package::DocxPackage;
