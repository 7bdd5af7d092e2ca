//! External collaborators: upload storage, text generation and PDF export

pub mod file_storage;
pub mod insights;
pub mod pdf;
pub mod text_generation;

pub use file_storage::{FileStorage, LocalFileStorage, StorageError, StoredFile};
pub use insights::InsightService;
pub use pdf::{render_health_summary, PdfExport};
pub use text_generation::{CompletionRequest, GenerationError, OpenAiClient, TextGenerator};
