//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the diagram engine and an
//! external system (time, filesystem, language model). Implementations live
//! in `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod llm;

pub use clock::Clock;
pub use filesystem::FileSystem;
pub use llm::{GenerationFuture, GenerationRequest, GenerationResponse, LlmClient};

/// Error type returned across port boundaries.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;
