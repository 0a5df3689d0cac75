//! Transport backends that deliver analysis response chunks

pub mod http;
pub mod mock;
pub mod replay;
pub mod traits;

pub use http::{BackendConfig, DEFAULT_TIMEOUT_SECS, HttpBackend};
pub use mock::MockBackend;
pub use replay::{DEFAULT_CHUNK_SIZE, ReplayBackend};
pub use traits::{AnalysisBackend, ChunkStream};
