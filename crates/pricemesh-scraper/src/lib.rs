pub mod error;
pub mod extract;
pub mod gateway;
pub mod orchestrator;
pub mod retry;
pub mod source;

pub use error::{FetchError, OrchestratorError, ScraperError};
pub use extract::{extractor_for, Extractor, JsonLdExtractor, NextDataExtractor};
pub use gateway::{FetchGateway, GatewayConfig};
pub use orchestrator::{Orchestrator, SearchOutcome};
pub use retry::{RetryOutcome, RetryPolicy};
pub use source::{Retrieval, SourceClient};
