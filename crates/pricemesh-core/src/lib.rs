mod app_config;
mod config;
pub mod listings;
pub mod response;
pub mod sources;

pub use app_config::{AppConfig, Environment, TransportSpec};
pub use config::{load_app_config, load_app_config_from_env, DEFAULT_USER_AGENT};
pub use listings::{
    Coordinates, ExtractedListing, MergedProduct, PriceDetail, RawListing, SourceId,
    SourceOutcome, SourceStatus, PLACEHOLDER_IMAGE_URL,
};
pub use response::{assemble_response, SearchResponse, SearchVerdict};
pub use sources::{load_sources, parse_sources, ExtractorKind, SourceConfig, SourcesFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("invalid source id \"{0}\": must be a non-empty lowercase slug")]
    InvalidSourceId(String),

    #[error("sources validation failed: {0}")]
    Validation(String),
}
