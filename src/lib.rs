pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod source;
pub mod view;

pub use error::PipelineError;
pub use pipeline::DataPipeline;
pub use records::{MergedRecord, MergedTable, SubRecommendation};
