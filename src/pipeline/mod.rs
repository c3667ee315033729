//! Report generation pipeline.
//!
//! # Flow
//!
//! 1. **Short circuit**: an empty dataset yields `ReportOutcome::NoData`
//! 2. **Metrics**: computed from the full dataset, never from the sample
//! 3. **Sampling**: at most `sample_cap` rows, seeded when capped
//! 4. **Analysis**: three independent role tasks on a bounded pool, or the
//!    template narrative when no provider is configured
//! 5. **Routing**: the raw document is split into report sections
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use icp_journal::dataset::Dataset;
//! use icp_journal::llm::OpenRouterProvider;
//! use icp_journal::pipeline::{ReportConfig, ReportGenerator};
//! use icp_journal::report::ReportOutcome;
//!
//! let dataset = Dataset::from_csv_path("customers.csv")?;
//! let provider = Arc::new(OpenRouterProvider::new(api_key)?);
//! let generator = ReportGenerator::new(ReportConfig::from_env()?, Some(provider))?;
//!
//! match generator.generate(&dataset).await? {
//!     ReportOutcome::NoData => println!("No data to analyze."),
//!     ReportOutcome::Report(report) => println!("{}", report.to_json()?),
//! }
//! ```

pub mod config;
pub mod journal;
pub mod orchestrator;
pub mod tasks;

pub use config::{ConfigError, ReportConfig};
pub use journal::{findings_text, JournalWriter};
pub use orchestrator::{PipelineError, ReportGenerator, ReportPipeline};
pub use tasks::{AnalysisResult, AnalysisRole, AnalysisTask, RawDocument};
