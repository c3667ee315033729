//! Report orchestration.
//!
//! [`ReportPipeline`] fans the three analysis tasks out over a bounded pool
//! and assembles their text. [`ReportGenerator`] wraps it with the steps every
//! report shares: the empty-dataset short circuit, sampling, metrics, the
//! template fallback and section routing.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::agents::{AnalystAgent, GenerationError};
use crate::dataset::{sample, Dataset, Sample};
use crate::error::DatasetError;
use crate::llm::LlmProvider;
use crate::report::{
    extract_metrics, template_document, AnalystReport, GenerationMode, KeywordSectionRouter,
    MetricsSummary, ReportOutcome, SectionRouter,
};

use super::config::{ConfigError, ReportConfig};
use super::tasks::{AnalysisResult, AnalysisRole, AnalysisTask, RawDocument};

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One analysis task failed; no partial document is produced.
    #[error("Report generation failed: {role} task failed: {source}")]
    TaskFailed {
        role: AnalysisRole,
        #[source]
        source: GenerationError,
    },

    /// The sample could not be serialized for the prompts.
    #[error("Sample serialization failed: {0}")]
    Sample(#[from] DatasetError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Role of the failed task, if a task failed.
    pub fn failed_role(&self) -> Option<AnalysisRole> {
        match self {
            PipelineError::TaskFailed { role, .. } => Some(*role),
            _ => None,
        }
    }
}

/// Runs the three analysis tasks against one sample.
#[derive(Debug)]
pub struct ReportPipeline {
    agent: AnalystAgent,
    max_concurrent_tasks: usize,
}

impl ReportPipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ReportConfig) -> Self {
        Self {
            agent: AnalystAgent::new(provider, config.agent_config()),
            // never more permits than tasks
            max_concurrent_tasks: config.max_concurrent_tasks.clamp(1, AnalysisRole::ALL.len()),
        }
    }

    /// Runs every task and joins their text in role order.
    ///
    /// All tasks run to completion; if any failed, the first failure in role
    /// order is returned.
    ///
    /// # Errors
    ///
    /// [`PipelineError::TaskFailed`] naming the failed role, or
    /// [`PipelineError::Sample`] if the sample cannot be rendered as CSV.
    pub async fn run_pipeline(&self, sample: &Sample) -> Result<RawDocument, PipelineError> {
        let table = sample.to_csv()?;
        let tasks = AnalysisTask::for_sample(&table);
        let limiter = Semaphore::new(self.max_concurrent_tasks);

        let futures: Vec<_> = tasks
            .iter()
            .map(|task| {
                let limiter = &limiter;
                async move {
                    let _permit = match limiter.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let err = GenerationError::Unavailable(format!(
                                "Failed to acquire permit: {}",
                                e
                            ));
                            return (task.role, Err(err));
                        }
                    };
                    (task.role, self.run_task(task).await)
                }
            })
            .collect();

        let outcomes = futures::future::join_all(futures).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (role, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(source) => {
                    tracing::error!(role = %role, error = %source, "Analysis task failed");
                    return Err(PipelineError::TaskFailed { role, source });
                }
            }
        }

        Ok(RawDocument::assemble(results))
    }

    async fn run_task(&self, task: &AnalysisTask) -> Result<AnalysisResult, GenerationError> {
        let start = Instant::now();
        let text = self
            .agent
            .generate(&task.persona, &task.instruction, &task.context())
            .await?;
        let elapsed = start.elapsed();

        tracing::debug!(
            role = %task.role,
            elapsed_ms = elapsed.as_millis() as u64,
            chars = text.len(),
            "Analysis task completed"
        );

        Ok(AnalysisResult {
            role: task.role,
            text,
            elapsed,
        })
    }
}

/// Produces [`ReportOutcome`]s from datasets.
pub struct ReportGenerator {
    config: ReportConfig,
    pipeline: Option<ReportPipeline>,
    router: Box<dyn SectionRouter>,
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("config", &self.config)
            .field("agents_enabled", &self.pipeline.is_some())
            .finish_non_exhaustive()
    }
}

impl ReportGenerator {
    /// Creates a generator. Without a provider every report uses the template.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] if `config` does not validate.
    pub fn new(
        config: ReportConfig,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let pipeline = provider.map(|p| ReportPipeline::new(p, &config));
        Ok(Self {
            config,
            pipeline,
            router: Box::new(KeywordSectionRouter),
        })
    }

    /// Creates a generator that never calls a text generator.
    pub fn template_only(config: ReportConfig) -> Result<Self, PipelineError> {
        Self::new(config, None)
    }

    pub fn with_router(mut self, router: Box<dyn SectionRouter>) -> Self {
        self.router = router;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn agents_enabled(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Builds a report for `dataset`.
    ///
    /// An empty dataset yields [`ReportOutcome::NoData`] without sampling or
    /// calling the provider.
    ///
    /// # Errors
    ///
    /// [`PipelineError::TaskFailed`] when an analysis task fails and
    /// `fallback_on_error` is off.
    pub async fn generate(&self, dataset: &Dataset) -> Result<ReportOutcome, PipelineError> {
        if dataset.is_empty() {
            tracing::info!("Dataset has no rows, skipping report");
            return Ok(ReportOutcome::NoData);
        }

        let metrics = extract_metrics(dataset);
        let sample = sample(dataset, self.config.sample_cap, self.config.seed);

        tracing::info!(
            rows = dataset.row_count(),
            sample_size = sample.len(),
            agents = self.agents_enabled(),
            "Starting report generation"
        );

        let (raw_document, mode) = match &self.pipeline {
            Some(pipeline) => match pipeline.run_pipeline(&sample).await {
                Ok(document) => (document.into_text(), GenerationMode::Agents),
                Err(e) if self.config.fallback_on_error => {
                    tracing::warn!(error = %e, "Agent pipeline failed, using template narrative");
                    (template_document(dataset, &metrics), GenerationMode::Template)
                }
                Err(e) => return Err(e),
            },
            None => {
                tracing::warn!("No text generator configured, using template narrative");
                (template_document(dataset, &metrics), GenerationMode::Template)
            }
        };

        let report = self.assemble(dataset, &sample, raw_document, mode, metrics);
        tracing::info!(
            mode = %report.mode,
            metrics = report.metrics.len(),
            "Report generation finished"
        );
        Ok(ReportOutcome::Report(report))
    }

    /// Builds a template-mode report regardless of the configured provider.
    pub fn generate_template(&self, dataset: &Dataset) -> ReportOutcome {
        if dataset.is_empty() {
            tracing::info!("Dataset has no rows, skipping report");
            return ReportOutcome::NoData;
        }
        tracing::info!(rows = dataset.row_count(), "Generating template report");
        let metrics = extract_metrics(dataset);
        let sample = sample(dataset, self.config.sample_cap, self.config.seed);
        let raw_document = template_document(dataset, &metrics);
        ReportOutcome::Report(self.assemble(
            dataset,
            &sample,
            raw_document,
            GenerationMode::Template,
            metrics,
        ))
    }

    fn assemble(
        &self,
        dataset: &Dataset,
        sample: &Sample,
        raw_document: String,
        mode: GenerationMode,
        metrics: MetricsSummary,
    ) -> AnalystReport {
        AnalystReport {
            generated_at: Utc::now(),
            mode,
            row_count: dataset.row_count(),
            sample_size: sample.len(),
            sections: self.router.route(&raw_document),
            raw_document,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message, Usage};
    use crate::report::{Section, SectionMap};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replies based on which persona is asking, with per-role latency.
    struct RoleAwareProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        fail_role: Option<&'static str>,
    }

    impl RoleAwareProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                fail_role: None,
            }
        }

        fn failing_on(role: &'static str) -> Self {
            Self {
                fail_role: Some(role),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RoleAwareProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let system = request.messages[0].content.clone();
            // first task finishes last
            let (text, delay) = if system.contains("Insights Analyst") {
                ("# Key Insights\nPro customers dominate.", 60)
            } else if system.contains("Quality Auditor") {
                ("# Data Quality Assessment\nNo missing values.", 30)
            } else {
                ("# Recommendations\nUpsell Basic customers.", 1)
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_role.is_some_and(|r| system.contains(r)) {
                return Err(LlmError::ApiError {
                    code: 503,
                    message: "upstream unavailable".to_string(),
                });
            }

            Ok(GenerationResponse {
                id: "mock".to_string(),
                model: "mock".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(text),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }
    }

    fn customers(rows: usize) -> Dataset {
        let headers = vec!["Plan".to_string(), "Churned".to_string()];
        let rows: Vec<Vec<String>> = (0..rows)
            .map(|i| {
                vec![
                    if i % 2 == 0 { "Pro" } else { "Basic" }.to_string(),
                    (i % 4 == 0).to_string(),
                ]
            })
            .collect();
        Dataset::from_rows(&headers, &rows).expect("valid dataset")
    }

    #[tokio::test]
    async fn test_pipeline_keeps_role_order_under_reversed_latency() {
        let provider = Arc::new(RoleAwareProvider::new());
        let pipeline = ReportPipeline::new(provider.clone(), &ReportConfig::default());
        let ds = customers(10);

        let doc = pipeline
            .run_pipeline(&sample(&ds, 50, 42))
            .await
            .expect("pipeline succeeds");

        let insights = doc.text().find("# Key Insights").expect("insights present");
        let quality = doc.text().find("# Data Quality").expect("quality present");
        let recs = doc.text().find("# Recommendations").expect("recommendations present");
        assert!(insights < quality && quality < recs);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(doc.results().len(), 3);
    }

    #[tokio::test]
    async fn test_pool_bound_is_respected() {
        let provider = Arc::new(RoleAwareProvider::new());
        let config = ReportConfig::default().with_max_concurrent_tasks(1);
        let pipeline = ReportPipeline::new(provider.clone(), &config);

        pipeline
            .run_pipeline(&sample(&customers(5), 50, 42))
            .await
            .expect("pipeline succeeds");

        assert_eq!(provider.peak_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_failed_task_fails_pipeline() {
        let provider = Arc::new(RoleAwareProvider::failing_on("Quality Auditor"));
        let pipeline = ReportPipeline::new(provider, &ReportConfig::default());

        let err = pipeline
            .run_pipeline(&sample(&customers(5), 50, 42))
            .await
            .unwrap_err();

        assert_eq!(err.failed_role(), Some(AnalysisRole::QualityAudit));
        assert!(err.to_string().contains("quality task failed"));
    }

    #[tokio::test]
    async fn test_empty_dataset_is_no_data_without_calls() {
        let provider = Arc::new(RoleAwareProvider::new());
        let generator =
            ReportGenerator::new(ReportConfig::default(), Some(provider.clone())).expect("valid");

        let outcome = generator.generate(&customers(0)).await.expect("no error");

        assert!(outcome.is_no_data());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generator_routes_agent_text() {
        let provider = Arc::new(RoleAwareProvider::new());
        let generator =
            ReportGenerator::new(ReportConfig::default(), Some(provider)).expect("valid");

        let outcome = generator.generate(&customers(8)).await.expect("report");
        let report = outcome.report().expect("has report");

        assert_eq!(report.mode, GenerationMode::Agents);
        assert_eq!(report.row_count, 8);
        assert!(report.sections.insights().contains("Pro customers dominate."));
        assert!(report.sections.quality().contains("No missing values."));
        assert!(report.sections.recommendations().contains("Upsell Basic"));
        assert!(report.sections.is_blank(Section::Intro));
        assert_eq!(report.sections.reconstruct(), report.raw_document);
    }

    #[tokio::test]
    async fn test_failure_propagates_without_fallback() {
        let provider = Arc::new(RoleAwareProvider::failing_on("Data Strategist"));
        let generator =
            ReportGenerator::new(ReportConfig::default(), Some(provider)).expect("valid");

        let err = generator.generate(&customers(4)).await.unwrap_err();
        assert_eq!(err.failed_role(), Some(AnalysisRole::Recommendations));
    }

    #[tokio::test]
    async fn test_failure_falls_back_when_enabled() {
        let provider = Arc::new(RoleAwareProvider::failing_on("Data Strategist"));
        let config = ReportConfig::default().with_fallback_on_error(true);
        let generator = ReportGenerator::new(config, Some(provider)).expect("valid");

        let outcome = generator.generate(&customers(4)).await.expect("fallback report");
        let report = outcome.report().expect("has report");

        assert_eq!(report.mode, GenerationMode::Template);
        assert!(!report.sections.is_blank(Section::Insights));
        assert!(!report.sections.is_blank(Section::Recommendations));
    }

    #[tokio::test]
    async fn test_template_only_generator() {
        let generator = ReportGenerator::template_only(ReportConfig::default()).expect("valid");
        assert!(!generator.agents_enabled());

        let outcome = generator.generate(&customers(60)).await.expect("report");
        let report = outcome.report().expect("has report");

        assert_eq!(report.mode, GenerationMode::Template);
        assert_eq!(report.sample_size, 50);
        assert!(report.sections.insights().contains("The churn rate is"));
    }

    #[tokio::test]
    async fn test_pool_larger_than_semaphore_limit_is_clamped() {
        let provider = Arc::new(RoleAwareProvider::new());
        let config = ReportConfig::default().with_max_concurrent_tasks(usize::MAX);
        let pipeline = ReportPipeline::new(provider.clone(), &config);

        pipeline
            .run_pipeline(&sample(&customers(5), 50, 42))
            .await
            .expect("pipeline succeeds");

        assert_eq!(pipeline.max_concurrent_tasks, AnalysisRole::ALL.len());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generate_template_skips_provider() {
        let provider = Arc::new(RoleAwareProvider::new());
        let generator =
            ReportGenerator::new(ReportConfig::default(), Some(provider.clone())).expect("valid");

        assert!(generator.generate_template(&customers(0)).is_no_data());

        let outcome = generator.generate_template(&customers(6));
        let report = outcome.report().expect("has report");
        assert_eq!(report.mode, GenerationMode::Template);
        assert!(report.sections.insights().contains("The churn rate is"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    /// Strips heading markers so every line stays in the intro.
    struct IntroOnlyRouter;

    impl SectionRouter for IntroOnlyRouter {
        fn route(&self, document: &str) -> SectionMap {
            KeywordSectionRouter.route(&document.replace('#', ""))
        }
    }

    #[tokio::test]
    async fn test_custom_router_is_used() {
        let generator = ReportGenerator::template_only(ReportConfig::default())
            .expect("valid")
            .with_router(Box::new(IntroOnlyRouter));

        let outcome = generator.generate(&customers(6)).await.expect("report");
        let report = outcome.report().expect("has report");

        assert!(report.sections.intro().contains("Key Insights"));
        assert!(report.sections.is_blank(Section::Insights));
        assert!(report.sections.is_blank(Section::Recommendations));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = ReportGenerator::template_only(ReportConfig::default().with_sample_cap(0))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
