//! Scenario step sequencer
//!
//! Runs each scenario's steps strictly in order on one page of one browser
//! session. Assertion misses, wait timeouts and absent click targets degrade
//! the report; navigation failures, capture failures, session acquisition
//! failures and the run deadline end the scenario. The session is released
//! on every path out of [`ScenarioRunner::run`].

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::assertion::{assert_visible, AssertionResult};
use crate::browser::{BrowserEngine, Page};
use crate::capture::CaptureSink;
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::report::{Artifact, Marker, Reporter, RunReport, StepOutcome, StepRecord, SuiteReport};
use crate::session::SessionManager;
use crate::spec::{Interaction, Scenario, SelectorSpec, Step, WaitStrategy};
use crate::wait::{WaitOutcome, WaitResolver};

/// Everything recorded while a scenario executes
#[derive(Default)]
struct RunState {
    records: Vec<StepRecord>,
    assertions: Vec<AssertionResult>,
    artifacts: Vec<Artifact>,
    fatal: Option<E2eError>,
}

type StepResult = E2eResult<(StepOutcome, Option<String>)>;

pub struct ScenarioRunner {
    config: HarnessConfig,
    base_url: Url,
    sessions: SessionManager,
    resolver: WaitResolver,
    sink: CaptureSink,
    reporter: Reporter,
}

impl ScenarioRunner {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        config: HarnessConfig,
        reporter: Reporter,
    ) -> E2eResult<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            base_url,
            sessions: SessionManager::new(engine, config.headless),
            resolver: WaitResolver::new(config.delays.clone(), config.timeouts.clone()),
            sink: CaptureSink::new(config.artifact_dir.clone()),
            reporter,
            config,
        })
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run scenarios one after another, each in its own browser session
    pub async fn run_suite(&mut self, scenarios: &[Scenario]) -> SuiteReport {
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());

        info!(
            "Running {} scenario(s) against {}, screenshots in {}",
            scenarios.len(),
            self.base_url,
            self.sink.dir().display()
        );

        for scenario in scenarios {
            results.push(self.run(scenario).await);
        }

        let suite = SuiteReport::from_runs(results, start.elapsed().as_millis() as u64);
        info!(
            "Scenario results: {} completed, {} fatal ({} ms)",
            suite.completed, suite.fatal, suite.duration_ms
        );
        suite
    }

    /// Run one scenario. Never returns an error: fatal conditions are part of the report.
    pub async fn run(&mut self, scenario: &Scenario) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut state = RunState::default();

        debug!("Running scenario: {}", scenario.name);
        self.reporter.plain(&format!("Testing {}...", scenario.name));

        if let Err(e) = scenario.validate(&self.config.delays) {
            state.fatal = Some(e);
        } else {
            match self.sessions.acquire().await {
                Err(e) => state.fatal = Some(e),
                Ok(session) => {
                    let deadline = self.config.timeouts.run();
                    let finished = tokio::time::timeout(
                        deadline,
                        self.execute(session.page(), scenario, &mut state),
                    )
                    .await;

                    if finished.is_err() {
                        let interrupted = state.records.len();
                        let err = E2eError::RunDeadline(self.config.timeouts.run_ms);
                        if let Some(step) = scenario.steps.get(interrupted) {
                            state.records.push(StepRecord {
                                index: interrupted + 1,
                                kind: step.kind(),
                                description: step.describe(),
                                outcome: StepOutcome::Fatal,
                                detail: Some(err.to_string()),
                                duration_ms: 0,
                            });
                        }
                        state.fatal = Some(err);
                    }

                    if let Err(e) = session.release().await {
                        warn!("Releasing browser session failed: {}", e);
                    }
                }
            }
        }

        if let Some(err) = &state.fatal {
            error!("Scenario '{}' failed: {}", scenario.name, err);
            self.reporter.report(Marker::Fatal, &err.to_string());
        }

        for (i, step) in scenario.steps.iter().enumerate().skip(state.records.len()) {
            state.records.push(StepRecord {
                index: i + 1,
                kind: step.kind(),
                description: step.describe(),
                outcome: StepOutcome::Aborted,
                detail: None,
                duration_ms: 0,
            });
        }

        let report = RunReport {
            scenario: scenario.name.clone(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            success: state.fatal.is_none(),
            fatal_error: state.fatal.as_ref().map(|e| e.to_string()),
            steps: state.records,
            assertions: state.assertions,
            artifacts: state.artifacts,
        };

        self.summarize(&report);
        report
    }

    async fn execute(&mut self, page: &dyn Page, scenario: &Scenario, state: &mut RunState) {
        let prefix = scenario.artifact_prefix();

        for (i, step) in scenario.steps.iter().enumerate() {
            let started = Instant::now();
            debug!("Step {}: {}", i + 1, step.describe());

            let result = self.execute_step(page, &prefix, step, state).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok((outcome, detail)) => state.records.push(StepRecord {
                    index: i + 1,
                    kind: step.kind(),
                    description: step.describe(),
                    outcome,
                    detail,
                    duration_ms,
                }),
                Err(e) => {
                    state.records.push(StepRecord {
                        index: i + 1,
                        kind: step.kind(),
                        description: step.describe(),
                        outcome: StepOutcome::Fatal,
                        detail: Some(e.to_string()),
                        duration_ms,
                    });
                    state.fatal = Some(e);
                    return;
                }
            }
        }
    }

    async fn execute_step(
        &mut self,
        page: &dyn Page,
        prefix: &str,
        step: &Step,
        state: &mut RunState,
    ) -> StepResult {
        match step {
            Step::Navigate { url } => self.navigate(page, url).await,
            Step::Wait { strategy } => Ok(self.wait(page, strategy).await),
            Step::AssertVisible { selector, label } => {
                let result = assert_visible(page, selector, label).await;
                let outcome = if result.passed {
                    self.reporter.report(Marker::Ok, &format!("{} is visible", label));
                    StepOutcome::Passed
                } else if result.observed.is_none() {
                    self.reporter
                        .report(Marker::Warn, &format!("{} could not be checked", label));
                    StepOutcome::Failed
                } else {
                    self.reporter.report(Marker::Warn, &format!("{} not visible", label));
                    StepOutcome::Failed
                };
                state.assertions.push(result);
                Ok((outcome, None))
            }
            Step::Interact { selector, action } => {
                Ok(self.interact(page, selector, *action).await)
            }
            Step::Capture { checkpoint } => {
                let artifact = self.sink.capture(page, prefix, checkpoint).await?;
                self.reporter.report(
                    Marker::Saved,
                    &format!("{} -> {}", checkpoint, artifact.path.display()),
                );
                let detail = artifact.path.display().to_string();
                state.artifacts.push(artifact);
                Ok((StepOutcome::Completed, Some(detail)))
            }
        }
    }

    async fn navigate(&mut self, page: &dyn Page, url: &str) -> StepResult {
        let target = self.base_url.join(url).map_err(|e| E2eError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let timeout = std::time::Duration::from_millis(self.config.timeouts.navigation_ms);

        // Anything short of a classified fatal error still means the page never loaded
        let navigation = page.goto(target.as_str(), timeout).await.map_err(|e| match e {
            e if e.is_fatal() => e,
            other => E2eError::Navigation {
                url: target.to_string(),
                reason: other.to_string(),
            },
        })?;

        if !navigation.is_success() {
            return Err(E2eError::Navigation {
                url: target.to_string(),
                reason: format!("HTTP {}", navigation.status.unwrap_or_default()),
            });
        }

        self.reporter.report(Marker::Info, &format!("Loaded {}", target));
        Ok((
            StepOutcome::Completed,
            navigation.status.map(|s| format!("HTTP {}", s)),
        ))
    }

    async fn wait(
        &mut self,
        page: &dyn Page,
        strategy: &WaitStrategy,
    ) -> (StepOutcome, Option<String>) {
        let outcome = self.resolver.resolve(page, strategy).await;
        let (text, detail) = match &outcome {
            WaitOutcome::Satisfied => match strategy {
                WaitStrategy::ElementAppears { selector, .. } => {
                    (format!("{} appeared", selector), None)
                }
                _ => ("Network idle".to_string(), None),
            },
            WaitOutcome::Slept { phase, duration } => {
                let text = format!(
                    "Waited {} ms for {} (fixed delay)",
                    duration.as_millis(),
                    phase
                );
                (text.clone(), Some(text))
            }
            WaitOutcome::TimedOut(reason) => (
                format!("Wait timed out, continuing: {}", reason),
                Some(reason.clone()),
            ),
            WaitOutcome::NotFound(selector) => {
                let text = format!("{} did not appear", selector);
                (text.clone(), Some(text))
            }
        };

        if outcome.is_degraded() {
            self.reporter.report(Marker::Warn, &text);
            (StepOutcome::Degraded, detail)
        } else {
            self.reporter.report(Marker::Info, &text);
            (StepOutcome::Completed, detail)
        }
    }

    async fn interact(
        &mut self,
        page: &dyn Page,
        selector: &SelectorSpec,
        action: Interaction,
    ) -> (StepOutcome, Option<String>) {
        let present = match page.is_visible(selector).await {
            Ok(visible) => visible,
            Err(e) => {
                debug!("Lookup of {} failed: {}", selector, e);
                false
            }
        };
        if !present {
            let text = format!("Click on {} not performed: no visible match", selector);
            self.reporter.report(Marker::Warn, &text);
            return (StepOutcome::NotPerformed, Some(text));
        }

        let performed = match action {
            Interaction::Click => page.click(selector, self.config.timeouts.element()).await,
        };

        match performed {
            Ok(()) => {
                self.reporter.report(Marker::Ok, &format!("Clicked {}", selector));
                (StepOutcome::Performed, None)
            }
            Err(e) => {
                let text = format!("Click on {} not performed: {}", selector, e);
                self.reporter.report(Marker::Warn, &text);
                (StepOutcome::NotPerformed, Some(text))
            }
        }
    }

    fn summarize(&mut self, report: &RunReport) {
        let checks = format!(
            "{}/{} checks passed",
            report.passed_assertions(),
            report.assertions.len()
        );

        self.reporter.plain("");
        if report.success {
            info!("✓ {} ({} ms, {})", report.scenario, report.duration_ms, checks);
            self.reporter
                .report(Marker::Success, &format!("{} complete: {}", report.scenario, checks));
        } else {
            self.reporter.report(
                Marker::Failed,
                &format!(
                    "{}: {}",
                    report.scenario,
                    report.fatal_error.as_deref().unwrap_or("unknown error")
                ),
            );
        }

        if !report.artifacts.is_empty() {
            self.reporter.plain("Screenshots saved to:");
            for path in report.artifact_paths() {
                self.reporter.plain(&format!("  - {}", path.display()));
            }
        }
        self.reporter.plain("");
    }
}
