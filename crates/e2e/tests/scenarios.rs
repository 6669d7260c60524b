mod common;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use adventure_e2e::report::{Marker, StepOutcome};
use adventure_e2e::scenarios::{flower_greeting, jigsaw_puzzle, quiz_game};
use adventure_e2e::spec::StepKind;
use adventure_e2e::{Scenario, SelectorSpec, Step, WaitStrategy};

use common::{birthday_site, config, runner, FakeEngine};

fn file_names(dir: &std::path::Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

fn names(expected: &[&str]) -> BTreeSet<String> {
    expected.iter().map(|s| s.to_string()).collect()
}

/// Flower Greeting
///
/// After the bloom and reveal delays the name, the greeting and both
/// navigation buttons are visible: four OK lines and four screenshots.
#[tokio::test(start_paused = true)]
async fn flower_greeting_reports_four_checks_and_four_screenshots() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = flower_greeting();

    let report = runner.run(&scenario).await;

    assert!(report.success, "{:?}", report.fatal_error);
    assert_eq!(report.steps.len(), scenario.steps.len());
    assert_eq!(report.passed_assertions(), 4);
    assert_eq!(runner.reporter().count(Marker::Ok), 4);
    assert_eq!(report.artifacts.len(), 4);
    assert_eq!(
        file_names(dir.path()),
        names(&[
            "flower-blooming.png",
            "flower-complete.png",
            "flower-loading.png",
            "flower-message.png",
        ])
    );
    assert!(runner
        .reporter()
        .transcript()
        .iter()
        .any(|l| l.starts_with("[SUCCESS] Flower Greeting complete: 4/4")));

    let log = engine.log.lock();
    assert_eq!(log.visits, ["/greeting-flower"]);
    assert_eq!((log.acquired, log.released), (1, 1));
}

/// Quiz Game
///
/// The counter starts at 1/7; answering "1 Desember" and clicking
/// "Next Question" moves it to 2/7.
#[tokio::test(start_paused = true)]
async fn quiz_counter_advances_after_answer() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));

    let report = runner.run(&quiz_game()).await;

    assert!(report.success);
    let passed = |label: &str| {
        report
            .assertions
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.passed)
            .unwrap()
    };
    assert!(passed("Question counter (1/7)"));
    assert!(passed("Answer option '30 November'"));
    assert!(passed("Answer option '2 Desember'"));
    assert!(passed("Next Question button"));
    assert!(passed("Question counter advanced (2/7)"));
    assert_eq!(report.passed_assertions(), report.assertions.len());

    assert_eq!(engine.log.lock().clicks, ["1 Desember", "Next Question"]);
    assert_eq!(
        file_names(dir.path()),
        names(&["quiz-answered.png", "quiz-initial.png", "quiz-question2.png"])
    );
}

/// Jigsaw Puzzle
///
/// The hint click is recorded as performed and followed by the hint-state
/// screenshot, without re-verifying the overlay itself.
#[tokio::test(start_paused = true)]
async fn jigsaw_hint_click_is_performed_then_captured() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));

    let report = runner.run(&jigsaw_puzzle()).await;

    assert!(report.success);
    let click = report
        .steps
        .iter()
        .position(|s| s.kind == StepKind::Interact)
        .unwrap();
    assert_eq!(report.steps[click].outcome, StepOutcome::Performed);
    let capture = report.steps[click..]
        .iter()
        .find(|s| s.kind == StepKind::Capture)
        .unwrap();
    assert_eq!(capture.outcome, StepOutcome::Completed);
    assert!(dir.path().join("jigsaw-with-hint.png").is_file());
    assert!(report
        .assertions
        .iter()
        .any(|a| a.label == "Progress indicator" && a.passed));
}

/// Absent optional elements degrade the report but never stop the run
#[tokio::test(start_paused = true)]
async fn absent_elements_are_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut site = birthday_site();
    site.remove("/greeting-flower", "Back to Adventure");
    site.remove("/greeting-flower", "Watch Again");
    let engine = Arc::new(FakeEngine::new(site));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = flower_greeting();

    let report = runner.run(&scenario).await;

    assert!(report.success);
    assert_eq!(report.steps.len(), scenario.steps.len());
    assert_eq!(report.outcome_count(StepOutcome::Aborted), 0);
    assert_eq!(report.passed_assertions(), 2);
    let missing: Vec<_> = report.assertions.iter().filter(|a| !a.passed).collect();
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().all(|a| a.observed == Some(false)));
    assert_eq!(runner.reporter().count(Marker::Warn), 2);
    assert_eq!(report.artifacts.len(), 4);
}

/// A click target that is not on the page is recorded as not performed, never fatal
#[tokio::test(start_paused = true)]
async fn missing_click_targets_are_not_performed() {
    let dir = tempfile::tempdir().unwrap();
    let mut site = birthday_site();
    site.remove("/game/6", "1 Desember");
    let engine = Arc::new(FakeEngine::new(site));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = quiz_game();

    let report = runner.run(&scenario).await;

    assert!(report.success);
    assert_eq!(report.steps.len(), scenario.steps.len());
    assert_eq!(report.outcome_count(StepOutcome::NotPerformed), 2);
    let first_click = report
        .steps
        .iter()
        .find(|s| s.kind == StepKind::Interact)
        .unwrap();
    assert_eq!(first_click.outcome, StepOutcome::NotPerformed);
    assert!(first_click.detail.as_deref().unwrap().contains("not performed"));

    // Next Question never appeared, so the counter stays put
    assert!(engine.log.lock().clicks.is_empty());
    assert_eq!(report.outcome_count(StepOutcome::Degraded), 1);
    assert_eq!(report.artifacts.len(), 3);
}

/// Unreachable app: fatal, remaining steps aborted, session still released
#[tokio::test(start_paused = true)]
async fn unreachable_app_is_fatal_and_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut site = birthday_site();
    site.unreachable = true;
    let engine = Arc::new(FakeEngine::new(site));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = flower_greeting();

    let suite = runner.run_suite(&[scenario.clone()]).await;
    let report = &suite.results[0];

    assert!(!report.success);
    assert!(report.fatal_error.as_deref().unwrap().contains("ERR_CONNECTION_REFUSED"));
    assert_eq!(report.steps.len(), scenario.steps.len());
    assert_eq!(report.steps[0].outcome, StepOutcome::Fatal);
    assert_eq!(report.outcome_count(StepOutcome::Aborted), scenario.steps.len() - 1);
    assert!(report.artifacts.is_empty());
    assert_eq!(suite.exit_code(), 1);
    assert_eq!(runner.reporter().count(Marker::Fatal), 1);

    let log = engine.log.lock();
    assert_eq!((log.acquired, log.released), (1, 1));
}

/// A non-2xx entry page is a navigation failure
#[tokio::test(start_paused = true)]
async fn not_found_route_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = Scenario {
        name: "Lost Level".into(),
        description: String::new(),
        entry_url: "/game/42".into(),
        tags: vec![],
        artifact_prefix: None,
        steps: vec![
            Step::Navigate {
                url: "/game/42".into(),
            },
            Step::Wait {
                strategy: WaitStrategy::NetworkIdle,
            },
            Step::Capture {
                checkpoint: "initial".into(),
            },
        ],
    };

    let report = runner.run(&scenario).await;

    assert!(!report.success);
    assert!(report.fatal_error.as_deref().unwrap().contains("HTTP 404"));
    assert_eq!(engine.log.lock().released, 1);
}

/// Browser that cannot launch: fatal before any step runs
#[tokio::test(start_paused = true)]
async fn launch_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut site = birthday_site();
    site.launch_fails = true;
    let engine = Arc::new(FakeEngine::new(site));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = jigsaw_puzzle();

    let report = runner.run(&scenario).await;

    assert!(!report.success);
    assert!(report.fatal_error.as_deref().unwrap().contains("libnss3"));
    assert_eq!(report.outcome_count(StepOutcome::Aborted), scenario.steps.len());
    assert_eq!(engine.log.lock().acquired, 0);
}

/// Artifacts are the evidence: failing to write one ends the scenario
#[tokio::test(start_paused = true)]
async fn unwritable_artifact_dir_is_fatal() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(&file.path().join("shots")));
    let scenario = flower_greeting();

    let report = runner.run(&scenario).await;

    assert!(!report.success);
    let fatal = report
        .steps
        .iter()
        .find(|s| s.outcome == StepOutcome::Fatal)
        .unwrap();
    assert_eq!(fatal.kind, StepKind::Capture);
    assert_eq!(report.steps.len(), scenario.steps.len());
    assert_eq!(engine.log.lock().released, 1);
}

/// Re-running a scenario overwrites its screenshots instead of adding new ones
#[tokio::test(start_paused = true)]
async fn rerun_overwrites_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));

    let first = runner.run(&quiz_game()).await;
    let names_after_first = file_names(dir.path());
    let second = runner.run(&quiz_game()).await;

    let paths = |r: &adventure_e2e::RunReport| -> Vec<PathBuf> {
        r.artifacts.iter().map(|a| a.path.clone()).collect()
    };
    assert_eq!(paths(&first), paths(&second));
    assert_eq!(file_names(dir.path()), names_after_first);
    assert_eq!(names_after_first.len(), 3);
    assert_eq!(first.artifacts[0].sha256, second.artifacts[0].sha256);
}

/// The run deadline bounds a scenario even when every step is individually bounded
#[tokio::test(start_paused = true)]
async fn run_deadline_is_fatal_and_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut cfg = config(dir.path());
    cfg.timeouts.run_ms = 2500;
    let mut runner = runner(&engine, cfg);
    let scenario = flower_greeting();

    let report = runner.run(&scenario).await;

    assert!(!report.success);
    assert!(report.fatal_error.as_deref().unwrap().contains("deadline"));
    // navigate, idle, settle and the loading capture finish; the bloom delay is cut off
    assert_eq!(report.steps[4].outcome, StepOutcome::Fatal);
    assert_eq!(report.steps[4].description, "wait:delay:bloom");
    assert_eq!(report.outcome_count(StepOutcome::Aborted), scenario.steps.len() - 5);
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(engine.log.lock().released, 1);
}

/// Invalid scenarios are rejected before a browser is launched
#[tokio::test(start_paused = true)]
async fn invalid_scenario_never_acquires_a_browser() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = Scenario {
        name: "Racy".into(),
        description: String::new(),
        entry_url: "/game/6".into(),
        tags: vec![],
        artifact_prefix: None,
        steps: vec![
            Step::Navigate {
                url: "/game/6".into(),
            },
            Step::AssertVisible {
                selector: SelectorSpec::text("1/7"),
                label: "counter".into(),
            },
        ],
    };

    let report = runner.run(&scenario).await;

    assert!(!report.success);
    assert_eq!(report.outcome_count(StepOutcome::Aborted), 2);
    assert_eq!(engine.log.lock().acquired, 0);
}

/// YAML scenarios run through the same sequencer
#[tokio::test(start_paused = true)]
async fn yaml_scenario_runs() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(birthday_site()));
    let mut runner = runner(&engine, config(dir.path()));
    let scenario = Scenario::from_yaml(
        r#"
name: Quiz Hint Free
entry_url: /game/6
artifact_prefix: trivia
steps:
  - action: navigate
    url: /game/6
  - action: wait
    strategy:
      kind: network_idle
  - action: interact
    selector:
      role: button
      name: 1 Desember
  - action: wait
    strategy:
      kind: element_appears
      selector:
        role: button
        name: Next Question
      timeout_ms: 1000
  - action: capture
    checkpoint: answered
"#,
    )
    .unwrap();

    let report = runner.run(&scenario).await;

    assert!(report.success);
    assert_eq!(report.steps[3].outcome, StepOutcome::Completed);
    assert!(dir.path().join("trivia-answered.png").is_file());
}
