//! Birthday Adventure E2E Scenario Harness
//!
//! This crate drives a headless browser against the birthday adventure site
//! and checks each page the way a person clicking through it would:
//! - Acquires one browser session per scenario and always releases it
//! - Synchronizes with network settling, element appearance and named
//!   animation delays
//! - Records optional visibility checks without aborting the run
//! - Saves full-page screenshots at named checkpoints
//! - Streams a line-oriented transcript and builds a JSON run report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ScenarioRunner (sequencer)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SessionManager ── acquire() -> ScopedSession { page }      │
//! │  WaitResolver   ── network idle | fixed delay | appears     │
//! │  assert_visible ── AssertionResult (never raises)           │
//! │  CaptureSink    ── <prefix>-<checkpoint>.png                │
//! │  Reporter       ── [OK] / [INFO] / [WARN] / [SUCCESS] ...   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (built-in or YAML)                                │
//! │    ├── name, entry_url, artifact_prefix                     │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate { url }                               │
//! │          ├── wait { strategy }                              │
//! │          ├── assert_visible { selector, label }             │
//! │          ├── interact { selector, action }                  │
//! │          └── capture { checkpoint }                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertion;
pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod preflight;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod session;
pub mod spec;
pub mod wait;

pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use report::{RunReport, SuiteReport};
pub use runner::ScenarioRunner;
pub use spec::{Scenario, SelectorSpec, Step, WaitStrategy};
