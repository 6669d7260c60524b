//! Browser automation capability surface
//!
//! The sequencer only ever talks to these traits. The production backend
//! drives Playwright through a Node.js bridge process; tests plug in an
//! in-memory page.
//!
//! ```text
//! ┌──────────────────┐  acquire(headless)  ┌────────────────────┐
//! │  BrowserEngine   │ ──────────────────► │  BrowserSession    │
//! └──────────────────┘                     │   new_page()       │
//!                                          │   release()        │
//!                                          └─────────┬──────────┘
//!                                                    │
//!                                          ┌─────────▼──────────┐
//!                                          │  Page              │
//!                                          │   goto / idle      │
//!                                          │   is_visible       │
//!                                          │   click            │
//!                                          │   screenshot       │
//!                                          └────────────────────┘
//! ```

mod playwright;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::E2eResult;
use crate::spec::SelectorSpec;

pub use playwright::{PlaywrightEngine, PlaywrightSettings};

/// Launches browser sessions
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Start a browser. Fails with [`crate::E2eError::Environment`] when the
    /// engine cannot be launched.
    async fn acquire(&self, headless: bool) -> E2eResult<Box<dyn BrowserSession>>;
}

/// One running browser instance
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> E2eResult<Box<dyn Page>>;

    /// Close the browser and reap its process. Safe to call more than once.
    async fn release(&mut self) -> E2eResult<()>;
}

/// Response to a top-level navigation
#[derive(Debug, Clone)]
pub struct Navigation {
    /// HTTP status of the main document, if the engine saw one
    pub status: Option<u16>,
    pub url: String,
}

impl Navigation {
    pub fn is_success(&self) -> bool {
        self.status.map(|s| (200..300).contains(&s)).unwrap_or(true)
    }
}

/// A single tab. Element lookups always resolve to the first match.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<Navigation>;

    /// Block until the page reports no in-flight requests for its quiescence window
    async fn wait_for_network_idle(&self, timeout: Duration) -> E2eResult<()>;

    /// Attached, not hidden by styling, and with a non-empty box, as the engine decides
    async fn is_visible(&self, selector: &SelectorSpec) -> E2eResult<bool>;

    async fn click(&self, selector: &SelectorSpec, timeout: Duration) -> E2eResult<()>;

    /// Full-page PNG bytes
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;
}
