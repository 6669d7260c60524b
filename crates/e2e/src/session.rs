//! Browser session management - one browser and one page per scenario run

use std::sync::Arc;

use tracing::{debug, warn};

use crate::browser::{BrowserEngine, BrowserSession, Page};
use crate::error::{E2eError, E2eResult};

/// Hands out scoped sessions from a browser engine
pub struct SessionManager {
    engine: Arc<dyn BrowserEngine>,
    headless: bool,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn BrowserEngine>, headless: bool) -> Self {
        Self { engine, headless }
    }

    /// Launch a browser and open its single page
    pub async fn acquire(&self) -> E2eResult<ScopedSession> {
        let mut session = self
            .engine
            .acquire(self.headless)
            .await
            .map_err(as_environment)?;

        let page = match session.new_page().await {
            Ok(page) => page,
            Err(e) => {
                if let Err(release_err) = session.release().await {
                    warn!("Release after failed page open also failed: {}", release_err);
                }
                return Err(as_environment(e));
            }
        };

        debug!("Browser session acquired (headless: {})", self.headless);
        Ok(ScopedSession {
            session,
            page,
            released: false,
        })
    }
}

/// Acquisition failures always end the run as environment problems
fn as_environment(e: E2eError) -> E2eError {
    if e.is_fatal() {
        e
    } else {
        E2eError::Environment(e.to_string())
    }
}

/// A live browser plus its page, exclusively owned by one scenario run.
///
/// Call [`ScopedSession::release`] on every exit path. Dropping an unreleased
/// session leaves reaping the browser process to the backend.
pub struct ScopedSession {
    session: Box<dyn BrowserSession>,
    page: Box<dyn Page>,
    released: bool,
}

impl ScopedSession {
    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub async fn release(mut self) -> E2eResult<()> {
        self.released = true;
        self.session.release().await
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if !self.released {
            warn!("Scoped browser session dropped without release");
        }
    }
}
