//! Optional-element visibility checks
//!
//! An assertion never raises: a missing element or a failed query is an
//! [`AssertionResult`] with `passed == false`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::Page;
use crate::spec::SelectorSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub label: String,
    pub selector: SelectorSpec,
    pub passed: bool,
    /// Visibility reported by the browser; `None` when the query itself failed
    pub observed: Option<bool>,
}

/// Check whether the first element matching `selector` is visible
pub async fn assert_visible(
    page: &dyn Page,
    selector: &SelectorSpec,
    label: &str,
) -> AssertionResult {
    let observed = match page.is_visible(selector).await {
        Ok(visible) => Some(visible),
        Err(e) => {
            debug!("Visibility query for {} failed: {}", selector, e);
            None
        }
    };

    AssertionResult {
        label: label.to_string(),
        selector: selector.clone(),
        passed: observed == Some(true),
        observed,
    }
}
