//! In-memory stand-in for the browser and the birthday adventure site

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use adventure_e2e::browser::{BrowserEngine, BrowserSession, Navigation, Page};
use adventure_e2e::config::HarnessConfig;
use adventure_e2e::report::Reporter;
use adventure_e2e::{E2eError, E2eResult, ScenarioRunner, SelectorSpec};
use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct Element {
    pub role: Option<String>,
    pub text: String,
    pub visible: bool,
}

pub fn text(t: &str) -> Element {
    Element {
        role: None,
        text: t.to_string(),
        visible: true,
    }
}

pub fn button(t: &str) -> Element {
    Element {
        role: Some("button".to_string()),
        text: t.to_string(),
        visible: true,
    }
}

pub fn hidden(mut el: Element) -> Element {
    el.visible = false;
    el
}

#[derive(Debug, Clone)]
pub enum Effect {
    Show(String),
    Hide(String),
}

/// Routes, their elements, and what clicking an element changes
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub routes: HashMap<String, Vec<Element>>,
    pub on_click: HashMap<String, Vec<Effect>>,
    pub unreachable: bool,
    pub launch_fails: bool,
}

impl FakeSite {
    pub fn remove(&mut self, route: &str, element_text: &str) {
        if let Some(elements) = self.routes.get_mut(route) {
            elements.retain(|e| e.text != element_text);
        }
    }
}

/// The three pages the built-in scenarios visit
pub fn birthday_site() -> FakeSite {
    let mut routes = HashMap::new();
    routes.insert(
        "/greeting-flower".to_string(),
        vec![
            text("Mila"),
            text("Happy Birthday, Mila!"),
            button("Back to Adventure"),
            button("Watch Again"),
        ],
    );
    routes.insert(
        "/game/5".to_string(),
        vec![
            text("Jigsaw Puzzle"),
            text("Puzzle Board"),
            text("Puzzle Pieces"),
            text("0/9"),
            button("Show Hint"),
            hidden(text("Hint overlay")),
            button("Restart"),
            button("Back"),
            text("How to play"),
        ],
    );
    routes.insert(
        "/game/6".to_string(),
        vec![
            text("Birthday Trivia Challenge"),
            text("1/7"),
            hidden(text("2/7")),
            text("Tanggal berapa ulang tahun Mila?"),
            button("30 November"),
            button("1 Desember"),
            button("2 Desember"),
            hidden(button("Next Question")),
            button("Back"),
            button("Restart"),
        ],
    );

    let mut on_click = HashMap::new();
    on_click.insert("Show Hint".to_string(), vec![Effect::Show("Hint overlay".into())]);
    on_click.insert("1 Desember".to_string(), vec![Effect::Show("Next Question".into())]);
    on_click.insert(
        "Next Question".to_string(),
        vec![
            Effect::Hide("1/7".into()),
            Effect::Show("2/7".into()),
            Effect::Hide("Next Question".into()),
        ],
    );

    FakeSite {
        routes,
        on_click,
        unreachable: false,
        launch_fails: false,
    }
}

/// Everything the fake browser was asked to do
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub acquired: usize,
    pub released: usize,
    pub visits: Vec<String>,
    pub clicks: Vec<String>,
    pub screenshots: usize,
}

pub struct FakeEngine {
    site: FakeSite,
    pub log: Arc<Mutex<BrowserLog>>,
}

impl FakeEngine {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            log: Arc::new(Mutex::new(BrowserLog::default())),
        }
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn acquire(&self, _headless: bool) -> E2eResult<Box<dyn BrowserSession>> {
        if self.site.launch_fails {
            return Err(E2eError::Environment("chromium: missing libnss3.so".into()));
        }
        self.log.lock().acquired += 1;
        Ok(Box::new(FakeSession {
            site: self.site.clone(),
            log: Arc::clone(&self.log),
            released: false,
        }))
    }
}

struct FakeSession {
    site: FakeSite,
    log: Arc<Mutex<BrowserLog>>,
    released: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&mut self) -> E2eResult<Box<dyn Page>> {
        Ok(Box::new(FakePage {
            site: self.site.clone(),
            log: Arc::clone(&self.log),
            elements: Mutex::new(Vec::new()),
        }))
    }

    async fn release(&mut self) -> E2eResult<()> {
        if !self.released {
            self.released = true;
            self.log.lock().released += 1;
        }
        Ok(())
    }
}

struct FakePage {
    site: FakeSite,
    log: Arc<Mutex<BrowserLog>>,
    elements: Mutex<Vec<Element>>,
}

fn matches(selector: &SelectorSpec, el: &Element) -> bool {
    let contains = |haystack: &str, needle: &str| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };
    match selector {
        SelectorSpec::Text { text } => contains(&el.text, text),
        SelectorSpec::Role { role, name } => {
            el.role.as_deref() == Some(role.as_str()) && contains(&el.text, name)
        }
        SelectorSpec::Pattern { pattern } => regex::Regex::new(pattern)
            .map(|re| re.is_match(&el.text))
            .unwrap_or(false),
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> E2eResult<Navigation> {
        if self.site.unreachable {
            return Err(E2eError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            });
        }
        let path = url::Url::parse(url)?.path().to_string();
        self.log.lock().visits.push(path.clone());

        match self.site.routes.get(&path) {
            Some(elements) => {
                *self.elements.lock() = elements.clone();
                Ok(Navigation {
                    status: Some(200),
                    url: url.to_string(),
                })
            }
            None => {
                self.elements.lock().clear();
                Ok(Navigation {
                    status: Some(404),
                    url: url.to_string(),
                })
            }
        }
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> E2eResult<()> {
        Ok(())
    }

    async fn is_visible(&self, selector: &SelectorSpec) -> E2eResult<bool> {
        Ok(self
            .elements
            .lock()
            .iter()
            .find(|el| matches(selector, el))
            .map(|el| el.visible)
            .unwrap_or(false))
    }

    async fn click(&self, selector: &SelectorSpec, _timeout: Duration) -> E2eResult<()> {
        let clicked = self
            .elements
            .lock()
            .iter()
            .find(|el| matches(selector, el) && el.visible)
            .map(|el| el.text.clone())
            .ok_or_else(|| E2eError::Bridge(format!("no element for {}", selector)))?;

        self.log.lock().clicks.push(clicked.clone());

        if let Some(effects) = self.site.on_click.get(&clicked) {
            let mut elements = self.elements.lock();
            for effect in effects {
                let (target, visible) = match effect {
                    Effect::Show(t) => (t, true),
                    Effect::Hide(t) => (t, false),
                };
                for el in elements.iter_mut().filter(|el| &el.text == target) {
                    el.visible = visible;
                }
            }
        }
        Ok(())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        self.log.lock().screenshots += 1;
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        for el in self.elements.lock().iter().filter(|el| el.visible) {
            png.extend_from_slice(el.text.as_bytes());
        }
        Ok(png)
    }
}

pub fn config(artifact_dir: &Path) -> HarnessConfig {
    HarnessConfig {
        artifact_dir: artifact_dir.to_path_buf(),
        ..HarnessConfig::default()
    }
}

pub fn runner(engine: &Arc<FakeEngine>, config: HarnessConfig) -> ScenarioRunner {
    let engine: Arc<dyn BrowserEngine> = engine.clone();
    ScenarioRunner::new(engine, config, Reporter::buffered(Default::default())).unwrap()
}
