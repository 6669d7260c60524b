//! Built-in scenarios for the birthday adventure site

use crate::config::{
    ANSWER_FEEDBACK, BLOOM, BUTTONS_REVEAL, HINT_OVERLAY, MESSAGE_REVEAL, PAGE_SETTLE,
    QUESTION_TRANSITION,
};
use crate::spec::{slugify, Interaction, Scenario, SelectorSpec, Step, WaitStrategy};

/// Name shown on the greeting and quizzed about in the trivia game
pub const DISPLAY_NAME: &str = "Mila";

pub const FLOWER_GREETING_ROUTE: &str = "/greeting-flower";
pub const JIGSAW_LEVEL: u32 = 5;
pub const QUIZ_LEVEL: u32 = 6;

pub fn game_route(level: u32) -> String {
    format!("/game/{}", level)
}

/// Small builder so scenario tables read top to bottom
struct Steps(Vec<Step>);

impl Steps {
    fn new() -> Self {
        Self(Vec::new())
    }

    /// Navigate, then let the network and the entry animation settle
    fn open(mut self, url: &str) -> Self {
        self.0.push(Step::Navigate {
            url: url.to_string(),
        });
        self.0.push(Step::Wait {
            strategy: WaitStrategy::NetworkIdle,
        });
        self.delay(PAGE_SETTLE)
    }

    fn delay(mut self, phase: &str) -> Self {
        self.0.push(Step::Wait {
            strategy: WaitStrategy::FixedDelay {
                phase: phase.to_string(),
                duration_ms: None,
            },
        });
        self
    }

    fn appears(mut self, selector: SelectorSpec) -> Self {
        self.0.push(Step::Wait {
            strategy: WaitStrategy::ElementAppears {
                selector,
                timeout_ms: None,
            },
        });
        self
    }

    fn visible(mut self, selector: SelectorSpec, label: &str) -> Self {
        self.0.push(Step::AssertVisible {
            selector,
            label: label.to_string(),
        });
        self
    }

    fn click(mut self, selector: SelectorSpec) -> Self {
        self.0.push(Step::Interact {
            selector,
            action: Interaction::Click,
        });
        self
    }

    fn capture(mut self, checkpoint: &str) -> Self {
        self.0.push(Step::Capture {
            checkpoint: checkpoint.to_string(),
        });
        self
    }
}

fn scenario(name: &str, prefix: &str, entry_url: String, tags: &[&str], steps: Steps) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: String::new(),
        entry_url,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        artifact_prefix: Some(prefix.to_string()),
        steps: steps.0,
    }
}

/// Flower bloom, message reveal, then the two way-out buttons
pub fn flower_greeting() -> Scenario {
    let steps = Steps::new()
        .open(FLOWER_GREETING_ROUTE)
        .capture("loading")
        .delay(BLOOM)
        .capture("blooming")
        .delay(MESSAGE_REVEAL)
        .capture("message")
        .visible(SelectorSpec::text(DISPLAY_NAME), &format!("Name '{}'", DISPLAY_NAME))
        .visible(SelectorSpec::text("Happy Birthday"), "'Happy Birthday' greeting")
        .delay(BUTTONS_REVEAL)
        .capture("complete")
        .visible(SelectorSpec::text("Back to Adventure"), "'Back to Adventure' button")
        .visible(SelectorSpec::text("Watch Again"), "'Watch Again' button");

    let mut s = scenario(
        "Flower Greeting",
        "flower",
        FLOWER_GREETING_ROUTE.to_string(),
        &["greeting", "smoke"],
        steps,
    );
    s.description = "Bloom and reveal animation of the flower greeting card".to_string();
    s
}

/// Board, tray, progress and controls of the jigsaw level, plus the hint overlay
pub fn jigsaw_puzzle() -> Scenario {
    let route = game_route(JIGSAW_LEVEL);
    let steps = Steps::new()
        .open(&route)
        .capture("initial")
        .visible(SelectorSpec::text("Jigsaw Puzzle"), "Game title 'Jigsaw Puzzle'")
        .visible(SelectorSpec::text("Puzzle Board"), "Puzzle board")
        .visible(SelectorSpec::text("Puzzle Pieces"), "Puzzle pieces tray")
        .visible(SelectorSpec::pattern(r"\d+/\d+"), "Progress indicator")
        .visible(SelectorSpec::button("Show Hint"), "Show Hint button")
        .click(SelectorSpec::button("Show Hint"))
        .delay(HINT_OVERLAY)
        .capture("with-hint")
        .visible(SelectorSpec::button("Restart"), "Restart button")
        .visible(SelectorSpec::button("Back"), "Back button")
        .visible(SelectorSpec::text("How to play"), "Instructions");

    let mut s = scenario("Jigsaw Puzzle", "jigsaw", route, &["games"], steps);
    s.description = format!("Jigsaw puzzle game (level {})", JIGSAW_LEVEL);
    s
}

/// Answer the first trivia question and move on to the second
pub fn quiz_game() -> Scenario {
    let route = game_route(QUIZ_LEVEL);
    let steps = Steps::new()
        .open(&route)
        .capture("initial")
        .visible(SelectorSpec::text("Birthday Trivia Challenge"), "Game title")
        .visible(SelectorSpec::text("1/7"), "Question counter (1/7)")
        .visible(
            SelectorSpec::text(format!("Tanggal berapa ulang tahun {}", DISPLAY_NAME)),
            "First question",
        )
        .visible(SelectorSpec::button("30 November"), "Answer option '30 November'")
        .visible(SelectorSpec::button("1 Desember"), "Answer option '1 Desember'")
        .visible(SelectorSpec::button("2 Desember"), "Answer option '2 Desember'")
        .click(SelectorSpec::button("1 Desember"))
        .delay(ANSWER_FEEDBACK)
        .capture("answered")
        .appears(SelectorSpec::button("Next Question"))
        .visible(SelectorSpec::button("Next Question"), "Next Question button")
        .click(SelectorSpec::button("Next Question"))
        .delay(QUESTION_TRANSITION)
        .capture("question2")
        .visible(SelectorSpec::text("2/7"), "Question counter advanced (2/7)")
        .visible(SelectorSpec::button("Back"), "Back button")
        .visible(SelectorSpec::button("Restart"), "Restart button");

    let mut s = scenario("Quiz Game", "quiz", route, &["games"], steps);
    s.description = format!("Birthday trivia game (level {})", QUIZ_LEVEL);
    s
}

pub fn builtin() -> Vec<Scenario> {
    vec![flower_greeting(), jigsaw_puzzle(), quiz_game()]
}

/// Match a scenario by name, slug or artifact prefix, ignoring case
pub fn matches(scenario: &Scenario, query: &str) -> bool {
    let query = slugify(query);
    !query.is_empty() && (scenario.slug() == query || scenario.artifact_prefix() == query)
}
