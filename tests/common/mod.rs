//! Shared fixtures for the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use livemath::config::{EngineConfig, MathConfig};
use livemath::editor::{EditorHost, EditorView};
use livemath::error::{RenderError, RenderResult};
use livemath::math::{Graphic, MathBackend, MathController, RenderQueue, Typesetter};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

/// One engine call: source, start and end time
pub type CallLog = Rc<RefCell<Vec<(String, Instant, Instant)>>>;

/// Engine double that takes `latency` per formula and rejects anything
/// containing `bad`
pub struct FakeEngine {
    pub latency: Duration,
    pub calls: CallLog,
}

#[async_trait(?Send)]
impl MathBackend for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn probe(&self) -> Result<(), String> {
        Ok(())
    }

    async fn typeset(&self, tex: &str, display: bool) -> RenderResult<Graphic> {
        let start = Instant::now();
        tokio::time::sleep(self.latency).await;
        self.calls
            .borrow_mut()
            .push((tex.to_string(), start, Instant::now()));

        if tex.contains("bad") {
            return Err(RenderError::Syntax(format!("Undefined control sequence in {}", tex)));
        }
        let mode = if display { "block" } else { "inline" };
        Ok(Graphic::new(format!("<svg data-mode=\"{}\">{}</svg>", mode, tex)))
    }
}

pub fn typesetter(latency_ms: u64) -> (Rc<Typesetter>, CallLog) {
    let calls = CallLog::default();
    let engine = FakeEngine {
        latency: Duration::from_millis(latency_ms),
        calls: calls.clone(),
    };
    (
        Rc::new(Typesetter::new(engine, EngineConfig::default())),
        calls,
    )
}

/// A view with a math controller attached
pub struct Harness {
    pub view: Rc<EditorView>,
    pub math: Rc<MathController>,
    pub calls: CallLog,
}

impl Harness {
    pub fn new(text: &str) -> Self {
        Self::with_config(text, MathConfig::default(), 5)
    }

    pub fn with_config(text: &str, config: MathConfig, latency_ms: u64) -> Self {
        let (typesetter, calls) = typesetter(latency_ms);
        Self::build(text, typesetter, RenderQueue::new(), config, calls)
    }

    pub fn build(
        text: &str,
        typesetter: Rc<Typesetter>,
        queue: RenderQueue,
        config: MathConfig,
        calls: CallLog,
    ) -> Self {
        let view = EditorView::new(text);
        let host: Rc<dyn EditorHost> = view.clone();
        let math = MathController::with_queue(Rc::downgrade(&host), typesetter, queue, config);
        view.attach(math.clone());
        Self { view, math, calls }
    }

    /// Wait out the debounce and every queued render
    pub async fn settle(&self) {
        while self.math.is_debouncing() || !self.math.queue().is_idle() {
            if self.math.is_debouncing() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            } else {
                self.math.queue().wait_idle().await;
            }
        }
    }

    pub fn engine_calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(tex, _, _)| tex.clone()).collect()
    }

    /// `(from, to, html)` for every widget currently shown
    pub fn widgets(&self) -> Vec<(usize, usize, String)> {
        self.view
            .annotations()
            .widgets()
            .map(|(a, w)| (a.from, a.to, w.to_html()))
            .collect()
    }
}
