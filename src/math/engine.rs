//! Typesetting engine
//!
//! [`Typesetter`] wraps a [`MathBackend`] behind a one-shot readiness gate:
//! the first caller runs a bounded probe loop with exponential backoff, and
//! every later caller observes the same outcome, including a terminal
//! failure.
//!
//! A render that times out is abandoned, not stopped. The built-in backend
//! runs on the blocking pool and holds a single worker permit until the
//! formula finishes, so the next render waits for it instead of overlapping.

use crate::config::EngineConfig;
use crate::error::{EngineError, RenderError, RenderResult};
use crate::math::Graphic;
use async_trait::async_trait;
use pulldown_latex::{
    config::DisplayMode, config::RenderConfig, mathml::push_mathml, Parser, Storage,
};
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};

/// Something that turns LaTeX into markup
#[async_trait(?Send)]
pub trait MathBackend {
    /// Short name for log messages
    fn name(&self) -> &str;

    /// Check whether the backend can accept work yet
    async fn probe(&self) -> Result<(), String>;

    /// Typeset one formula
    async fn typeset(&self, tex: &str, display: bool) -> RenderResult<Graphic>;
}

/// Where the readiness gate stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    /// Nobody has asked yet, or the probe is still running
    Pending,
    Ready,
    /// The probe gave up; every render fails with this error
    Failed(EngineError),
}

/// Backend plus readiness gate and per-formula timeout
pub struct Typesetter {
    backend: Box<dyn MathBackend>,
    config: EngineConfig,
    ready: OnceCell<Result<(), EngineError>>,
}

impl Typesetter {
    pub fn new(backend: impl MathBackend + 'static, config: EngineConfig) -> Self {
        Self {
            backend: Box::new(backend),
            config,
            ready: OnceCell::new(),
        }
    }

    /// Typesetter backed by the built-in MathML renderer
    pub fn mathml(config: EngineConfig) -> Self {
        Self::new(PulldownLatexBackend::new(), config)
    }

    /// Current gate state, without waiting
    pub fn readiness(&self) -> ReadinessState {
        match self.ready.get() {
            None => ReadinessState::Pending,
            Some(Ok(())) => ReadinessState::Ready,
            Some(Err(err)) => ReadinessState::Failed(err.clone()),
        }
    }

    /// Wait for the backend; probes at most once per typesetter
    pub async fn ensure_ready(&self) -> Result<(), EngineError> {
        self.ready
            .get_or_init(|| self.probe_until_ready())
            .await
            .clone()
    }

    async fn probe_until_ready(&self) -> Result<(), EngineError> {
        let attempts = self.config.ready_attempts.max(1);
        let mut reason = String::new();

        for attempt in 0..attempts {
            match self.backend.probe().await {
                Ok(()) => {
                    log::info!("Math engine {} ready", self.backend.name());
                    return Ok(());
                }
                Err(err) => {
                    log::warn!(
                        "Math engine {} not ready (attempt {}/{}): {}",
                        self.backend.name(),
                        attempt + 1,
                        attempts,
                        err
                    );
                    reason = err;
                }
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(self.config.backoff(attempt)).await;
            }
        }

        log::error!("Math engine {} gave up: {}", self.backend.name(), reason);
        Err(EngineError::NeverReady { attempts, reason })
    }

    /// Typeset `tex`, waiting for readiness first
    pub async fn render_latex(&self, tex: &str, display: bool) -> RenderResult<Graphic> {
        self.ensure_ready().await?;

        let timeout = self.config.render_timeout();
        let graphic = tokio::time::timeout(timeout, self.backend.typeset(tex, display))
            .await
            .map_err(|_| RenderError::Timeout(self.config.render_timeout_ms))??;

        if graphic.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        Ok(graphic)
    }
}

/// LaTeX to MathML with pulldown-latex
#[derive(Debug, Clone)]
pub struct PulldownLatexBackend {
    /// One permit; held by the blocking worker for as long as it runs
    worker: Arc<Semaphore>,
}

impl Default for PulldownLatexBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PulldownLatexBackend {
    pub fn new() -> Self {
        Self {
            worker: Arc::new(Semaphore::new(1)),
        }
    }

    /// Render synchronously; parse errors become [`RenderError::Syntax`]
    pub fn typeset_sync(tex: &str, display: bool) -> RenderResult<Graphic> {
        let storage = Storage::new();
        let parser = Parser::new(tex, &storage);
        let config = RenderConfig {
            display_mode: if display {
                DisplayMode::Block
            } else {
                DisplayMode::Inline
            },
            ..Default::default()
        };

        let events: Vec<_> = parser.collect();
        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
            .collect();
        if !errors.is_empty() {
            return Err(RenderError::Syntax(errors.join("; ")));
        }

        let mut mathml = String::new();
        push_mathml(&mut mathml, events.into_iter(), config)
            .map_err(|e| RenderError::Syntax(e.to_string()))?;
        Ok(Graphic::new(mathml))
    }
}

#[async_trait(?Send)]
impl MathBackend for PulldownLatexBackend {
    fn name(&self) -> &str {
        "pulldown-latex"
    }

    async fn probe(&self) -> Result<(), String> {
        Self::typeset_sync("x", false)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn typeset(&self, tex: &str, display: bool) -> RenderResult<Graphic> {
        let permit = Arc::clone(&self.worker)
            .acquire_owned()
            .await
            .map_err(|e| RenderError::Internal(e.to_string()))?;
        let tex = tex.to_string();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            Self::typeset_sync(&tex, display)
        })
        .await
        .map_err(|e| RenderError::Internal(e.to_string()))?
    }
}
