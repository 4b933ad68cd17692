//! Math decoration controller
//!
//! One controller per view. It decides, on every transaction, whether each
//! visible math region shows as source or as typeset output, and feeds cache
//! misses to the render queue.
//!
//! - Document edits rebuild after a debounce delay; only the latest timer
//!   survives.
//! - Selection, viewport and refresh transactions rebuild immediately.
//! - A finished render updates the cache or the error map, then asks the host
//!   for a refresh; its result only shows through that next rebuild.

use crate::config::MathConfig;
use crate::editor::annotation::{
    Annotation, AnnotationSet, ErrorWidget, MathWidget, Widget, MATH_DELIMITER_CLASS,
    MATH_SOURCE_CLASS,
};
use crate::editor::host::{EditorHost, ViewPlugin, ViewUpdate};
use crate::editor::selection::cursor_in_range;
use crate::error::{RenderError, RenderResult};
use crate::math::cache::RenderCache;
use crate::math::detect::detect_math_regions;
use crate::math::engine::Typesetter;
use crate::math::queue::RenderQueue;
use crate::math::{CacheKey, Graphic, MathRegion};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::ops::Range;
use std::rc::{Rc, Weak};
use tokio::task::JoinHandle;

/// Last failure message per key, bounded, oldest-inserted evicted first
#[derive(Debug, Default)]
struct ErrorMap {
    entries: IndexMap<CacheKey, String>,
}

impl ErrorMap {
    fn get(&self, key: &CacheKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn insert(&mut self, key: CacheKey, message: String, max_entries: usize) {
        self.entries.insert(key, message);
        let excess = self.entries.len().saturating_sub(max_entries);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        self.entries.shift_remove(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// State shared between rebuilds and finished render jobs
#[derive(Debug, Default)]
struct RenderState {
    cache: RenderCache,
    errors: ErrorMap,
    /// Visible regions with neither output nor error, first occurrence per key
    pending: IndexMap<CacheKey, MathRegion>,
    /// Keys submitted to the queue and not finished yet
    in_flight: HashSet<CacheKey>,
}

/// Takes a key back out of the in-flight set when its job is dropped without
/// reporting a result, so a later rebuild submits it again
struct InFlightGuard {
    controller: Weak<MathController>,
    key: CacheKey,
    settled: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(controller) = self.controller.upgrade() {
            if let Ok(mut state) = controller.state.try_borrow_mut() {
                state.in_flight.remove(&self.key);
            }
        }
    }
}

pub struct MathController {
    host: Weak<dyn EditorHost>,
    typesetter: Rc<Typesetter>,
    queue: RenderQueue,
    config: MathConfig,
    state: RefCell<RenderState>,
    annotations: RefCell<AnnotationSet>,
    debounce: RefCell<Option<JoinHandle<()>>>,
    rebuilds: Cell<u64>,
    /// Set once the "cache smaller than viewport" warning was logged
    warned_small_cache: Cell<bool>,
    this: Weak<MathController>,
}

impl MathController {
    /// Controller with its own render queue
    pub fn new(
        host: Weak<dyn EditorHost>,
        typesetter: Rc<Typesetter>,
        config: MathConfig,
    ) -> Rc<Self> {
        Self::with_queue(host, typesetter, RenderQueue::new(), config)
    }

    /// Controller submitting to a shared queue, so several views never
    /// typeset concurrently
    pub fn with_queue(
        host: Weak<dyn EditorHost>,
        typesetter: Rc<Typesetter>,
        queue: RenderQueue,
        config: MathConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            host,
            typesetter,
            queue,
            config,
            state: RefCell::new(RenderState::default()),
            annotations: RefCell::new(AnnotationSet::none()),
            debounce: RefCell::new(None),
            rebuilds: Cell::new(0),
            warned_small_cache: Cell::new(false),
            this: this.clone(),
        })
    }

    /// The queue render jobs go to
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Number of rebuilds performed so far
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.get()
    }

    /// Whether a debounced rebuild is waiting to fire
    pub fn is_debouncing(&self) -> bool {
        self.debounce.borrow().is_some()
    }

    /// Regions found without output or error in the last rebuild
    pub fn pending_regions(&self) -> Vec<MathRegion> {
        self.state.borrow().pending.values().cloned().collect()
    }

    pub fn cached(&self, key: &CacheKey) -> Option<Graphic> {
        self.state.borrow().cache.get(key)
    }

    pub fn cache_len(&self) -> usize {
        self.state.borrow().cache.len()
    }

    pub fn error_for(&self, key: &CacheKey) -> Option<String> {
        self.state.borrow().errors.get(key).map(str::to_string)
    }

    pub fn error_count(&self) -> usize {
        self.state.borrow().errors.len()
    }

    /// Restart the debounce timer; the rebuild runs once edits go quiet
    pub fn schedule_rebuild(&self) {
        self.cancel_debounce();

        let this = self.this.clone();
        let delay = self.config.debounce();
        let timer = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(controller) = this.upgrade() {
                controller.debounce.borrow_mut().take();
                controller.rebuild();
            }
        });
        *self.debounce.borrow_mut() = Some(timer);
    }

    fn cancel_debounce(&self) {
        if let Some(timer) = self.debounce.borrow_mut().take() {
            timer.abort();
        }
    }

    /// Padded scan windows for the visible ranges, merged where they overlap
    fn scan_windows(&self, visible: &[Range<usize>], len: usize) -> Vec<Range<usize>> {
        let pad = self.config.viewport_buffer;
        let mut windows: Vec<Range<usize>> = visible
            .iter()
            .map(|r| r.start.saturating_sub(pad)..r.end.saturating_add(pad).min(len))
            .collect();
        windows.sort_by_key(|w| w.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(windows.len());
        for window in windows {
            match merged.last_mut() {
                Some(last) if window.start <= last.end => last.end = last.end.max(window.end),
                _ => merged.push(window),
            }
        }
        merged
    }

    /// Recompute the annotation set and submit cache misses for rendering
    pub fn rebuild(&self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        self.rebuilds.set(self.rebuilds.get() + 1);

        let selection = host.selection();
        let windows = self.scan_windows(&host.visible_ranges(), host.len_chars());
        let mut annotations = Vec::new();
        let mut shown: HashSet<CacheKey> = HashSet::new();

        let snapshot = {
            let mut state = self.state.borrow_mut();
            state.pending.clear();

            for window in windows {
                for region in detect_math_regions(host.as_ref(), window.start, window.end) {
                    let delim = region.delimiter_len();

                    if cursor_in_range(&selection, region.from, region.to) {
                        annotations.push(Annotation::mark(
                            region.from,
                            region.from + delim,
                            MATH_DELIMITER_CLASS,
                        ));
                        annotations.push(Annotation::mark(
                            region.to - delim,
                            region.to,
                            MATH_DELIMITER_CLASS,
                        ));
                        if !region.display {
                            annotations.push(Annotation::mark(
                                region.from + 1,
                                region.to - 1,
                                MATH_SOURCE_CLASS,
                            ));
                        }
                        continue;
                    }

                    let key = region.cache_key();

                    if let Some(message) = state.errors.get(&key) {
                        let widget = ErrorWidget::new(region.tex.clone(), message, region.display);
                        annotations.push(Annotation::replace(
                            region.from,
                            region.to,
                            Widget::Error(widget),
                        ));
                        continue;
                    }

                    shown.insert(key.clone());
                    match state.cache.get(&key) {
                        Some(graphic) => annotations.push(Annotation::replace(
                            region.from,
                            region.to,
                            Widget::Math(MathWidget::new(graphic, region.display)),
                        )),
                        None => {
                            state.pending.entry(key).or_insert(region);
                        }
                    }
                }
            }

            let snapshot: Vec<(CacheKey, MathRegion)> = state
                .pending
                .iter()
                .filter(|(key, _)| !state.in_flight.contains(*key))
                .map(|(key, region)| (key.clone(), region.clone()))
                .collect();
            for (key, _) in &snapshot {
                state.in_flight.insert(key.clone());
            }
            snapshot
        };

        if shown.len() > self.config.max_cache_size && !self.warned_small_cache.get() {
            self.warned_small_cache.set(true);
            log::warn!(
                "{} distinct formulas in view but math.max_cache_size is {}; renders will keep evicting each other",
                shown.len(),
                self.config.max_cache_size
            );
        }

        let annotations = AnnotationSet::from_unsorted(annotations);
        log::debug!(
            "Math rebuild #{}: {} annotations, {} new render jobs",
            self.rebuilds.get(),
            annotations.len(),
            snapshot.len()
        );
        *self.annotations.borrow_mut() = annotations;

        for (key, region) in snapshot {
            self.submit(key, region);
        }
    }

    fn submit(&self, key: CacheKey, region: MathRegion) {
        let typesetter = Rc::clone(&self.typesetter);
        let this = self.this.clone();
        let mut guard = InFlightGuard {
            controller: this.clone(),
            key: key.clone(),
            settled: false,
        };

        self.queue.enqueue(async move {
            // A panicking backend takes down only this inner task
            let render = tokio::task::spawn_local(async move {
                typesetter.render_latex(&region.tex, region.display).await
            });
            let result = match render.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    log::error!("Typesetting {} panicked", key);
                    Err(RenderError::Internal("typesetting engine panicked".to_string()))
                }
                Err(err) => Err(RenderError::Internal(err.to_string())),
            };

            guard.settled = true;
            match this.upgrade() {
                Some(controller) => controller.finish_render(key, result),
                None => log::debug!("Discarding render of {}: controller closed", key),
            }
            Ok(())
        });
    }

    fn finish_render(&self, key: CacheKey, result: RenderResult<Graphic>) {
        {
            let mut state = self.state.borrow_mut();
            state.in_flight.remove(&key);
            match result {
                Ok(graphic) => {
                    state.cache.put(key.clone(), &graphic);
                    state.cache.evict_oldest(self.config.max_cache_size);
                    state.errors.remove(&key);
                }
                Err(err) => {
                    log::debug!("Typesetting {} failed: {}", key, err);
                    state
                        .errors
                        .insert(key, err.to_string(), self.config.max_error_entries);
                }
            }
        }

        if let Some(host) = self.host.upgrade() {
            host.request_refresh();
        }
    }
}

impl ViewPlugin for MathController {
    fn update(&self, update: &ViewUpdate) {
        if update.doc_changed {
            self.schedule_rebuild();
        } else {
            self.rebuild();
        }
    }

    fn annotations(&self) -> AnnotationSet {
        self.annotations.borrow().clone()
    }
}

impl Drop for MathController {
    fn drop(&mut self) {
        self.cancel_debounce();
    }
}
