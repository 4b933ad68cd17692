//! End-to-end tests of the math pipeline on an in-memory view

mod common;

use common::{typesetter, Harness};
use livemath::config::MathConfig;
use livemath::editor::annotation::{MATH_DELIMITER_CLASS, MATH_SOURCE_CLASS};
use livemath::editor::{EditorHost, HeadingsPlugin, Transaction, Treatment};
use livemath::math::{detect_math_regions, CacheKey, MathRegion, RenderQueue};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

fn marks(h: &Harness) -> Vec<(usize, usize, &'static str)> {
    h.view
        .annotations()
        .iter()
        .filter_map(|a| match a.treatment {
            Treatment::Mark(class) => Some((a.from, a.to, class)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_double_dollar_is_one_display_region() {
    let view = livemath::editor::EditorView::new("$$a$$");
    assert_eq!(
        detect_math_regions(view.as_ref(), 0, view.len_chars()),
        vec![MathRegion {
            from: 0,
            to: 5,
            tex: "a".to_string(),
            display: true,
        }]
    );
}

#[test]
fn test_escaped_delimiter_is_not_math() {
    let view = livemath::editor::EditorView::new(r"\$x$ and $y$");
    let regions = detect_math_regions(view.as_ref(), 0, view.len_chars());
    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].from, regions[0].to), (9, 12));
    assert_eq!(regions[0].tex, "y");
}

#[tokio::test(start_paused = true)]
async fn test_code_is_never_typeset() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("`$a$` and $b$\n\n```\n$c$\n```\n");
            h.settle().await;

            assert_eq!(h.engine_calls(), vec!["b"]);
            assert_eq!(h.widgets().len(), 1);
            assert_eq!((h.widgets()[0].0, h.widgets()[0].1), (10, 13));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_formula_typeset_once() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("x $a+b$ then $a+b$");
            h.settle().await;

            assert_eq!(h.engine_calls(), vec!["a+b"]);
            let widgets = h.widgets();
            assert_eq!(widgets.len(), 2);
            assert_eq!((widgets[0].0, widgets[0].1), (2, 7));
            assert_eq!((widgets[1].0, widgets[1].1), (13, 18));
            assert_eq!(widgets[0].2, widgets[1].2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_rebuild_is_idempotent() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("x $a$ and $$b$$ and $\\bad$");
            h.settle().await;
            let before = h.view.annotations();
            let calls = h.engine_calls().len();

            h.math.rebuild();
            h.math.rebuild();
            h.settle().await;

            assert_eq!(h.view.annotations(), before);
            assert_eq!(h.engine_calls().len(), calls);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_cache_evicts_earliest_insertion() {
    LocalSet::new()
        .run_until(async {
            let config = MathConfig {
                max_cache_size: 2,
                viewport_buffer: 0,
                ..MathConfig::default()
            };
            let h = Harness::with_config("x $a$ $b$ $c$ y", config, 5);

            for visible in [2..5, 6..9, 10..13] {
                h.view.dispatch(Transaction::new().scroll(vec![visible]));
                h.settle().await;
            }

            assert_eq!(h.math.cache_len(), 2);
            assert!(h.math.cached(&CacheKey::new("a", false)).is_none());
            assert!(h.math.cached(&CacheKey::new("b", false)).is_some());
            assert!(h.math.cached(&CacheKey::new("c", false)).is_some());

            h.view.dispatch(Transaction::new().scroll(vec![2..5]));
            h.settle().await;
            assert_eq!(h.engine_calls(), vec!["a", "b", "c", "a"]);
            assert_eq!(h.widgets().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_cache_smaller_than_view_rerenders_until_scrolled() {
    LocalSet::new()
        .run_until(async {
            let config = MathConfig {
                max_cache_size: 1,
                viewport_buffer: 0,
                ..MathConfig::default()
            };
            let h = Harness::with_config("x $a$ $b$", config, 10);

            // Each render evicts the other visible formula, which is queued again
            tokio::time::sleep(Duration::from_secs(1)).await;
            let calls = h.engine_calls();
            assert!(calls.len() > 4);
            assert_eq!(&calls[..4], &["a", "b", "a", "b"]);
            assert!(!h.math.queue().is_idle());
            assert_eq!(h.math.cache_len(), 1);

            // Once only one formula is in view the pipeline settles
            h.view.dispatch(Transaction::new().scroll(vec![2..5]));
            h.settle().await;
            assert_eq!(h.widgets().len(), 1);
            assert_eq!((h.widgets()[0].0, h.widgets()[0].1), (2, 5));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_engine_calls_never_overlap() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::with_config("x $a$ $b$ $$c$$ $d$", MathConfig::default(), 30);
            h.settle().await;

            assert_eq!(h.engine_calls(), vec!["a", "b", "c", "d"]);
            let calls = h.calls.borrow();
            for pair in calls.windows(2) {
                assert!(pair[0].2 <= pair[1].1, "engine calls overlapped");
            }
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_shared_queue_serializes_across_views() {
    LocalSet::new()
        .run_until(async {
            let (typesetter, calls) = typesetter(20);
            let queue = RenderQueue::new();
            let first = Harness::build(
                "x $a$ $b$",
                typesetter.clone(),
                queue.clone(),
                MathConfig::default(),
                calls.clone(),
            );
            let second = Harness::build(
                "y $c$ $d$",
                typesetter,
                queue,
                MathConfig::default(),
                calls.clone(),
            );
            first.settle().await;
            second.settle().await;

            let mut spans: Vec<_> = calls.borrow().iter().map(|(_, s, e)| (*s, *e)).collect();
            assert_eq!(spans.len(), 4);
            spans.sort();
            for pair in spans.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "engine calls overlapped");
            }
            assert_eq!(first.widgets().len(), 2);
            assert_eq!(second.widgets().len(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_cursor_shows_inline_source() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("x $a+b$ y");
            h.view.dispatch(Transaction::new().cursor(4));
            h.settle().await;

            assert!(h.engine_calls().is_empty());
            assert!(h.widgets().is_empty());
            assert_eq!(
                marks(&h),
                vec![
                    (2, 3, MATH_DELIMITER_CLASS),
                    (3, 6, MATH_SOURCE_CLASS),
                    (6, 7, MATH_DELIMITER_CLASS),
                ]
            );

            h.view.dispatch(Transaction::new().cursor(0));
            h.settle().await;
            assert!(marks(&h).is_empty());
            let widgets = h.widgets();
            assert_eq!(widgets.len(), 1);
            assert_eq!((widgets[0].0, widgets[0].1), (2, 7));
            assert!(widgets[0].2.contains("a+b"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_cursor_shows_display_delimiters_only() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("x $$a$$ y");
            h.settle().await;
            assert_eq!(h.widgets().len(), 1);

            // Right after the closing delimiter still counts as inside
            h.view.dispatch(Transaction::new().cursor(7));
            assert!(h.widgets().is_empty());
            assert_eq!(
                marks(&h),
                vec![(2, 4, MATH_DELIMITER_CLASS), (5, 7, MATH_DELIMITER_CLASS)]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_error_then_recovery() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(r"x $\bad$ y");
            h.settle().await;

            let key = CacheKey::new(r"\bad", false);
            let message = h.math.error_for(&key).unwrap();
            assert!(message.contains("Undefined control sequence"));
            let widgets = h.widgets();
            assert_eq!((widgets[0].0, widgets[0].1), (2, 8));
            assert!(widgets[0].2.contains("cm-math-error"));
            assert!(widgets[0].2.contains("title=\"Undefined control sequence"));

            // Known failures are not retried
            h.math.rebuild();
            h.settle().await;
            assert_eq!(h.engine_calls().len(), 1);

            h.view.dispatch(Transaction::new().replace(3, 7, "ok"));
            assert_eq!(h.view.text(), "x $ok$ y");
            h.settle().await;

            let widgets = h.widgets();
            assert_eq!(widgets.len(), 1);
            assert_eq!((widgets[0].0, widgets[0].1), (2, 6));
            assert!(!widgets[0].2.contains("cm-math-error"));
            assert!(widgets[0].2.contains("<svg"));
            assert_eq!(h.engine_calls(), vec![r"\bad", "ok"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_typing_burst_rebuilds_once() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("x $a$");
            h.settle().await;
            let before = h.math.rebuild_count();

            for _ in 0..5 {
                let end = h.view.len_chars();
                h.view.dispatch(Transaction::new().insert(end, "y"));
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            assert_eq!(h.math.rebuild_count(), before);

            tokio::time::sleep(Duration::from_millis(250)).await;
            h.settle().await;
            assert_eq!(h.math.rebuild_count(), before + 1);
            assert_eq!(h.engine_calls(), vec!["a"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_late_result_for_deleted_region() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::with_config("x $a$", MathConfig::default(), 100);

            // Debounce fires and the render starts
            tokio::time::sleep(Duration::from_millis(210)).await;
            assert!(!h.math.queue().is_idle());

            h.view.dispatch(Transaction::new().replace(2, 5, ""));
            h.settle().await;

            assert_eq!(h.math.cache_len(), 1);
            assert!(h.widgets().is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_headings_and_math_share_the_view() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new("# Title\n$x$");
            let host: Rc<dyn EditorHost> = h.view.clone();
            h.view
                .attach(Rc::new(HeadingsPlugin::new(Rc::downgrade(&host))));
            h.settle().await;

            let annotations = h.view.annotations();
            let first = annotations.iter().next().unwrap();
            assert_eq!(first.treatment, Treatment::LineClass("cm-heading-1"));
            assert_eq!(h.widgets().len(), 1);
            assert_eq!((h.widgets()[0].0, h.widgets()[0].1), (8, 11));
        })
        .await;
}
