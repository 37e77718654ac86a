//! Accessibility tree scanner.
//!
//! Walks the tree exposed by the provider, finds the active window, and
//! emits every visible clickable element into a fresh [`ScanSnapshot`].
//! The walk is bounded and resilient: the tree is a live external object
//! graph that can mutate or turn inconsistent mid-traversal, so a single
//! uncooperative node is skipped, never fatal.

use crate::element::{ElementRecord, ScanSnapshot, UIElement};
use crate::errors::AutomationError;
use crate::platforms::AccessibilityEngine;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Depth limit for the focused-window walk.
pub const WINDOW_DEPTH_LIMIT: usize = 50;
/// Depth limit for the desktop-wide fallback, kept low to avoid
/// pathological full-desktop walks.
pub const FALLBACK_DEPTH_LIMIT: usize = 10;

/// Per-scan traversal accounting.
///
/// `skipped` counts nodes (and therefore whole subtrees) abandoned because
/// a provider query failed; hidden subtrees pruned by the visibility
/// filter are not failures and are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TraversalReport {
    pub visited: usize,
    pub emitted: usize,
    pub skipped: usize,
}

/// Result of one scan: the snapshot plus its traversal report.
#[derive(Debug)]
pub struct ScanOutcome {
    pub snapshot: ScanSnapshot,
    pub report: TraversalReport,
}

/// Walks the accessibility tree and produces versioned snapshots.
pub struct TreeScanner {
    engine: Option<Arc<dyn AccessibilityEngine>>,
}

impl TreeScanner {
    /// `engine` is `None` when the provider failed to initialize; scans
    /// then degrade to empty snapshots instead of erroring.
    pub fn new(engine: Option<Arc<dyn AccessibilityEngine>>) -> Self {
        Self { engine }
    }

    /// Scan the active window (or, failing that, the whole desktop with a
    /// tighter depth bound) and return a fresh snapshot for `generation`.
    #[instrument(skip(self))]
    pub async fn scan(&self, generation: u64) -> ScanOutcome {
        let start = Instant::now();
        let mut snapshot = ScanSnapshot::empty(generation);
        let mut report = TraversalReport::default();

        let Some(engine) = &self.engine else {
            warn!("accessibility provider unavailable, returning empty snapshot");
            return ScanOutcome { snapshot, report };
        };

        let applications = match engine.applications().await {
            Ok(applications) => applications,
            Err(e) => {
                warn!(error = %e, "failed to enumerate applications, returning empty snapshot");
                return ScanOutcome { snapshot, report };
            }
        };

        match find_active_window(&applications, &mut report).await {
            Some(window) => {
                walk(
                    &window,
                    0,
                    WINDOW_DEPTH_LIMIT,
                    &mut snapshot,
                    &mut report,
                )
                .await;
            }
            None => {
                warn!("no active window found, scanning every application subtree");
                for application in &applications {
                    walk(
                        application,
                        0,
                        FALLBACK_DEPTH_LIMIT,
                        &mut snapshot,
                        &mut report,
                    )
                    .await;
                }
            }
        }

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            generation,
            visited = report.visited,
            emitted = report.emitted,
            skipped = report.skipped,
            "scan complete"
        );
        ScanOutcome { snapshot, report }
    }
}

/// Enumerate each application's windows and pick the first one whose state
/// set contains "active" or "focused".
async fn find_active_window(
    applications: &[UIElement],
    report: &mut TraversalReport,
) -> Option<UIElement> {
    for application in applications {
        let windows = match application.children().await {
            Ok(windows) => windows,
            Err(e) => {
                debug!(error = %e, "skipping application: window enumeration failed");
                report.skipped += 1;
                continue;
            }
        };
        for window in windows {
            match window.state().await {
                Ok(state) if state.active || state.focused => return Some(window),
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "skipping window: state unavailable");
                    report.skipped += 1;
                }
            }
        }
    }
    None
}

/// Bounded pre-order walk. A node whose state set lacks both "visible" and
/// "showing" prunes its entire subtree; clickable nodes are emitted and
/// their children still traversed, since containers like combo boxes hold
/// further targets.
fn walk<'a>(
    node: &'a UIElement,
    depth: usize,
    depth_limit: usize,
    snapshot: &'a mut ScanSnapshot,
    report: &'a mut TraversalReport,
) -> BoxFuture<'a, ()> {
    async move {
        if depth > depth_limit {
            return;
        }
        report.visited += 1;

        let state = match node.state().await {
            Ok(state) => state,
            Err(e) => {
                debug!(error = %e, "skipping node: state unavailable");
                report.skipped += 1;
                return;
            }
        };
        if !state.visible && !state.showing {
            return;
        }

        match node.role().await {
            Ok(role) if role.is_clickable() => match try_emit(node, snapshot).await {
                Ok(true) => report.emitted += 1,
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "skipping element: emission failed");
                    report.skipped += 1;
                }
            },
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "node role unavailable, traversing children anyway");
                report.skipped += 1;
            }
        }

        let children = match node.children().await {
            Ok(children) => children,
            Err(e) => {
                debug!(error = %e, "skipping subtree: child enumeration failed");
                report.skipped += 1;
                return;
            }
        };
        for child in &children {
            walk(child, depth + 1, depth_limit, snapshot, report).await;
        }
    }
    .boxed()
}

/// Read the node's bounds and, if it has positive area, record it in the
/// snapshot. Returns whether a record was emitted.
async fn try_emit(
    node: &UIElement,
    snapshot: &mut ScanSnapshot,
) -> Result<bool, AutomationError> {
    let (x, y, w, h) = node.bounds().await?;
    if w <= 0 || h <= 0 {
        return Ok(false);
    }
    let name = node.name().await?;
    let role = node.role_name().await?;
    let id = snapshot.next_id();
    snapshot.insert(
        ElementRecord {
            id,
            name,
            role,
            x,
            y,
            w,
            h,
        },
        node.clone(),
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementRole;
    use crate::platforms::mock::{MockEngine, MockFailure, MockNode};

    fn scanner(applications: Vec<MockNode>) -> TreeScanner {
        TreeScanner::new(Some(Arc::new(MockEngine::new(applications))))
    }

    #[tokio::test]
    async fn scans_only_the_active_window() {
        let background = MockNode::application(
            "editor",
            vec![MockNode::window("editor-main").with_children(vec![MockNode::button("Save")])],
        );
        let foreground = MockNode::application(
            "browser",
            vec![
                MockNode::window("browser-secondary"),
                MockNode::active_window("browser-main")
                    .with_children(vec![MockNode::button("Reload"), MockNode::button("Stop")]),
            ],
        );
        let outcome = scanner(vec![background, foreground]).scan(1).await;
        let names: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["Reload", "Stop"]);
    }

    #[tokio::test]
    async fn focused_window_counts_as_active() {
        let mut window = MockNode::window("main");
        window.state.focused = true;
        let app = MockNode::application(
            "app",
            vec![window.with_children(vec![MockNode::button("Ok")])],
        );
        let outcome = scanner(vec![app]).scan(1).await;
        assert_eq!(outcome.snapshot.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_desktop_scan_without_active_window() {
        let first = MockNode::application(
            "one",
            vec![MockNode::window("w1").with_children(vec![MockNode::button("A")])],
        );
        let second = MockNode::application(
            "two",
            vec![MockNode::window("w2").with_children(vec![MockNode::button("B")])],
        );
        let outcome = scanner(vec![first, second]).scan(1).await;
        let names: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn fallback_scan_is_depth_bounded() {
        // Chain deeper than the fallback limit; the innermost button must
        // stay unreachable while a shallow one is found.
        let mut deep = MockNode::button("too-deep");
        for i in 0..FALLBACK_DEPTH_LIMIT + 1 {
            deep = MockNode::new(&format!("panel-{i}"), ElementRole::Other)
                .with_children(vec![deep]);
        }
        let app = MockNode::application(
            "app",
            vec![MockNode::window("w").with_children(vec![MockNode::button("shallow"), deep])],
        );
        let outcome = scanner(vec![app]).scan(1).await;
        let names: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["shallow"]);
    }

    #[tokio::test]
    async fn hidden_subtrees_are_pruned_entirely() {
        // The hidden panel's visible-looking child must not be emitted.
        let hidden_panel = MockNode::new("panel", ElementRole::Other)
            .hidden()
            .with_children(vec![MockNode::button("Ghost")]);
        let app = MockNode::application(
            "app",
            vec![MockNode::active_window("main")
                .with_children(vec![hidden_panel, MockNode::button("Real")])],
        );
        let outcome = scanner(vec![app]).scan(1).await;
        let names: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["Real"]);
    }

    #[tokio::test]
    async fn zero_area_elements_are_filtered() {
        let app = MockNode::application(
            "app",
            vec![MockNode::active_window("main").with_children(vec![
                MockNode::button("flat").with_bounds(10, 10, 100, 0),
                MockNode::button("thin").with_bounds(10, 10, 0, 100),
                MockNode::button("ok").with_bounds(10, 10, 100, 100),
            ])],
        );
        let outcome = scanner(vec![app]).scan(1).await;
        assert_eq!(outcome.snapshot.len(), 1);
        assert_eq!(outcome.snapshot.records()[0].name, "ok");
        assert!(outcome
            .snapshot
            .records()
            .iter()
            .all(|r| r.w > 0 && r.h > 0));
    }

    #[tokio::test]
    async fn uncooperative_node_is_skipped_not_fatal() {
        let app = MockNode::application(
            "app",
            vec![MockNode::active_window("main").with_children(vec![
                MockNode::button("before"),
                MockNode::new("broken", ElementRole::Other)
                    .failing(MockFailure::State)
                    .with_children(vec![MockNode::button("unreachable")]),
                MockNode::button("after"),
            ])],
        );
        let outcome = scanner(vec![app]).scan(1).await;
        let names: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["before", "after"]);
        assert_eq!(outcome.report.skipped, 1);
    }

    #[tokio::test]
    async fn emission_is_preorder_and_containers_recurse() {
        let combo = MockNode::new("Fonts", ElementRole::ComboBox)
            .with_children(vec![
                MockNode::new("Serif", ElementRole::ListItem),
                MockNode::new("Mono", ElementRole::ListItem),
            ]);
        let app = MockNode::application(
            "app",
            vec![MockNode::active_window("main").with_children(vec![combo])],
        );
        let outcome = scanner(vec![app]).scan(1).await;
        let names: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["Fonts", "Serif", "Mono"]);
    }

    #[tokio::test]
    async fn ids_are_unique_within_a_snapshot() {
        let app = MockNode::application(
            "app",
            vec![MockNode::active_window("main").with_children(vec![
                MockNode::button("A"),
                MockNode::button("B"),
                MockNode::button("C"),
            ])],
        );
        let outcome = scanner(vec![app]).scan(7).await;
        let mut ids: Vec<_> = outcome
            .snapshot
            .records()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert!(ids.iter().all(|id| id.starts_with("7-")));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn repeated_scans_agree_up_to_id_renumbering() {
        let tree = vec![MockNode::application(
            "app",
            vec![MockNode::active_window("main").with_children(vec![
                MockNode::button("A").with_bounds(1, 2, 3, 4),
                MockNode::button("B").with_bounds(5, 6, 7, 8),
            ])],
        )];
        let scanner = scanner(tree);
        let first = scanner.scan(1).await;
        let second = scanner.scan(2).await;
        assert_eq!(first.snapshot.len(), second.snapshot.len());
        for (a, b) in first
            .snapshot
            .records()
            .iter()
            .zip(second.snapshot.records())
        {
            assert_eq!(a.name, b.name);
            assert_eq!(a.role, b.role);
            assert_eq!((a.x, a.y, a.w, a.h), (b.x, b.y, b.w, b.h));
            assert_ne!(a.id, b.id);
        }
    }

    #[tokio::test]
    async fn provider_unavailable_degrades_to_empty_snapshot() {
        let scanner = TreeScanner::new(Some(Arc::new(MockEngine::unavailable())));
        let outcome = scanner.scan(3).await;
        assert!(outcome.snapshot.is_empty());
        assert_eq!(outcome.snapshot.generation(), 3);

        let scanner = TreeScanner::new(None);
        assert!(scanner.scan(4).await.snapshot.is_empty());
    }
}
