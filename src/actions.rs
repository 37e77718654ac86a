//! Click strategy resolution.
//!
//! Two incompatible strategies exist for acting on an element: invoking
//! its native accessibility action, or injecting synthetic input. The
//! resolver prefers the native action (it targets the exact node, with no
//! pointer positioning involved) and falls back to synthetic input only
//! when the action interface errors or is absent.

use crate::element::UIElement;
use crate::input::{InputInjector, MouseButton};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMethod {
    NativeAction,
    SyntheticInput,
}

/// Typed outcome of a click attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Performed(ClickMethod),
    /// Neither strategy can run: no native action and no input device.
    Unavailable,
    /// A strategy ran and reported failure.
    Failed(String),
}

pub struct ActionResolver;

impl ActionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Click `element`: native accessibility action first, synthetic
    /// injection as the error fallback. Exactly one strategy runs unless
    /// the native path errors.
    pub async fn click(
        &self,
        element: &UIElement,
        injector: &mut InputInjector,
    ) -> ClickOutcome {
        match element.action_count().await {
            Ok(count) if count > 0 => match element.invoke_action(0).await {
                Ok(true) => {
                    info!("native action invoked");
                    return ClickOutcome::Performed(ClickMethod::NativeAction);
                }
                Ok(false) => {
                    return ClickOutcome::Failed("native action reported failure".to_string());
                }
                Err(e) => {
                    debug!(error = %e, "native action errored, trying synthetic input");
                }
            },
            Ok(_) => {
                debug!("element exposes no native action, trying synthetic input");
            }
            Err(e) => {
                debug!(error = %e, "action interface unavailable, trying synthetic input");
            }
        }
        self.synthetic_click(element, injector).await
    }

    async fn synthetic_click(
        &self,
        element: &UIElement,
        injector: &mut InputInjector,
    ) -> ClickOutcome {
        if !injector.available() {
            return ClickOutcome::Unavailable;
        }
        // The virtual device cannot warp the pointer; the bounds center is
        // logged so a failed click can be diagnosed against pointer
        // position.
        if let Ok((x, y, w, h)) = element.bounds().await {
            debug!(
                target_x = x + w / 2,
                target_y = y + h / 2,
                "synthetic click at current pointer position"
            );
        }
        match injector.click(MouseButton::Left).await {
            Ok(()) => ClickOutcome::Performed(ClickMethod::SyntheticInput),
            Err(e) => ClickOutcome::Failed(e.to_string()),
        }
    }
}

impl Default for ActionResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::UIElement;
    use crate::input::{EmittedEvent, RecordingBackend};
    use crate::platforms::AccessibilityEngine;
    use crate::platforms::mock::{MockEngine, MockFailure, MockNode};

    async fn single_element(engine: &MockEngine) -> UIElement {
        engine.applications().await.unwrap().remove(0)
    }

    fn recording_injector() -> (
        InputInjector,
        std::sync::Arc<std::sync::Mutex<Vec<EmittedEvent>>>,
    ) {
        let backend = RecordingBackend::new();
        let events = backend.events_handle();
        (InputInjector::with_backend(Box::new(backend)), events)
    }

    #[tokio::test]
    async fn native_action_is_preferred() {
        let engine = MockEngine::new(vec![MockNode::button("Ok").with_actions(1, true)]);
        let element = single_element(&engine).await;
        let (mut injector, events) = recording_injector();

        let outcome = ActionResolver::new().click(&element, &mut injector).await;

        assert_eq!(outcome, ClickOutcome::Performed(ClickMethod::NativeAction));
        assert_eq!(engine.invoked(), vec!["Ok"]);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn native_action_failure_is_not_retried_synthetically() {
        let engine = MockEngine::new(vec![MockNode::button("Ok").with_actions(1, false)]);
        let element = single_element(&engine).await;
        let (mut injector, events) = recording_injector();

        let outcome = ActionResolver::new().click(&element, &mut injector).await;

        assert!(matches!(outcome, ClickOutcome::Failed(_)));
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn native_action_error_falls_back_to_synthetic() {
        let engine = MockEngine::new(vec![
            MockNode::button("Ok")
                .with_actions(1, true)
                .failing(MockFailure::Invoke),
        ]);
        let element = single_element(&engine).await;
        let (mut injector, events) = recording_injector();

        let outcome = ActionResolver::new().click(&element, &mut injector).await;

        assert_eq!(
            outcome,
            ClickOutcome::Performed(ClickMethod::SyntheticInput)
        );
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2); // press + release
    }

    #[tokio::test]
    async fn actionless_element_uses_synthetic_input() {
        let engine = MockEngine::new(vec![MockNode::button("Ok")]);
        let element = single_element(&engine).await;
        let (mut injector, _) = recording_injector();

        let outcome = ActionResolver::new().click(&element, &mut injector).await;

        assert_eq!(
            outcome,
            ClickOutcome::Performed(ClickMethod::SyntheticInput)
        );
        assert!(engine.invoked().is_empty());
    }

    #[tokio::test]
    async fn nothing_available_reports_unavailable() {
        let engine = MockEngine::new(vec![MockNode::button("Ok")]);
        let element = single_element(&engine).await;
        let mut injector = InputInjector::unavailable();

        let outcome = ActionResolver::new().click(&element, &mut injector).await;

        assert_eq!(outcome, ClickOutcome::Unavailable);
    }
}
