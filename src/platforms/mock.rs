//! In-memory accessibility engine for tests.
//!
//! Builds a static tree of [`MockNode`]s and serves it through the same
//! trait surface as the real backend, with per-node failure injection and
//! a shared log of native action invocations.

use crate::element::{ElementRole, ElementState, UIElement, UIElementImpl};
use crate::errors::AutomationError;
use crate::platforms::AccessibilityEngine;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Which element query should fail for a given node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    State,
    Children,
    Bounds,
    Action,
    /// `action_count` succeeds but the invocation itself errors.
    Invoke,
}

/// Declarative description of one tree node.
#[derive(Debug, Clone)]
pub struct MockNode {
    pub name: String,
    pub role: ElementRole,
    pub state: ElementState,
    pub bounds: (i32, i32, i32, i32),
    pub actions: i32,
    pub action_result: bool,
    pub fail: Option<MockFailure>,
    pub children: Vec<MockNode>,
}

impl MockNode {
    pub fn new(name: &str, role: ElementRole) -> Self {
        Self {
            name: name.to_string(),
            role,
            state: ElementState {
                visible: true,
                showing: true,
                ..Default::default()
            },
            bounds: (0, 0, 100, 30),
            actions: 0,
            action_result: true,
            fail: None,
            children: Vec::new(),
        }
    }

    pub fn application(name: &str, windows: Vec<MockNode>) -> Self {
        Self::new(name, ElementRole::Application).with_children(windows)
    }

    pub fn window(name: &str) -> Self {
        Self::new(name, ElementRole::Frame)
    }

    pub fn active_window(name: &str) -> Self {
        let mut node = Self::window(name);
        node.state.active = true;
        node
    }

    pub fn button(name: &str) -> Self {
        Self::new(name, ElementRole::PushButton)
    }

    pub fn with_children(mut self, children: Vec<MockNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_bounds(mut self, x: i32, y: i32, w: i32, h: i32) -> Self {
        self.bounds = (x, y, w, h);
        self
    }

    pub fn with_actions(mut self, count: i32, result: bool) -> Self {
        self.actions = count;
        self.action_result = result;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.state.visible = false;
        self.state.showing = false;
        self
    }

    pub fn failing(mut self, failure: MockFailure) -> Self {
        self.fail = Some(failure);
        self
    }
}

type ActionLog = Arc<Mutex<Vec<String>>>;

/// Engine serving a fixed tree of mock applications.
pub struct MockEngine {
    applications: Vec<MockNode>,
    log: ActionLog,
    available: AtomicBool,
}

impl MockEngine {
    pub fn new(applications: Vec<MockNode>) -> Self {
        Self {
            applications,
            log: Arc::new(Mutex::new(Vec::new())),
            available: AtomicBool::new(true),
        }
    }

    /// Engine whose `applications` call always fails, simulating a
    /// provider that never came up.
    pub fn unavailable() -> Self {
        Self {
            applications: Vec::new(),
            log: Arc::new(Mutex::new(Vec::new())),
            available: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `applications` call fail, simulating a
    /// provider that died mid-session.
    pub fn go_offline(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    /// Names of the nodes whose native action was invoked, in order.
    pub fn invoked(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessibilityEngine for MockEngine {
    async fn applications(&self) -> Result<Vec<UIElement>, AutomationError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AutomationError::PlatformError(
                "accessibility provider unavailable".to_string(),
            ));
        }
        Ok(self
            .applications
            .iter()
            .map(|node| {
                UIElement::new(Box::new(MockElement {
                    node: Arc::new(node.clone()),
                    log: self.log.clone(),
                }))
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
struct MockElement {
    node: Arc<MockNode>,
    log: ActionLog,
}

impl MockElement {
    fn fail_if(&self, failure: MockFailure, what: &str) -> Result<(), AutomationError> {
        if self.node.fail == Some(failure) {
            return Err(AutomationError::PlatformError(format!(
                "node defunct: {what}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UIElementImpl for MockElement {
    async fn name(&self) -> Result<String, AutomationError> {
        Ok(self.node.name.clone())
    }

    async fn role(&self) -> Result<ElementRole, AutomationError> {
        Ok(self.node.role)
    }

    async fn role_name(&self) -> Result<String, AutomationError> {
        Ok(self.node.role.label().to_string())
    }

    async fn state(&self) -> Result<ElementState, AutomationError> {
        self.fail_if(MockFailure::State, "state")?;
        Ok(self.node.state)
    }

    async fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.fail_if(MockFailure::Children, "children")?;
        Ok(self
            .node
            .children
            .iter()
            .map(|child| {
                UIElement::new(Box::new(MockElement {
                    node: Arc::new(child.clone()),
                    log: self.log.clone(),
                }))
            })
            .collect())
    }

    async fn bounds(&self) -> Result<(i32, i32, i32, i32), AutomationError> {
        self.fail_if(MockFailure::Bounds, "bounds")?;
        Ok(self.node.bounds)
    }

    async fn action_count(&self) -> Result<i32, AutomationError> {
        self.fail_if(MockFailure::Action, "action")?;
        Ok(self.node.actions)
    }

    async fn invoke_action(&self, _index: i32) -> Result<bool, AutomationError> {
        self.fail_if(MockFailure::Action, "action")?;
        self.fail_if(MockFailure::Invoke, "invoke")?;
        self.log.lock().unwrap().push(self.node.name.clone());
        Ok(self.node.action_result)
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }
}
