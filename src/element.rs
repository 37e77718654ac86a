use crate::errors::AutomationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Immutable result of one scan step, as sent to the controller.
///
/// `id` is opaque and only valid against the snapshot that produced it.
/// Bounds are screen coordinates; records with non-positive area are never
/// emitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementRecord {
    pub id: String,
    pub name: String,
    pub role: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Semantic element categories the scanner cares about.
///
/// Concrete backends map their native role taxonomy onto this closed set
/// once, at the platform boundary. Everything that is not a known
/// interaction target or container collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    PushButton,
    ToggleButton,
    CheckBox,
    RadioButton,
    MenuItem,
    CheckMenuItem,
    RadioMenuItem,
    Link,
    PageTab,
    ComboBox,
    ListItem,
    Entry,
    Application,
    Frame,
    Window,
    Dialog,
    Other,
}

impl ElementRole {
    /// Whether this role is a valid click target.
    pub fn is_clickable(&self) -> bool {
        matches!(
            self,
            ElementRole::PushButton
                | ElementRole::ToggleButton
                | ElementRole::CheckBox
                | ElementRole::RadioButton
                | ElementRole::MenuItem
                | ElementRole::CheckMenuItem
                | ElementRole::RadioMenuItem
                | ElementRole::Link
                | ElementRole::PageTab
                | ElementRole::ComboBox
                | ElementRole::ListItem
                | ElementRole::Entry
        )
    }

    /// Human-readable label, used when a backend cannot supply its own.
    pub fn label(&self) -> &'static str {
        match self {
            ElementRole::PushButton => "push button",
            ElementRole::ToggleButton => "toggle button",
            ElementRole::CheckBox => "check box",
            ElementRole::RadioButton => "radio button",
            ElementRole::MenuItem => "menu item",
            ElementRole::CheckMenuItem => "check menu item",
            ElementRole::RadioMenuItem => "radio menu item",
            ElementRole::Link => "link",
            ElementRole::PageTab => "page tab",
            ElementRole::ComboBox => "combo box",
            ElementRole::ListItem => "list item",
            ElementRole::Entry => "entry",
            ElementRole::Application => "application",
            ElementRole::Frame => "frame",
            ElementRole::Window => "window",
            ElementRole::Dialog => "dialog",
            ElementRole::Other => "other",
        }
    }
}

/// The subset of a node's state set the scanner reads, fetched in one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementState {
    pub active: bool,
    pub focused: bool,
    pub visible: bool,
    pub showing: bool,
}

/// Interface for platform-specific element handles.
///
/// A handle references a live node owned by the external accessibility
/// provider; it may become stale at any time, so every method can fail and
/// callers revalidate at use time.
#[async_trait]
pub(crate) trait UIElementImpl: Send + Sync + Debug {
    async fn name(&self) -> Result<String, AutomationError>;
    async fn role(&self) -> Result<ElementRole, AutomationError>;
    /// Provider-reported role label for display purposes.
    async fn role_name(&self) -> Result<String, AutomationError>;
    async fn state(&self) -> Result<ElementState, AutomationError>;
    async fn children(&self) -> Result<Vec<UIElement>, AutomationError>;
    /// Bounding box `(x, y, w, h)` in screen coordinates.
    async fn bounds(&self) -> Result<(i32, i32, i32, i32), AutomationError>;
    /// Number of invocable native actions the node exposes.
    async fn action_count(&self) -> Result<i32, AutomationError>;
    /// Invoke the native action at `index`; returns the provider's success flag.
    async fn invoke_action(&self, index: i32) -> Result<bool, AutomationError>;
    fn clone_box(&self) -> Box<dyn UIElementImpl>;
}

/// A handle to one node of the accessibility tree at scan time.
#[derive(Debug)]
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

impl UIElement {
    pub(crate) fn new(inner: Box<dyn UIElementImpl>) -> Self {
        Self { inner }
    }

    pub async fn name(&self) -> Result<String, AutomationError> {
        self.inner.name().await
    }

    pub async fn role(&self) -> Result<ElementRole, AutomationError> {
        self.inner.role().await
    }

    pub async fn role_name(&self) -> Result<String, AutomationError> {
        self.inner.role_name().await
    }

    pub async fn state(&self) -> Result<ElementState, AutomationError> {
        self.inner.state().await
    }

    pub async fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.inner.children().await
    }

    pub async fn bounds(&self) -> Result<(i32, i32, i32, i32), AutomationError> {
        self.inner.bounds().await
    }

    pub async fn action_count(&self) -> Result<i32, AutomationError> {
        self.inner.action_count().await
    }

    pub async fn invoke_action(&self, index: i32) -> Result<bool, AutomationError> {
        self.inner.invoke_action(index).await
    }
}

impl Clone for UIElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

/// One complete, versioned result of a scan.
///
/// Exactly one snapshot is current at any time; a new `SCAN` replaces the
/// whole value, never mutates it in place. Ids embed the snapshot
/// generation, so an id minted by a superseded snapshot can never resolve
/// against the current one.
#[derive(Debug, Default)]
pub struct ScanSnapshot {
    generation: u64,
    counter: u64,
    records: Vec<ElementRecord>,
    handles: HashMap<String, UIElement>,
}

impl ScanSnapshot {
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            counter: 0,
            records: Vec::new(),
            handles: HashMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mint the next id for this snapshot.
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.generation, self.counter)
    }

    pub fn insert(&mut self, record: ElementRecord, handle: UIElement) {
        self.handles.insert(record.id.clone(), handle);
        self.records.push(record);
    }

    /// Ordered records, pre-order as emitted by the scanner.
    pub fn records(&self) -> &[ElementRecord] {
        &self.records
    }

    pub fn handle(&self, id: &str) -> Option<&UIElement> {
        self.handles.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_generation_scoped() {
        let mut first = ScanSnapshot::empty(1);
        let mut second = ScanSnapshot::empty(2);
        assert_eq!(first.next_id(), "1-1");
        assert_eq!(first.next_id(), "1-2");
        assert_eq!(second.next_id(), "2-1");
    }

    #[test]
    fn clickable_roles_match_the_target_set() {
        assert!(ElementRole::PushButton.is_clickable());
        assert!(ElementRole::Entry.is_clickable());
        assert!(ElementRole::ComboBox.is_clickable());
        assert!(!ElementRole::Frame.is_clickable());
        assert!(!ElementRole::Application.is_clickable());
        assert!(!ElementRole::Other.is_clickable());
    }
}
