//! AT-SPI2 accessibility backend.
//!
//! Talks to the accessibility bus over D-Bus. The desktop root lives at
//! `org.a11y.atspi.Registry` / `/org/a11y/atspi/accessible/root`; its
//! children are the running applications. Per-node queries go through the
//! `Accessible`, `Component` and `Action` interfaces.
//!
//! Requires AT-SPI2 to be running (most desktops launch it via
//! `at-spi-bus-launcher`) and applications to expose their trees, which
//! GTK and Qt apps do by default.

use crate::element::{ElementRole, ElementState, UIElement, UIElementImpl};
use crate::errors::AutomationError;
use crate::platforms::AccessibilityEngine;
use atspi::connection::AccessibilityConnection;
use atspi_common::{CoordType, ObjectRef, Role, State};
use atspi_proxies::accessible::{AccessibleProxy, ObjectRefExt};
use atspi_proxies::action::ActionProxy;
use atspi_proxies::component::ComponentProxy;
use std::fmt;
use tracing::info;

const REGISTRY_DEST: &str = "org.a11y.atspi.Registry";
const ROOT_PATH: &str = "/org/a11y/atspi/accessible/root";

fn platform_err(e: impl fmt::Display) -> AutomationError {
    AutomationError::PlatformError(e.to_string())
}

/// Engine backed by the session's accessibility bus.
pub struct AtspiEngine {
    connection: AccessibilityConnection,
}

impl AtspiEngine {
    pub async fn new() -> Result<Self, AutomationError> {
        let connection = AccessibilityConnection::new().await.map_err(platform_err)?;
        info!("connected to accessibility bus");
        Ok(Self { connection })
    }
}

#[async_trait::async_trait]
impl AccessibilityEngine for AtspiEngine {
    async fn applications(&self) -> Result<Vec<UIElement>, AutomationError> {
        let conn = self.connection.connection();
        let root: AccessibleProxy<'_> = AccessibleProxy::builder(conn)
            .destination(REGISTRY_DEST)
            .map_err(platform_err)?
            .path(ROOT_PATH)
            .map_err(platform_err)?
            .build()
            .await
            .map_err(platform_err)?;
        let children: Vec<ObjectRef> = root.get_children().await.map_err(platform_err)?;
        Ok(children
            .into_iter()
            .map(|object| {
                UIElement::new(Box::new(AtspiElement {
                    conn: conn.clone(),
                    object,
                }))
            })
            .collect())
    }
}

/// Handle to one accessible object, addressed by bus name + object path.
///
/// The referenced node is owned by the remote application and may vanish
/// between calls; every method revalidates by simply performing the D-Bus
/// call and mapping failures to `PlatformError`.
#[derive(Clone)]
struct AtspiElement {
    conn: zbus::Connection,
    object: ObjectRef,
}

impl fmt::Debug for AtspiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtspiElement")
            .field("path", &self.object.path)
            .finish()
    }
}

impl AtspiElement {
    async fn accessible(&self) -> Result<AccessibleProxy<'_>, AutomationError> {
        self.object
            .as_accessible_proxy(&self.conn)
            .await
            .map_err(platform_err)
    }

    async fn component(&self) -> Result<ComponentProxy<'_>, AutomationError> {
        ComponentProxy::builder(&self.conn)
            .destination(self.object.name.clone())
            .map_err(platform_err)?
            .path(self.object.path.clone())
            .map_err(platform_err)?
            .build()
            .await
            .map_err(platform_err)
    }

    async fn action(&self) -> Result<ActionProxy<'_>, AutomationError> {
        ActionProxy::builder(&self.conn)
            .destination(self.object.name.clone())
            .map_err(platform_err)?
            .path(self.object.path.clone())
            .map_err(platform_err)?
            .build()
            .await
            .map_err(platform_err)
    }
}

fn map_role(role: Role) -> ElementRole {
    match role {
        Role::Button => ElementRole::PushButton,
        Role::ToggleButton => ElementRole::ToggleButton,
        Role::CheckBox => ElementRole::CheckBox,
        Role::RadioButton => ElementRole::RadioButton,
        Role::MenuItem => ElementRole::MenuItem,
        Role::CheckMenuItem => ElementRole::CheckMenuItem,
        Role::RadioMenuItem => ElementRole::RadioMenuItem,
        Role::Link => ElementRole::Link,
        Role::PageTab => ElementRole::PageTab,
        Role::ComboBox => ElementRole::ComboBox,
        Role::ListItem => ElementRole::ListItem,
        Role::Entry => ElementRole::Entry,
        Role::Application => ElementRole::Application,
        Role::Frame => ElementRole::Frame,
        Role::Window => ElementRole::Window,
        Role::Dialog => ElementRole::Dialog,
        _ => ElementRole::Other,
    }
}

#[async_trait::async_trait]
impl UIElementImpl for AtspiElement {
    async fn name(&self) -> Result<String, AutomationError> {
        let proxy = self.accessible().await?;
        proxy.name().await.map_err(platform_err)
    }

    async fn role(&self) -> Result<ElementRole, AutomationError> {
        let proxy = self.accessible().await?;
        let role = proxy.get_role().await.map_err(platform_err)?;
        Ok(map_role(role))
    }

    async fn role_name(&self) -> Result<String, AutomationError> {
        let proxy = self.accessible().await?;
        proxy.get_role_name().await.map_err(platform_err)
    }

    async fn state(&self) -> Result<ElementState, AutomationError> {
        let proxy = self.accessible().await?;
        let states = proxy.get_state().await.map_err(platform_err)?;
        Ok(ElementState {
            active: states.contains(State::Active),
            focused: states.contains(State::Focused),
            visible: states.contains(State::Visible),
            showing: states.contains(State::Showing),
        })
    }

    async fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        let proxy = self.accessible().await?;
        let children: Vec<ObjectRef> = proxy.get_children().await.map_err(platform_err)?;
        Ok(children
            .into_iter()
            .map(|object| {
                UIElement::new(Box::new(AtspiElement {
                    conn: self.conn.clone(),
                    object,
                }))
            })
            .collect())
    }

    async fn bounds(&self) -> Result<(i32, i32, i32, i32), AutomationError> {
        let component = self.component().await?;
        component
            .get_extents(CoordType::Screen)
            .await
            .map_err(platform_err)
    }

    async fn action_count(&self) -> Result<i32, AutomationError> {
        let action = self.action().await?;
        action.nactions().await.map_err(platform_err)
    }

    async fn invoke_action(&self, index: i32) -> Result<bool, AutomationError> {
        let action = self.action().await?;
        action.do_action(index).await.map_err(platform_err)
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }
}
