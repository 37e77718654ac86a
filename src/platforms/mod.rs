use crate::element::UIElement;
use crate::errors::AutomationError;
use std::sync::Arc;

/// The interface the scanner consumes from an accessibility provider.
///
/// A provider exposes the desktop root's top-level applications; everything
/// below that is reached through [`UIElement`](crate::element::UIElement)
/// handles.
#[async_trait::async_trait]
pub trait AccessibilityEngine: Send + Sync {
    /// Top-level applications currently exposed by the desktop root.
    async fn applications(&self) -> Result<Vec<UIElement>, AutomationError>;
}

#[cfg(target_os = "linux")]
pub mod atspi;
pub mod mock;

/// Create the accessibility engine for the current platform.
pub async fn create_engine() -> Result<Arc<dyn AccessibilityEngine>, AutomationError> {
    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(atspi::AtspiEngine::new().await?))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Err(AutomationError::PlatformError(
            "no accessibility backend for this platform".to_string(),
        ))
    }
}
