//! Virtual input injection.
//!
//! Owns the lifetime of a uinput virtual pointer. The device advertises
//! button and relative-wheel capabilities only: uinput's absolute axes do
//! not reliably map onto display pixels without compositor cooperation, so
//! absolute positioning is deliberately never advertised and any click
//! that needs a specific location goes through the native accessibility
//! action instead.

use crate::errors::AutomationError;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between button press and release. Kept comfortably above the
/// 40 ms floor some consuming applications need to register distinct
/// press/release events.
pub const CLICK_HOLD_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Left => "left",
            ScrollDirection::Right => "right",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelAxis {
    Vertical,
    Horizontal,
}

/// Low-level event sink the injector drives. The production implementation
/// wraps a uinput device; tests substitute a recording sink.
pub trait InputBackend: Send {
    fn emit_button(&mut self, button: MouseButton, pressed: bool) -> std::io::Result<()>;
    fn emit_wheel(&mut self, axis: WheelAxis, delta: i32) -> std::io::Result<()>;
}

/// Click and scroll primitives over an optional backend.
///
/// Backend absence (device creation failed at startup) is a valid runtime
/// state: `available()` reports it and every primitive returns
/// `DeviceUnavailable` instead of panicking.
pub struct InputInjector {
    backend: Option<Box<dyn InputBackend>>,
}

impl InputInjector {
    /// Create the injector over the platform's virtual device, degrading
    /// to unavailable if the device cannot be created (missing uinput
    /// permissions, unsupported platform).
    pub fn new() -> Self {
        #[cfg(target_os = "linux")]
        {
            match uinput::UinputBackend::new() {
                Ok(backend) => {
                    debug!("virtual input device registered");
                    return Self {
                        backend: Some(Box::new(backend)),
                    };
                }
                Err(e) => {
                    warn!(error = %e, "failed to create uinput device; is the user in the 'input' group?");
                }
            }
        }
        Self { backend: None }
    }

    pub fn with_backend(backend: Box<dyn InputBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn available(&self) -> bool {
        self.backend.is_some()
    }

    /// Press and release `button` at the current pointer position.
    pub async fn click(&mut self, button: MouseButton) -> Result<(), AutomationError> {
        let backend = self
            .backend
            .as_mut()
            .ok_or(AutomationError::DeviceUnavailable)?;
        backend.emit_button(button, true)?;
        tokio::time::sleep(CLICK_HOLD_DELAY).await;
        backend.emit_button(button, false)?;
        Ok(())
    }

    /// Emit one relative wheel event. Vertical: up is positive, down is
    /// negative. Horizontal: right is positive, left is negative.
    pub fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: i32,
    ) -> Result<(), AutomationError> {
        let backend = self
            .backend
            .as_mut()
            .ok_or(AutomationError::DeviceUnavailable)?;
        let (axis, delta) = match direction {
            ScrollDirection::Up => (WheelAxis::Vertical, amount),
            ScrollDirection::Down => (WheelAxis::Vertical, -amount),
            ScrollDirection::Right => (WheelAxis::Horizontal, amount),
            ScrollDirection::Left => (WheelAxis::Horizontal, -amount),
        };
        backend.emit_wheel(axis, delta)?;
        Ok(())
    }
}

impl Default for InputInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
mod uinput {
    use super::{InputBackend, MouseButton, WheelAxis};
    use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
    use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};

    const DEVICE_NAME: &str = "clickd virtual pointer";

    /// Backend over a kernel uinput device. Dropping it unregisters the
    /// device.
    pub struct UinputBackend {
        device: VirtualDevice,
    }

    impl UinputBackend {
        pub fn new() -> std::io::Result<Self> {
            let mut keys = AttributeSet::<Key>::new();
            keys.insert(Key::BTN_LEFT);
            keys.insert(Key::BTN_RIGHT);
            keys.insert(Key::BTN_MIDDLE);
            let mut axes = AttributeSet::<RelativeAxisType>::new();
            axes.insert(RelativeAxisType::REL_WHEEL);
            axes.insert(RelativeAxisType::REL_HWHEEL);
            let device = VirtualDeviceBuilder::new()?
                .name(DEVICE_NAME)
                .with_keys(&keys)?
                .with_relative_axes(&axes)?
                .build()?;
            Ok(Self { device })
        }
    }

    fn key_for(button: MouseButton) -> Key {
        match button {
            MouseButton::Left => Key::BTN_LEFT,
            MouseButton::Right => Key::BTN_RIGHT,
            MouseButton::Middle => Key::BTN_MIDDLE,
        }
    }

    impl InputBackend for UinputBackend {
        fn emit_button(&mut self, button: MouseButton, pressed: bool) -> std::io::Result<()> {
            // emit() appends the synchronization report for us.
            self.device.emit(&[InputEvent::new(
                EventType::KEY,
                key_for(button).code(),
                i32::from(pressed),
            )])
        }

        fn emit_wheel(&mut self, axis: WheelAxis, delta: i32) -> std::io::Result<()> {
            let code = match axis {
                WheelAxis::Vertical => RelativeAxisType::REL_WHEEL.0,
                WheelAxis::Horizontal => RelativeAxisType::REL_HWHEEL.0,
            };
            self.device
                .emit(&[InputEvent::new(EventType::RELATIVE, code, delta)])
        }
    }
}

/// Recorded input event, for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmittedEvent {
    Button { button: MouseButton, pressed: bool },
    Wheel { axis: WheelAxis, delta: i32 },
}

/// Backend that records every event instead of injecting it.
#[derive(Default)]
pub struct RecordingBackend {
    events: Arc<Mutex<Vec<EmittedEvent>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded events, usable after the backend has
    /// been moved into an injector.
    pub fn events_handle(&self) -> Arc<Mutex<Vec<EmittedEvent>>> {
        self.events.clone()
    }
}

impl InputBackend for RecordingBackend {
    fn emit_button(&mut self, button: MouseButton, pressed: bool) -> std::io::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(EmittedEvent::Button { button, pressed });
        Ok(())
    }

    fn emit_wheel(&mut self, axis: WheelAxis, delta: i32) -> std::io::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(EmittedEvent::Wheel { axis, delta });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_injector() -> (InputInjector, Arc<Mutex<Vec<EmittedEvent>>>) {
        let backend = RecordingBackend::new();
        let events = backend.events_handle();
        (InputInjector::with_backend(Box::new(backend)), events)
    }

    #[tokio::test]
    async fn click_is_press_then_release() {
        let (mut injector, events) = recording_injector();
        injector.click(MouseButton::Left).await.unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                EmittedEvent::Button {
                    button: MouseButton::Left,
                    pressed: true
                },
                EmittedEvent::Button {
                    button: MouseButton::Left,
                    pressed: false
                },
            ]
        );
    }

    #[test]
    fn opposite_directions_produce_negated_deltas() {
        let (mut injector, events) = recording_injector();
        injector.scroll(ScrollDirection::Down, 3).unwrap();
        injector.scroll(ScrollDirection::Up, 3).unwrap();
        injector.scroll(ScrollDirection::Left, 2).unwrap();
        injector.scroll(ScrollDirection::Right, 2).unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                EmittedEvent::Wheel {
                    axis: WheelAxis::Vertical,
                    delta: -3
                },
                EmittedEvent::Wheel {
                    axis: WheelAxis::Vertical,
                    delta: 3
                },
                EmittedEvent::Wheel {
                    axis: WheelAxis::Horizontal,
                    delta: -2
                },
                EmittedEvent::Wheel {
                    axis: WheelAxis::Horizontal,
                    delta: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn unavailable_injector_reports_device_unavailable() {
        let mut injector = InputInjector::unavailable();
        assert!(!injector.available());
        let err = injector.click(MouseButton::Left).await.unwrap_err();
        assert_eq!(err.to_string(), "Input device unavailable");
        let err = injector.scroll(ScrollDirection::Down, 1).unwrap_err();
        assert_eq!(err.to_string(), "Input device unavailable");
    }
}
