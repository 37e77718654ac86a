//! Local desktop automation service for Linux.
//!
//! `clickd` scans the focused window's accessibility tree for clickable
//! elements, caches them in a versioned snapshot with opaque ids, and
//! executes click and scroll commands against that snapshot. Commands
//! arrive over a unix-domain socket as length-prefixed JSON frames.
//!
//! The element tree comes from AT-SPI; clicks prefer the element's own
//! accessibility action and fall back to a virtual uinput pointer, which
//! also handles scrolling.
//!
//! # Example
//!
//! ```no_run
//! use clickd::{CommandDispatcher, InputInjector, Server, TreeScanner};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = clickd::platforms::create_engine().await.ok();
//!     let dispatcher =
//!         CommandDispatcher::new(TreeScanner::new(engine), InputInjector::new());
//!     let server = Server::bind(&clickd::default_socket_path())?;
//!     server.serve(dispatcher, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod dispatcher;
pub mod element;
pub mod errors;
pub mod input;
pub mod platforms;
pub mod protocol;
pub mod scanner;
pub mod server;

pub use actions::{ActionResolver, ClickMethod, ClickOutcome};
pub use dispatcher::CommandDispatcher;
pub use element::{ElementRecord, ElementRole, ElementState, ScanSnapshot, UIElement};
pub use errors::AutomationError;
pub use input::{InputInjector, MouseButton, ScrollDirection};
pub use protocol::{Request, Response, MAX_FRAME_LEN};
pub use scanner::{ScanOutcome, TraversalReport, TreeScanner};
pub use server::{default_socket_path, Server};
