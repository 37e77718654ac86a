//! Maps decoded requests onto the scanner, the latest snapshot, and the
//! input injector.
//!
//! The dispatcher holds the only mutable service state: the current
//! snapshot and its generation counter. Each SCAN replaces the snapshot
//! wholesale, so element ids are only ever valid against the scan that
//! produced them.

use crate::actions::{ActionResolver, ClickOutcome};
use crate::element::ScanSnapshot;
use crate::errors::AutomationError;
use crate::input::InputInjector;
use crate::protocol::{Request, Response};
use crate::scanner::TreeScanner;
use tracing::{info, warn};

pub struct CommandDispatcher {
    scanner: TreeScanner,
    resolver: ActionResolver,
    injector: InputInjector,
    snapshot: ScanSnapshot,
    generation: u64,
}

impl CommandDispatcher {
    pub fn new(scanner: TreeScanner, injector: InputInjector) -> Self {
        Self {
            scanner,
            resolver: ActionResolver::new(),
            injector,
            snapshot: ScanSnapshot::empty(0),
            generation: 0,
        }
    }

    /// Execute one request against the current state. Always produces a
    /// response; command failures become error responses, never panics.
    pub async fn dispatch(&mut self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::Scan => self.scan().await,
            Request::Click { id } => self.click(&id).await,
            Request::Scroll { direction, amount } => {
                info!(%direction, amount, "scroll requested");
                match self.injector.scroll(direction, amount) {
                    Ok(()) => Response::success(),
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::Unknown(command) => {
                warn!(command, "unknown command");
                Response::error(AutomationError::UnknownCommand(command).to_string())
            }
        }
    }

    async fn scan(&mut self) -> Response {
        self.generation += 1;
        let outcome = self.scanner.scan(self.generation).await;
        self.snapshot = outcome.snapshot;
        Response::elements(self.snapshot.records().to_vec())
    }

    async fn click(&mut self, id: &str) -> Response {
        // Clone the handle so the snapshot borrow ends before the
        // injector is borrowed mutably.
        let Some(element) = self.snapshot.handle(id).cloned() else {
            warn!(id, generation = self.snapshot.generation(), "click on unknown id");
            return Response::error(AutomationError::ElementNotFound(id.to_string()).to_string());
        };
        info!(id, "click requested");
        match self.resolver.click(&element, &mut self.injector).await {
            ClickOutcome::Performed(method) => {
                info!(id, ?method, "click performed");
                Response::success()
            }
            ClickOutcome::Unavailable => {
                Response::error(AutomationError::ActionUnavailable(id.to_string()).to_string())
            }
            ClickOutcome::Failed(reason) => {
                warn!(id, reason, "click failed");
                Response::error(reason)
            }
        }
    }
}
