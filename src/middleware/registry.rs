//! Middleware registry: collects candidates and their priorities at startup.

use std::fmt;

use super::MiddlewareHandler;

/// Priority given to middleware registered without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// One registered middleware.
///
/// Lower priorities run earlier in request processing. `sequence` is the
/// registration index and breaks ties between equal priorities.
#[derive(Clone)]
pub struct MiddlewareEntry {
    name: String,
    handler: MiddlewareHandler,
    priority: i32,
    sequence: usize,
}

impl MiddlewareEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn handler(&self) -> &MiddlewareHandler {
        &self.handler
    }

    pub fn into_handler(self) -> MiddlewareHandler {
        self.handler
    }
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Append-only list of middleware candidates.
///
/// Registration never fails and duplicates are allowed. Registration is
/// expected to happen on one thread during bootstrap, so the sequence
/// numbers reflect a single, well-defined order.
///
/// # Examples
///
/// ```rust
/// use webwire::middleware::{MiddlewareRegistry, Next, from_fn};
///
/// let mut registry = MiddlewareRegistry::new();
/// registry.register("audit", from_fn(|ctx, next: Next| next.run(ctx)));
/// registry.register_with_priority("auth", from_fn(|ctx, next: Next| next.run(ctx)), 5);
///
/// assert_eq!(registry.len(), 2);
/// assert_eq!(registry.entries()[0].priority(), 10);
/// ```
#[derive(Debug, Default)]
pub struct MiddlewareRegistry {
    entries: Vec<MiddlewareEntry>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` with [`DEFAULT_PRIORITY`].
    pub fn register(&mut self, name: impl Into<String>, handler: MiddlewareHandler) {
        self.register_with_priority(name, handler, DEFAULT_PRIORITY);
    }

    pub fn register_with_priority(
        &mut self,
        name: impl Into<String>,
        handler: MiddlewareHandler,
        priority: i32,
    ) {
        let sequence = self.entries.len();
        self.entries.push(MiddlewareEntry {
            name: name.into(),
            handler,
            priority,
            sequence,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[MiddlewareEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<MiddlewareEntry> {
        self.entries
    }
}
