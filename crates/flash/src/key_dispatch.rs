//! Key contexts describe where in the element tree a key event is being handled.
//!
//! Any element can declare a context with `.key_context("Editor mode=full")`. When a
//! key event arrives, the window walks the path from the root to the focused node and
//! collects the contexts it passes, outermost first. Handlers read that stack through
//! [`crate::Window::key_context_stack`] to decide whether a keystroke is meant for them:
//!
//! ```ignore
//! div()
//!     .track_focus(&focus_handle)
//!     .key_context("Menu")
//!     .on_key_down(cx.listener(|menu, event: &KeyDownEvent, cx| {
//!         if cx.window().key_context_stack().iter().any(|cx| cx.contains("Menu")) {
//!             menu.select_next(cx);
//!             return DispatchFlags::STOP_PROPAGATION;
//!         }
//!         DispatchFlags::empty()
//!     }))
//! ```
//!
//! Resolving keystrokes into bound actions is left to the embedding toolkit; this
//! module only maintains the stack the resolution runs against.

use crate::SharedString;
use smallvec::SmallVec;
use std::fmt;

/// A set of identifiers and key/value pairs attached to a node in the element tree.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyContext(SmallVec<[ContextEntry; 1]>);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ContextEntry {
    key: SharedString,
    value: Option<SharedString>,
}

impl KeyContext {
    pub fn new_with_defaults() -> Self {
        let mut context = Self::default();
        context.add("os");
        context
    }

    /// Parses a context from whitespace separated entries, either bare identifiers
    /// (`Editor`) or `key=value` pairs (`mode=full`).
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let mut context = Self::default();
        for entry in source.split_whitespace() {
            match entry.split_once('=') {
                Some((key, value)) => {
                    anyhow::ensure!(
                        !key.is_empty() && !value.is_empty(),
                        "invalid key context entry {entry:?}"
                    );
                    context.set(key.to_string(), value.to_string());
                }
                None => context.add(entry.to_string()),
            }
        }
        Ok(context)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds a bare identifier.
    pub fn add<I: Into<SharedString>>(&mut self, identifier: I) {
        let key = identifier.into();
        if !self.contains(&key) {
            self.0.push(ContextEntry { key, value: None })
        }
    }

    /// Sets a key to a value, replacing any previous value.
    pub fn set<S1: Into<SharedString>, S2: Into<SharedString>>(&mut self, key: S1, value: S2) {
        let key = key.into();
        let value = Some(value.into());
        match self.0.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = value,
            None => self.0.push(ContextEntry { key, value }),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|entry| entry.key.as_ref() == key)
    }

    pub fn get(&self, key: &str) -> Option<&SharedString> {
        self.0
            .iter()
            .find(|entry| entry.key.as_ref() == key)?
            .value
            .as_ref()
    }

    /// Merges another context into this one; entries from `other` win.
    pub fn extend(&mut self, other: &Self) {
        for entry in &other.0 {
            match &entry.value {
                Some(value) => self.set(entry.key.clone(), value.clone()),
                None => self.add(entry.key.clone()),
            }
        }
    }
}

impl TryFrom<&str> for KeyContext {
    type Error = anyhow::Error;

    fn try_from(source: &str) -> anyhow::Result<Self> {
        Self::parse(source)
    }
}

impl fmt::Debug for KeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = self.0.iter().peekable();
        while let Some(entry) = entries.next() {
            match &entry.value {
                Some(value) => write!(f, "{}={}", entry.key, value)?,
                None => write!(f, "{}", entry.key)?,
            }
            if entries.peek().is_some() {
                f.write_str(" ")?;
            }
        }
        Ok(())
    }
}

/// Whether any context in `stack` contains `key`, searching innermost first.
pub fn context_stack_contains(stack: &[KeyContext], key: &str) -> bool {
    stack.iter().rev().any(|context| context.contains(key))
}

/// The innermost value of `key` in `stack`.
pub fn context_stack_get<'a>(stack: &'a [KeyContext], key: &str) -> Option<&'a SharedString> {
    stack.iter().rev().find_map(|context| context.get(key))
}
