use std::{borrow::Borrow, fmt, ops::Deref, rc::Rc};

/// A cheaply clonable string used for labels, ids and glyph runs.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SharedString(Rc<str>);

impl SharedString {
    pub fn new(text: impl AsRef<str>) -> Self {
        SharedString(Rc::from(text.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SharedString {
    fn default() -> Self {
        SharedString(Rc::from(""))
    }
}

impl Deref for SharedString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SharedString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(text: &str) -> Self {
        SharedString(Rc::from(text))
    }
}

impl From<String> for SharedString {
    fn from(text: String) -> Self {
        SharedString(Rc::from(text))
    }
}

impl From<&String> for SharedString {
    fn from(text: &String) -> Self {
        SharedString(Rc::from(text.as_str()))
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}
