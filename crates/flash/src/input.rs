//! Raw platform input and the typed events delivered to element handlers.

use crate::{Pixels, Point, SharedString, Size};
use std::fmt;

/// The keyboard modifiers held while an event occurred.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
    /// Command on macOS, the Windows key on Windows, Super on Linux.
    pub platform: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn modified(&self) -> bool {
        self.control || self.alt || self.shift || self.platform
    }
}

/// A key press together with its modifiers, e.g. `ctrl-shift-a`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub modifiers: Modifiers,
    /// The key name without modifiers, lowercased (`"a"`, `"tab"`, `"enter"`).
    pub key: SharedString,
    /// The text this keystroke produces, if any.
    pub key_char: Option<String>,
}

impl Keystroke {
    /// Parses a `-` separated keystroke such as `cmd-shift-p`. The last component is
    /// the key.
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let mut modifiers = Modifiers::default();
        let mut key = None;
        let mut components = source.split('-').peekable();
        while let Some(component) = components.next() {
            if components.peek().is_none() {
                key = Some(component.to_lowercase());
                break;
            }
            match component {
                "ctrl" => modifiers.control = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "cmd" | "super" | "win" => modifiers.platform = true,
                other => anyhow::bail!("invalid modifier {other:?} in keystroke {source:?}"),
            }
        }
        let key = key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow::anyhow!("keystroke {source:?} has no key"))?;
        let key_char = (key.chars().count() == 1 && !modifiers.control && !modifiers.platform)
            .then(|| {
                if modifiers.shift {
                    key.to_uppercase()
                } else {
                    key.clone()
                }
            });
        Ok(Keystroke {
            modifiers,
            key: key.into(),
            key_char,
        })
    }
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.control {
            f.write_str("ctrl-")?;
        }
        if self.modifiers.alt {
            f.write_str("alt-")?;
        }
        if self.modifiers.shift {
            f.write_str("shift-")?;
        }
        if self.modifiers.platform {
            f.write_str("cmd-")?;
        }
        f.write_str(&self.key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MouseDownEvent {
    pub button: MouseButton,
    pub position: Point<Pixels>,
    pub modifiers: Modifiers,
    pub click_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MouseUpEvent {
    pub button: MouseButton,
    pub position: Point<Pixels>,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MouseMoveEvent {
    pub position: Point<Pixels>,
    pub pressed_button: Option<MouseButton>,
    pub modifiers: Modifiers,
}

/// Synthesized when a mouse down and the following mouse up land on the same node.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickEvent {
    pub down: MouseDownEvent,
    pub up: MouseUpEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MouseEnterEvent {
    pub position: Point<Pixels>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MouseLeaveEvent {
    pub position: Point<Pixels>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScrollWheelEvent {
    pub position: Point<Pixels>,
    /// Positive values scroll content toward its end.
    pub delta: Point<Pixels>,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyDownEvent {
    pub keystroke: Keystroke,
    pub is_held: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyUpEvent {
    pub keystroke: Keystroke,
}

/// Committed or in-progress text from the platform input method.
#[derive(Clone, Debug, PartialEq)]
pub struct TextInputEvent {
    pub text: String,
    /// True while an input method composition is still in progress.
    pub composing: bool,
}

/// The system color scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowAppearance {
    #[default]
    Light,
    Dark,
}

/// Input delivered by the platform shell to a window.
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformInput {
    MouseDown(MouseDownEvent),
    MouseUp(MouseUpEvent),
    MouseMove(MouseMoveEvent),
    ScrollWheel(ScrollWheelEvent),
    KeyDown(KeyDownEvent),
    KeyUp(KeyUpEvent),
    TextInput(TextInputEvent),
    Resize(Size<Pixels>),
    ActiveStatusChanged(bool),
    AppearanceChanged(WindowAppearance),
    Close,
}

impl PlatformInput {
    pub fn mouse_position(&self) -> Option<Point<Pixels>> {
        match self {
            PlatformInput::MouseDown(event) => Some(event.position),
            PlatformInput::MouseUp(event) => Some(event.position),
            PlatformInput::MouseMove(event) => Some(event.position),
            PlatformInput::ScrollWheel(event) => Some(event.position),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Option<Modifiers> {
        match self {
            PlatformInput::MouseDown(event) => Some(event.modifiers),
            PlatformInput::MouseUp(event) => Some(event.modifiers),
            PlatformInput::MouseMove(event) => Some(event.modifiers),
            PlatformInput::ScrollWheel(event) => Some(event.modifiers),
            PlatformInput::KeyDown(event) => Some(event.keystroke.modifiers),
            PlatformInput::KeyUp(event) => Some(event.keystroke.modifiers),
            _ => None,
        }
    }
}

/// What happened to an input event after dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchResult {
    /// No handler stopped propagation.
    pub propagate: bool,
    /// A handler asked to suppress the default action.
    pub default_prevented: bool,
    /// At least one handler saw the event.
    pub handled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keystroke() {
        let keystroke = Keystroke::parse("ctrl-shift-Tab").unwrap();
        assert!(keystroke.modifiers.control && keystroke.modifiers.shift);
        assert_eq!(&*keystroke.key, "tab");
        assert_eq!(keystroke.key_char, None);
        assert_eq!(keystroke.to_string(), "ctrl-shift-tab");

        let keystroke = Keystroke::parse("shift-a").unwrap();
        assert_eq!(keystroke.key_char.as_deref(), Some("A"));

        assert!(Keystroke::parse("hyper-a").is_err());
        assert!(Keystroke::parse("ctrl-").is_err());
    }
}
