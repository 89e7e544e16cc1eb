#[cfg(any(test, feature = "test-support"))]
mod test;

#[cfg(any(test, feature = "test-support"))]
pub use test::*;

use crate::{
    CursorStyle, Hsla, Pixels, RenderError, Scene, SharedString, Size, TextSystem,
    WindowAppearance, WindowId, px, size, white,
};
use std::rc::Rc;

/// The operating system shell the runtime is embedded in.
///
/// The platform never calls back into the [`crate::App`]. Instead the embedder forwards
/// animation frames to [`crate::App::on_animation_frame`] and raw input to
/// [`crate::App::dispatch_input`].
pub trait Platform {
    fn open_window(
        &self,
        id: WindowId,
        options: &WindowOptions,
    ) -> anyhow::Result<Box<dyn PlatformWindow>>;

    /// Asks for an animation frame for `window`. Requests are coalesced until the
    /// frame runs.
    fn request_animation_frame(&self, window: WindowId);

    fn cancel_animation_frame(&self, window: WindowId);

    fn text_system(&self) -> Rc<dyn TextSystem>;

    fn appearance(&self) -> WindowAppearance;

    fn read_from_clipboard(&self) -> Option<String>;

    fn write_to_clipboard(&self, text: String);
}

/// A native window and the surface its scenes are presented on.
pub trait PlatformWindow {
    fn content_size(&self) -> Size<Pixels>;

    fn scale_factor(&self) -> f32;

    fn set_title(&mut self, title: &str);

    fn set_cursor_style(&mut self, cursor: CursorStyle);

    /// The renderer drawing into this window, if one could be created.
    fn renderer(&mut self) -> Option<&mut dyn Renderer>;
}

/// Rasterizes scenes. Implementations acquire their graphics device in
/// [`Renderer::initialize`] and report a lost device from [`Renderer::draw`], after which
/// the window calls `initialize` again before the next frame.
pub trait Renderer {
    fn initialize(&mut self) -> anyhow::Result<()>;

    fn is_initialized(&self) -> bool;

    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError>;
}

/// Settings for a newly opened window.
#[derive(Clone, Debug)]
pub struct WindowOptions {
    pub title: SharedString,
    /// The initial content size. The platform picks one when `None`.
    pub size: Option<Size<Pixels>>,
    /// Whether elements in this window may take keyboard focus.
    pub focus_enabled: bool,
    /// Cleared to this color before the root view paints.
    pub background: Hsla,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "flash".into(),
            size: None,
            focus_enabled: true,
            background: white(),
        }
    }
}

pub(crate) const DEFAULT_WINDOW_SIZE: Size<Pixels> = size(px(800.), px(600.));
