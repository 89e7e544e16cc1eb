use crate::{
    AnyElement, App, Context, DispatchResult, Empty, FrameStats, IntoElement, KeyDownEvent,
    KeyUpEvent, Keystroke, Modifiers, MouseButton, MouseDownEvent, MouseMoveEvent, MouseUpEvent,
    PlatformInput, Pixels, Point, Render, ScrollWheelEvent, TestPlatform, TextInputEvent, View,
    ViewContext, Window, WindowId, WindowOptions,
};
use derive_more::{Deref, DerefMut};
use std::rc::Rc;

/// An [`App`] running on a [`TestPlatform`], with helpers to open windows, feed input
/// and run frames. Derefs to the app.
#[derive(Deref, DerefMut)]
pub struct TestAppContext {
    #[deref]
    #[deref_mut]
    app: App,
    platform: Rc<TestPlatform>,
}

impl Default for TestAppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppContext {
    pub fn new() -> Self {
        #[cfg(test)]
        env_logger::builder().is_test(true).try_init().ok();

        let platform = TestPlatform::new();
        Self {
            app: App::new(platform.clone()),
            platform,
        }
    }

    pub fn platform(&self) -> &Rc<TestPlatform> {
        &self.platform
    }

    /// Opens a window whose root view renders nothing.
    pub fn open_empty_window(&mut self) -> WindowId {
        self.open_window_with(|| Empty)
    }

    /// Opens a window whose root view renders the element returned by `render`.
    pub fn open_window_with<E: IntoElement>(
        &mut self,
        render: impl Fn() -> E + 'static,
    ) -> WindowId {
        let render = move || render().into_any_element();
        self.add_window_view(move |_, _| RenderFn(Box::new(render)))
            .1
    }

    /// Opens a window with `build`'s view as its root.
    pub fn add_window_view<V: Render>(
        &mut self,
        build: impl FnOnce(&mut Window, &mut Context<V>) -> V,
    ) -> (View<V>, WindowId) {
        let mut root = None;
        let window_id = self
            .app
            .open_window(WindowOptions::default(), |window, cx| {
                let view = cx.new_view(|cx| build(window, cx));
                root = Some(view);
                view
            })
            .expect("test platform failed to open a window");
        let root = root.expect("root view was not built");
        (root, window_id)
    }

    /// Runs an animation frame the way a platform shell would after its frame
    /// callback fires.
    pub fn run_frame(&mut self) -> FrameStats {
        self.platform.take_frame_requests();
        self.app.on_animation_frame()
    }

    pub fn simulate_input(&mut self, window_id: WindowId, input: PlatformInput) -> DispatchResult {
        self.app
            .dispatch_input(window_id, input)
            .expect("window was closed")
    }

    pub fn simulate_mouse_move(&mut self, window_id: WindowId, position: Point<Pixels>) {
        self.simulate_input(
            window_id,
            PlatformInput::MouseMove(MouseMoveEvent {
                position,
                pressed_button: None,
                modifiers: Modifiers::none(),
            }),
        );
    }

    pub fn simulate_mouse_down(
        &mut self,
        window_id: WindowId,
        position: Point<Pixels>,
    ) -> DispatchResult {
        self.simulate_input(
            window_id,
            PlatformInput::MouseDown(MouseDownEvent {
                button: MouseButton::Left,
                position,
                modifiers: Modifiers::none(),
                click_count: 1,
            }),
        )
    }

    pub fn simulate_mouse_up(
        &mut self,
        window_id: WindowId,
        position: Point<Pixels>,
    ) -> DispatchResult {
        self.simulate_input(
            window_id,
            PlatformInput::MouseUp(MouseUpEvent {
                button: MouseButton::Left,
                position,
                modifiers: Modifiers::none(),
            }),
        )
    }

    /// Moves the pointer to `position`, then presses and releases the left button
    /// there. Returns the result of the mouse up, which carries the click.
    pub fn simulate_click(&mut self, window_id: WindowId, position: Point<Pixels>) -> DispatchResult {
        self.simulate_mouse_move(window_id, position);
        self.simulate_mouse_down(window_id, position);
        self.simulate_mouse_up(window_id, position)
    }

    pub fn simulate_scroll(
        &mut self,
        window_id: WindowId,
        position: Point<Pixels>,
        delta: Point<Pixels>,
    ) -> DispatchResult {
        self.simulate_input(
            window_id,
            PlatformInput::ScrollWheel(ScrollWheelEvent {
                position,
                delta,
                modifiers: Modifiers::none(),
            }),
        )
    }

    /// Presses and releases each space separated keystroke, e.g. `"tab shift-tab a"`.
    /// Keystrokes that produce a character also deliver it as text input.
    pub fn simulate_keystrokes(&mut self, window_id: WindowId, keystrokes: &str) {
        for source in keystrokes.split_whitespace() {
            let keystroke = Keystroke::parse(source)
                .unwrap_or_else(|error| panic!("invalid keystroke {source:?}: {error}"));
            let down = self.simulate_input(
                window_id,
                PlatformInput::KeyDown(KeyDownEvent {
                    keystroke: keystroke.clone(),
                    is_held: false,
                }),
            );
            if !down.default_prevented
                && let Some(text) = keystroke.key_char.clone()
            {
                self.simulate_input(
                    window_id,
                    PlatformInput::TextInput(TextInputEvent {
                        text,
                        composing: false,
                    }),
                );
            }
            self.simulate_input(window_id, PlatformInput::KeyUp(KeyUpEvent { keystroke }));
        }
    }
}

struct RenderFn(Box<dyn Fn() -> AnyElement>);

impl Render for RenderFn {
    fn render(&mut self, _cx: &mut ViewContext<Self>) -> impl IntoElement {
        (self.0)()
    }
}
