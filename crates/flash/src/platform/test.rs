use crate::{
    CursorStyle, MonospaceTextSystem, Pixels, Platform, PlatformWindow, RenderError, Renderer,
    Scene, Size, TextSystem, WindowAppearance, WindowId, WindowOptions,
    platform::DEFAULT_WINDOW_SIZE,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{cell::RefCell, rc::Rc};

/// A headless platform for tests. Windows record every scene they present.
pub struct TestPlatform {
    state: RefCell<TestPlatformState>,
    text_system: Rc<MonospaceTextSystem>,
}

#[derive(Default)]
struct TestPlatformState {
    windows: FxHashMap<WindowId, Rc<RefCell<TestWindowState>>>,
    requested_frames: FxHashSet<WindowId>,
    animation_frame_requests: usize,
    clipboard: Option<String>,
    appearance: WindowAppearance,
    fail_window_creation: bool,
    skip_renderer: bool,
}

/// Observable state of a [`TestWindow`].
#[derive(Debug)]
pub struct TestWindowState {
    pub size: Size<Pixels>,
    pub scale_factor: f32,
    pub title: String,
    pub cursor: CursorStyle,
    pub presented: Vec<Scene>,
    pub renderer_initialized: bool,
    pub initialize_count: usize,
    /// The next draw reports a lost device.
    pub lose_device: bool,
}

impl TestPlatform {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::default(),
            text_system: Rc::new(MonospaceTextSystem::default()),
        })
    }

    pub fn window(&self, id: WindowId) -> Option<Rc<RefCell<TestWindowState>>> {
        self.state.borrow().windows.get(&id).cloned()
    }

    /// Number of scenes presented by `id` so far.
    pub fn presented_frames(&self, id: WindowId) -> usize {
        self.window(id)
            .map_or(0, |window| window.borrow().presented.len())
    }

    pub fn has_pending_frame(&self, id: WindowId) -> bool {
        self.state.borrow().requested_frames.contains(&id)
    }

    pub fn animation_frame_requests(&self) -> usize {
        self.state.borrow().animation_frame_requests
    }

    /// Clears pending animation frame requests, as a shell does before running a frame.
    pub fn take_frame_requests(&self) -> Vec<WindowId> {
        self.state.borrow_mut().requested_frames.drain().collect()
    }

    pub fn set_appearance(&self, appearance: WindowAppearance) {
        self.state.borrow_mut().appearance = appearance;
    }

    pub fn fail_window_creation(&self, fail: bool) {
        self.state.borrow_mut().fail_window_creation = fail;
    }

    /// New windows come without a renderer.
    pub fn skip_renderer(&self, skip: bool) {
        self.state.borrow_mut().skip_renderer = skip;
    }
}

impl Platform for TestPlatform {
    fn open_window(
        &self,
        id: WindowId,
        options: &WindowOptions,
    ) -> anyhow::Result<Box<dyn PlatformWindow>> {
        let mut state = self.state.borrow_mut();
        anyhow::ensure!(!state.fail_window_creation, "window creation disabled");
        let window_state = Rc::new(RefCell::new(TestWindowState {
            size: options.size.unwrap_or(DEFAULT_WINDOW_SIZE),
            scale_factor: 2.,
            title: options.title.to_string(),
            cursor: CursorStyle::Arrow,
            presented: Vec::new(),
            renderer_initialized: false,
            initialize_count: 0,
            lose_device: false,
        }));
        state.windows.insert(id, window_state.clone());
        let renderer = (!state.skip_renderer).then(|| TestRenderer {
            state: window_state.clone(),
        });
        Ok(Box::new(TestWindow {
            state: window_state,
            renderer,
        }))
    }

    fn request_animation_frame(&self, window: WindowId) {
        let mut state = self.state.borrow_mut();
        state.animation_frame_requests += 1;
        state.requested_frames.insert(window);
    }

    fn cancel_animation_frame(&self, window: WindowId) {
        self.state.borrow_mut().requested_frames.remove(&window);
    }

    fn text_system(&self) -> Rc<dyn TextSystem> {
        self.text_system.clone()
    }

    fn appearance(&self) -> WindowAppearance {
        self.state.borrow().appearance
    }

    fn read_from_clipboard(&self) -> Option<String> {
        self.state.borrow().clipboard.clone()
    }

    fn write_to_clipboard(&self, text: String) {
        self.state.borrow_mut().clipboard = Some(text);
    }
}

pub struct TestWindow {
    state: Rc<RefCell<TestWindowState>>,
    renderer: Option<TestRenderer>,
}

impl PlatformWindow for TestWindow {
    fn content_size(&self) -> Size<Pixels> {
        self.state.borrow().size
    }

    fn scale_factor(&self) -> f32 {
        self.state.borrow().scale_factor
    }

    fn set_title(&mut self, title: &str) {
        self.state.borrow_mut().title = title.to_string();
    }

    fn set_cursor_style(&mut self, cursor: CursorStyle) {
        self.state.borrow_mut().cursor = cursor;
    }

    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        self.renderer
            .as_mut()
            .map(|renderer| renderer as &mut dyn Renderer)
    }
}

pub struct TestRenderer {
    state: Rc<RefCell<TestWindowState>>,
}

impl Renderer for TestRenderer {
    fn initialize(&mut self) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        state.renderer_initialized = true;
        state.initialize_count += 1;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.borrow().renderer_initialized
    }

    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        if !state.renderer_initialized {
            return Err(RenderError::NotInitialized);
        }
        if state.lose_device {
            state.lose_device = false;
            state.renderer_initialized = false;
            return Err(RenderError::DeviceLost);
        }
        state.presented.push(scene.clone());
        Ok(())
    }
}
