//! Content painted above the element tree: tooltips, popovers and modal dialogs.
//!
//! Elements register overlays during prepaint. The window lays each one out as a
//! separate root once the main tree has been prepainted, places it next to its trigger,
//! and paints it after everything else. Menu state that has to survive from one frame to
//! the next lives in [`MenuSession`]s owned by the window's [`OverlayManager`].

use crate::{
    AnyElement, App, Bounds, GlobalElementId, Pixels, Point, SharedString, Size, Window, point,
    px,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::{
    fmt,
    rc::Rc,
    time::{Duration, Instant},
};

/// Builds overlay content each frame it is shown.
pub type OverlayBuilder = Rc<dyn Fn(&mut Window, &mut App) -> AnyElement>;

/// Runs when a modal's backdrop is clicked.
pub type DismissHandler = Rc<dyn Fn(&mut Window, &mut App)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Shown while the trigger is hovered. Never receives input.
    Tooltip,
    /// Anchored to its trigger. Children may extend past it, like submenus.
    Popover,
    /// Centered in the window above a backdrop that blocks input to the content
    /// beneath.
    Modal,
}

/// Where an overlay goes relative to its trigger. When the overlay does not fit in the
/// window on that side it is flipped to the opposite one, then shifted to stay inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    #[default]
    Below,
    Above,
    Right,
    Left,
}

impl Placement {
    fn flipped(self) -> Self {
        match self {
            Placement::Below => Placement::Above,
            Placement::Above => Placement::Below,
            Placement::Right => Placement::Left,
            Placement::Left => Placement::Right,
        }
    }

    fn origin(self, trigger: Bounds<Pixels>, size: Size<Pixels>, gap: Pixels) -> Point<Pixels> {
        match self {
            Placement::Below => point(trigger.left(), trigger.bottom() + gap),
            Placement::Above => point(trigger.left(), trigger.top() - gap - size.height),
            Placement::Right => point(trigger.right() + gap, trigger.top()),
            Placement::Left => point(trigger.left() - gap - size.width, trigger.top()),
        }
    }
}

/// Positions an overlay of `size` next to `trigger` inside `viewport`.
pub fn place_overlay(
    trigger: Bounds<Pixels>,
    placement: Placement,
    gap: Pixels,
    size: Size<Pixels>,
    viewport: Bounds<Pixels>,
) -> Bounds<Pixels> {
    let fits = |bounds: &Bounds<Pixels>| viewport.contains_bounds(bounds);
    let mut bounds = Bounds::new(placement.origin(trigger, size, gap), size);
    if !fits(&bounds) {
        let flipped = Bounds::new(placement.flipped().origin(trigger, size, gap), size);
        if fits(&flipped) {
            bounds = flipped;
        }
    }

    if bounds.right() > viewport.right() {
        bounds.origin.x -= bounds.right() - viewport.right();
    }
    if bounds.bottom() > viewport.bottom() {
        bounds.origin.y -= bounds.bottom() - viewport.bottom();
    }
    bounds.origin.x = bounds.origin.x.max(viewport.left());
    bounds.origin.y = bounds.origin.y.max(viewport.top());
    bounds
}

/// An overlay registered during prepaint for the current frame.
pub(crate) struct OverlayRequest {
    pub owner: GlobalElementId,
    pub kind: OverlayKind,
    pub trigger: Bounds<Pixels>,
    pub placement: Placement,
    pub element: AnyElement,
    pub on_dismiss: Option<DismissHandler>,
}

impl fmt::Debug for OverlayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayRequest")
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// An overlay that was laid out and prepainted this frame, waiting to be painted.
pub(crate) struct PreparedOverlay {
    pub kind: OverlayKind,
    pub bounds: Bounds<Pixels>,
    pub element: AnyElement,
}

/// Per-window overlay registrations and menu sessions.
#[derive(Default)]
pub struct OverlayManager {
    pending: Vec<OverlayRequest>,
    pub(crate) prepared: Vec<PreparedOverlay>,
    owners: FxHashMap<GlobalElementId, OverlayKind>,
    sessions: FxHashMap<SharedString, MenuSession>,
    rendered_sessions: SmallVec<[SharedString; 2]>,
}

impl OverlayManager {
    pub(crate) fn begin_frame(&mut self) {
        self.pending.clear();
        self.prepared.clear();
        self.owners.clear();
        self.rendered_sessions.clear();
    }

    /// Registers an overlay owned by the element `request.owner`. An element owns at
    /// most one overlay of each kind per frame; later registrations replace earlier
    /// ones.
    pub(crate) fn register(&mut self, request: OverlayRequest) {
        if self.owners.get(&request.owner) == Some(&request.kind) {
            self.pending
                .retain(|pending| !(pending.owner == request.owner && pending.kind == request.kind));
        }
        log::trace!("overlay registered: {request:?}");
        self.owners.insert(request.owner.clone(), request.kind);
        self.pending.push(request);
    }

    /// The next registration to lay out, in registration order.
    pub(crate) fn take_next(&mut self) -> Option<OverlayRequest> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    pub fn has_modal(&self) -> bool {
        self.prepared
            .iter()
            .any(|overlay| overlay.kind == OverlayKind::Modal)
    }

    /// Bounds of the overlays shown in the last frame, in paint order.
    pub fn overlay_bounds(&self) -> impl Iterator<Item = (OverlayKind, Bounds<Pixels>)> + '_ {
        self.prepared
            .iter()
            .map(|overlay| (overlay.kind, overlay.bounds))
    }

    /// The session for the menu `id`, created closed on first use.
    pub fn menu_session(&mut self, id: impl Into<SharedString>) -> &mut MenuSession {
        let id = id.into();
        if !self.rendered_sessions.contains(&id) {
            self.rendered_sessions.push(id.clone());
        }
        self.sessions.entry(id).or_default()
    }

    pub fn read_menu_session(&self, id: &str) -> Option<&MenuSession> {
        self.sessions.get(id)
    }

    pub fn close_menu(&mut self, id: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.close();
        }
    }

    /// Drops the sessions of menus that were not drawn this frame.
    pub(crate) fn end_frame(&mut self) {
        let rendered = &self.rendered_sessions;
        self.sessions.retain(|id, _| rendered.contains(id));
    }
}

impl fmt::Debug for OverlayManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayManager")
            .field("pending", &self.pending.len())
            .field("prepared", &self.prepared.len())
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Time a pointer heading toward an open submenu may spend over other items before
/// the submenu closes.
pub const SUBMENU_GRACE_PERIOD: Duration = Duration::from_millis(300);

/// Interaction state of one open dropdown or context menu.
#[derive(Clone, Debug, Default)]
pub struct MenuSession {
    open: bool,
    /// Indices of the expanded submenu items, outermost first.
    open_path: SmallVec<[usize; 4]>,
    /// Depth and index of the item under the pointer.
    hovered: Option<(usize, usize)>,
    last_cursor: Option<Point<Pixels>>,
    hovered_at: Option<Instant>,
}

impl MenuSession {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        *self = MenuSession::default();
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn open_path(&self) -> &[usize] {
        &self.open_path
    }

    pub fn hovered(&self) -> Option<(usize, usize)> {
        self.hovered
    }

    /// Whether the submenu of the item at `index` in the menu at `depth` is expanded.
    pub fn is_submenu_open(&self, depth: usize, index: usize) -> bool {
        self.open_path.get(depth) == Some(&index)
    }

    /// Records the pointer over the item at `index` of the menu at `depth`. Returns
    /// whether the session changed.
    ///
    /// While the pointer keeps moving toward an expanded submenu the change is ignored
    /// for [`SUBMENU_GRACE_PERIOD`], so crossing a neighboring item on the way does not
    /// close it.
    pub fn hover(
        &mut self,
        depth: usize,
        index: usize,
        has_submenu: bool,
        position: Point<Pixels>,
        now: Instant,
    ) -> bool {
        let previous_cursor = self.last_cursor.replace(position);
        if self.hovered == Some((depth, index)) {
            return false;
        }

        let heading_into_submenu = self.open_path.len() > depth
            && previous_cursor.is_some_and(|previous| position.x > previous.x)
            && self
                .hovered_at
                .is_some_and(|hovered_at| now.duration_since(hovered_at) < SUBMENU_GRACE_PERIOD);
        if heading_into_submenu {
            return false;
        }

        self.hovered = Some((depth, index));
        self.hovered_at = Some(now);
        self.open_path.truncate(depth);
        if has_submenu {
            self.open_path.push(index);
        }
        true
    }
}

/// One entry of a menu.
#[derive(Clone)]
pub enum MenuItem {
    Action {
        label: SharedString,
        disabled: bool,
        handler: Rc<dyn Fn(&mut Window, &mut App)>,
    },
    Toggle {
        label: SharedString,
        checked: bool,
        handler: Rc<dyn Fn(bool, &mut Window, &mut App)>,
    },
    Submenu {
        label: SharedString,
        items: Vec<MenuItem>,
    },
    Header(SharedString),
    Separator,
}

impl MenuItem {
    pub fn action(
        label: impl Into<SharedString>,
        handler: impl Fn(&mut Window, &mut App) + 'static,
    ) -> Self {
        MenuItem::Action {
            label: label.into(),
            disabled: false,
            handler: Rc::new(handler),
        }
    }

    pub fn toggle(
        label: impl Into<SharedString>,
        checked: bool,
        handler: impl Fn(bool, &mut Window, &mut App) + 'static,
    ) -> Self {
        MenuItem::Toggle {
            label: label.into(),
            checked,
            handler: Rc::new(handler),
        }
    }

    pub fn submenu(label: impl Into<SharedString>, items: Vec<MenuItem>) -> Self {
        MenuItem::Submenu {
            label: label.into(),
            items,
        }
    }

    pub fn disabled(mut self) -> Self {
        if let MenuItem::Action { disabled, .. } = &mut self {
            *disabled = true;
        }
        self
    }

    pub fn label(&self) -> Option<&SharedString> {
        match self {
            MenuItem::Action { label, .. }
            | MenuItem::Toggle { label, .. }
            | MenuItem::Submenu { label, .. }
            | MenuItem::Header(label) => Some(label),
            MenuItem::Separator => None,
        }
    }

    /// Whether the pointer can interact with this item.
    pub fn is_interactive(&self) -> bool {
        match self {
            MenuItem::Action { disabled, .. } => !disabled,
            MenuItem::Toggle { .. } | MenuItem::Submenu { .. } => true,
            MenuItem::Header(_) | MenuItem::Separator => false,
        }
    }

    pub fn has_submenu(&self) -> bool {
        matches!(self, MenuItem::Submenu { .. })
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Action {
                label, disabled, ..
            } => f
                .debug_struct("Action")
                .field("label", label)
                .field("disabled", disabled)
                .finish(),
            MenuItem::Toggle { label, checked, .. } => f
                .debug_struct("Toggle")
                .field("label", label)
                .field("checked", checked)
                .finish(),
            MenuItem::Submenu { label, items } => f
                .debug_struct("Submenu")
                .field("label", label)
                .field("items", items)
                .finish(),
            MenuItem::Header(label) => f.debug_tuple("Header").field(label).finish(),
            MenuItem::Separator => f.write_str("Separator"),
        }
    }
}

/// Gap between a popover and its trigger.
pub(crate) const POPOVER_GAP: Pixels = px(4.);
