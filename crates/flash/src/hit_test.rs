//! The per-frame hit-test tree. Elements register nodes during prepaint; the window
//! walks the tree to route pointer and keyboard input to their handlers.

use crate::{
    App, Bounds, ClickEvent, CursorStyle, FocusHandle, FocusId, FocusTree, GlobalElementId,
    KeyContext, KeyDownEvent, KeyUpEvent, MouseDownEvent, MouseEnterEvent, MouseLeaveEvent,
    MouseMoveEvent, MouseUpEvent, Pixels, Point, ScrollHandle, ScrollWheelEvent, TextInputEvent,
    Window,
};
use bitflags::bitflags;
use smallvec::SmallVec;
use std::{fmt, rc::Rc};

bitflags! {
    /// Returned by event handlers to control the rest of the dispatch.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DispatchFlags: u8 {
        /// Handlers further up the path do not see the event.
        const STOP_PROPAGATION = 1 << 0;
        /// The window skips its default action (focus on mouse down, scrolling, tab
        /// navigation).
        const PREVENT_DEFAULT = 1 << 1;
    }
}

impl From<()> for DispatchFlags {
    fn from(_: ()) -> Self {
        DispatchFlags::empty()
    }
}

pub(crate) type Listener<E> = Rc<dyn Fn(&E, &mut Window, &mut App) -> DispatchFlags>;

/// The handlers an element attached to its hit-test node.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) click: SmallVec<[Listener<ClickEvent>; 1]>,
    pub(crate) mouse_down: SmallVec<[Listener<MouseDownEvent>; 1]>,
    pub(crate) mouse_up: SmallVec<[Listener<MouseUpEvent>; 1]>,
    pub(crate) mouse_move: SmallVec<[Listener<MouseMoveEvent>; 1]>,
    pub(crate) mouse_enter: SmallVec<[Listener<MouseEnterEvent>; 1]>,
    pub(crate) mouse_leave: SmallVec<[Listener<MouseLeaveEvent>; 1]>,
    pub(crate) scroll_wheel: SmallVec<[Listener<ScrollWheelEvent>; 1]>,
    pub(crate) key_down: SmallVec<[Listener<KeyDownEvent>; 1]>,
    pub(crate) key_up: SmallVec<[Listener<KeyUpEvent>; 1]>,
    pub(crate) text_input: SmallVec<[Listener<TextInputEvent>; 1]>,
}

impl EventHandlers {
    pub fn is_empty(&self) -> bool {
        self.click.is_empty()
            && self.mouse_down.is_empty()
            && self.mouse_up.is_empty()
            && self.mouse_move.is_empty()
            && self.mouse_enter.is_empty()
            && self.mouse_leave.is_empty()
            && self.scroll_wheel.is_empty()
            && self.key_down.is_empty()
            && self.key_up.is_empty()
            && self.text_input.is_empty()
    }

    pub fn on_click(
        &mut self,
        listener: impl Fn(&ClickEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.click.push(Rc::new(listener));
    }

    pub fn on_mouse_down(
        &mut self,
        listener: impl Fn(&MouseDownEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.mouse_down.push(Rc::new(listener));
    }

    pub fn on_mouse_up(
        &mut self,
        listener: impl Fn(&MouseUpEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.mouse_up.push(Rc::new(listener));
    }

    pub fn on_mouse_move(
        &mut self,
        listener: impl Fn(&MouseMoveEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.mouse_move.push(Rc::new(listener));
    }

    pub fn on_scroll_wheel(
        &mut self,
        listener: impl Fn(&ScrollWheelEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.scroll_wheel.push(Rc::new(listener));
    }

    pub fn on_key_down(
        &mut self,
        listener: impl Fn(&KeyDownEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.key_down.push(Rc::new(listener));
    }

    pub fn on_mouse_enter(
        &mut self,
        listener: impl Fn(&MouseEnterEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.mouse_enter.push(Rc::new(listener));
    }

    pub fn on_mouse_leave(
        &mut self,
        listener: impl Fn(&MouseLeaveEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.mouse_leave.push(Rc::new(listener));
    }

    pub fn on_key_up(
        &mut self,
        listener: impl Fn(&KeyUpEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.key_up.push(Rc::new(listener));
    }

    pub fn on_text_input(
        &mut self,
        listener: impl Fn(&TextInputEvent, &mut Window, &mut App) -> DispatchFlags + 'static,
    ) {
        self.text_input.push(Rc::new(listener));
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("click", &self.click.len())
            .field("mouse_down", &self.mouse_down.len())
            .field("mouse_up", &self.mouse_up.len())
            .field("mouse_move", &self.mouse_move.len())
            .field("scroll_wheel", &self.scroll_wheel.len())
            .field("key_down", &self.key_down.len())
            .finish_non_exhaustive()
    }
}

/// How a node affects the nodes painted beneath it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HitboxBehavior {
    #[default]
    Normal,
    /// Siblings painted earlier, and their descendants, are not hit. Ancestors still are.
    BlockMouse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HitNodeId(usize);

/// A frame-scoped node mapping bounds to interaction handlers.
#[derive(Debug)]
pub struct HitTestNode {
    pub id: GlobalElementId,
    /// The element's bounds, clipped to its content mask.
    pub bounds: Bounds<Pixels>,
    pub handlers: EventHandlers,
    pub focus_handle: Option<FocusHandle>,
    pub scroll_handle: Option<ScrollHandle>,
    pub key_context: Option<KeyContext>,
    pub cursor: Option<CursorStyle>,
    pub behavior: HitboxBehavior,
    /// Children may extend past this node's bounds and are still tested.
    pub allow_overflow: bool,
    parent: Option<HitNodeId>,
    /// Topmost first once the tree is finished.
    children: SmallVec<[HitNodeId; 4]>,
}

impl HitTestNode {
    pub fn new(id: GlobalElementId, bounds: Bounds<Pixels>) -> Self {
        HitTestNode {
            id,
            bounds,
            handlers: EventHandlers::default(),
            focus_handle: None,
            scroll_handle: None,
            key_context: None,
            cursor: None,
            behavior: HitboxBehavior::Normal,
            allow_overflow: false,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn parent(&self) -> Option<HitNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[HitNodeId] {
        &self.children
    }
}

/// The hit-test tree of one frame. Roots and children are ordered topmost first, so
/// overlays registered after the main tree are tested before it.
#[derive(Debug, Default)]
pub struct HitTestTree {
    nodes: Vec<HitTestNode>,
    roots: SmallVec<[HitNodeId; 2]>,
}

impl HitTestTree {
    pub fn node(&self, id: HitNodeId) -> &HitTestNode {
        &self.nodes[id.0]
    }

    pub fn roots(&self) -> &[HitNodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, id: &GlobalElementId) -> Option<HitNodeId> {
        self.nodes
            .iter()
            .position(|node| node.id == *id)
            .map(HitNodeId)
    }

    /// The nodes under `position`, topmost first. Nodes come before their ancestors.
    pub fn hit_test(&self, position: Point<Pixels>) -> SmallVec<[HitNodeId; 8]> {
        let mut path = SmallVec::new();
        for root in &self.roots {
            if self.collect(*root, position, &mut path) {
                break;
            }
        }
        path
    }

    fn collect(
        &self,
        id: HitNodeId,
        position: Point<Pixels>,
        path: &mut SmallVec<[HitNodeId; 8]>,
    ) -> bool {
        let node = self.node(id);
        let inside = node.bounds.contains(&position);
        if !inside && !node.allow_overflow {
            return false;
        }

        let mut blocked = false;
        for child in &node.children {
            if self.collect(*child, position, path) {
                blocked = true;
                break;
            }
        }

        if inside {
            path.push(id);
            blocked |= node.behavior == HitboxBehavior::BlockMouse;
        }
        blocked
    }

    /// The node tracking `focus_id` followed by its ancestors.
    pub fn focus_path(&self, focus_id: FocusId) -> SmallVec<[HitNodeId; 8]> {
        let start = self
            .nodes
            .iter()
            .position(|node| node.focus_handle.is_some_and(|handle| handle.id == focus_id));
        let mut path = SmallVec::new();
        let mut current = start.map(HitNodeId);
        while let Some(id) = current {
            path.push(id);
            current = self.node(id).parent;
        }
        path
    }

    /// Key contexts from the root down to the first node of `path`.
    pub fn key_context_stack(&self, path: &[HitNodeId]) -> Vec<KeyContext> {
        path.iter()
            .rev()
            .filter_map(|id| self.node(*id).key_context.clone())
            .collect()
    }

    /// The scroll handle of the deepest scroll container hit at `position`.
    pub fn scroll_handle_at(&self, position: Point<Pixels>) -> Option<&ScrollHandle> {
        self.hit_test(position)
            .into_iter()
            .find_map(|id| self.node(id).scroll_handle.as_ref())
    }

    /// The cursor of the topmost node under the pointer that sets one.
    pub fn cursor_at(&self, path: &[HitNodeId]) -> CursorStyle {
        path.iter()
            .find_map(|id| self.node(*id).cursor)
            .unwrap_or_default()
    }
}

/// Assembles a [`HitTestTree`] during prepaint. Nodes are pushed in paint order and
/// reversed when the tree is finished.
#[derive(Default)]
pub(crate) struct HitTestBuilder {
    tree: HitTestTree,
    stack: Vec<HitNodeId>,
    focus_stack: Vec<FocusId>,
    pub(crate) focus_tree: FocusTree,
}

impl HitTestBuilder {
    pub fn insert(&mut self, mut node: HitTestNode) -> HitNodeId {
        let id = HitNodeId(self.tree.nodes.len());
        node.parent = self.stack.last().copied();
        if let Some(handle) = node.focus_handle {
            self.focus_tree
                .insert(handle.id, self.focus_stack.last().copied());
        }
        match node.parent {
            Some(parent) => self.tree.nodes[parent.0].children.push(id),
            None => self.tree.roots.push(id),
        }
        self.tree.nodes.push(node);
        id
    }

    /// Nodes inserted until the matching [`HitTestBuilder::pop`] become children of
    /// `id`.
    pub fn push(&mut self, id: HitNodeId) {
        if let Some(handle) = self.tree.nodes[id.0].focus_handle {
            self.focus_stack.push(handle.id);
        }
        self.stack.push(id);
    }

    pub fn pop(&mut self) {
        if let Some(id) = self.stack.pop()
            && self.tree.nodes[id.0].focus_handle.is_some()
        {
            self.focus_stack.pop();
        }
    }

    pub fn finish(mut self) -> (HitTestTree, FocusTree) {
        debug_assert!(self.stack.is_empty(), "unbalanced hit-test node stack");
        for node in &mut self.tree.nodes {
            node.children.reverse();
        }
        self.tree.roots.reverse();
        for node in &self.tree.nodes {
            if let Some(parent) = node.parent {
                let parent = &self.tree.nodes[parent.0];
                if !parent.allow_overflow && !parent.bounds.contains_bounds(&node.bounds) {
                    log::trace!(
                        "hit-test node {:?} escapes its parent {:?}",
                        node.id,
                        parent.id
                    );
                }
            }
        }
        (self.tree, self.focus_tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementId, point, px, size};

    fn node(name: &'static str, x: f32, y: f32, width: f32, height: f32) -> HitTestNode {
        HitTestNode::new(
            GlobalElementId(smallvec::smallvec![ElementId::from(name)]),
            Bounds::new(point(px(x), px(y)), size(px(width), px(height))),
        )
    }

    fn names(tree: &HitTestTree, path: &[HitNodeId]) -> Vec<String> {
        path.iter()
            .map(|id| format!("{:?}", tree.node(*id).id))
            .collect()
    }

    fn build(children: impl FnOnce(&mut HitTestBuilder)) -> HitTestTree {
        let mut builder = HitTestBuilder::default();
        let root = builder.insert(node("root", 0., 0., 100., 100.));
        builder.push(root);
        children(&mut builder);
        builder.pop();
        builder.finish().0
    }

    #[test]
    fn test_later_sibling_is_tested_first() {
        let tree = build(|builder| {
            builder.insert(node("bottom", 0., 0., 60., 60.));
            builder.insert(node("top", 40., 40., 60., 60.));
        });
        let path = tree.hit_test(point(px(50.), px(50.)));
        assert_eq!(names(&tree, &path), ["top", "bottom", "root"]);

        let path = tree.hit_test(point(px(10.), px(10.)));
        assert_eq!(names(&tree, &path), ["bottom", "root"]);
    }

    #[test]
    fn test_block_mouse_hides_siblings_beneath() {
        let tree = build(|builder| {
            builder.insert(node("bottom", 0., 0., 60., 60.));
            let mut top = node("top", 40., 40., 60., 60.);
            top.behavior = HitboxBehavior::BlockMouse;
            builder.insert(top);
        });
        let path = tree.hit_test(point(px(50.), px(50.)));
        assert_eq!(names(&tree, &path), ["top", "root"]);
    }

    #[test]
    fn test_overflowing_children_need_opt_in() {
        let mut builder = HitTestBuilder::default();
        let menu = builder.insert(node("menu", 0., 0., 50., 50.));
        builder.push(menu);
        builder.insert(node("submenu", 50., 0., 50., 50.));
        builder.pop();
        let tree = builder.finish().0;
        assert!(tree.hit_test(point(px(75.), px(10.))).is_empty());

        let mut builder = HitTestBuilder::default();
        let mut menu_node = node("menu", 0., 0., 50., 50.);
        menu_node.allow_overflow = true;
        let menu = builder.insert(menu_node);
        builder.push(menu);
        builder.insert(node("submenu", 50., 0., 50., 50.));
        builder.pop();
        let tree = builder.finish().0;
        let path = tree.hit_test(point(px(75.), px(10.)));
        assert_eq!(names(&tree, &path), ["submenu"]);
    }

    #[test]
    fn test_later_roots_are_on_top() {
        let mut builder = HitTestBuilder::default();
        builder.insert(node("content", 0., 0., 100., 100.));
        let mut backdrop = node("backdrop", 0., 0., 100., 100.);
        backdrop.behavior = HitboxBehavior::BlockMouse;
        builder.insert(backdrop);
        let tree = builder.finish().0;
        let path = tree.hit_test(point(px(10.), px(10.)));
        assert_eq!(names(&tree, &path), ["backdrop"]);
    }
}
