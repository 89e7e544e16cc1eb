use crate::{AppContext, ReadContext, WindowId};
use rustc_hash::FxHashMap;

/// Identifies a focusable element within its window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FocusId(pub(crate) u64);

/// A window-scoped handle used to move keyboard focus and query it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FocusHandle {
    pub(crate) id: FocusId,
    pub(crate) window_id: WindowId,
}

impl FocusHandle {
    pub fn id(&self) -> FocusId {
        self.id
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Whether this handle is at the top of its window's focus stack.
    pub fn is_focused(&self, cx: &impl ReadContext) -> bool {
        cx.is_focused(self)
    }

    /// Whether this handle or one of its descendants in the last rendered frame is
    /// focused.
    pub fn contains_focused(&self, cx: &impl ReadContext) -> bool {
        cx.app().contains_focused(self)
    }

    pub fn focus(&self, cx: &mut impl AppContext) {
        cx.focus(self);
    }

    pub fn blur(&self, cx: &mut impl AppContext) {
        cx.blur(self);
    }
}

/// The per-window focus stack and the focus tree of the last rendered frame.
#[derive(Default, Debug)]
pub(crate) struct FocusState {
    stack: Vec<FocusId>,
    pub(crate) tree: FocusTree,
}

impl FocusState {
    pub fn focused(&self) -> Option<FocusId> {
        self.stack.last().copied()
    }

    /// Moves `id` to the top of the stack. Returns whether focus changed.
    pub fn push(&mut self, id: FocusId) -> bool {
        if self.focused() == Some(id) {
            return false;
        }
        self.stack.retain(|entry| *entry != id);
        self.stack.push(id);
        true
    }

    /// Removes `id` from the stack, restoring focus to the entry below it when it was
    /// on top. Returns whether focus changed.
    pub fn remove(&mut self, id: FocusId) -> bool {
        let was_focused = self.focused() == Some(id);
        self.stack.retain(|entry| *entry != id);
        was_focused
    }

    /// Drops stack entries that are no longer part of the rendered tree.
    pub fn retain_rendered(&mut self) -> bool {
        let focused = self.focused();
        let tree = &self.tree;
        self.stack.retain(|id| tree.contains(*id));
        focused != self.focused()
    }
}

/// Focusable elements of a frame in preorder, with their nearest focusable ancestor.
/// Rebuilt every frame from hit-test registration order.
#[derive(Default, Debug, Clone)]
pub struct FocusTree {
    order: Vec<FocusId>,
    parents: FxHashMap<FocusId, Option<FocusId>>,
}

impl FocusTree {
    pub(crate) fn insert(&mut self, id: FocusId, parent: Option<FocusId>) {
        if self.parents.contains_key(&id) {
            log::warn!("focus handle {id:?} was tracked by more than one element this frame");
            return;
        }
        self.order.push(id);
        self.parents.insert(id, parent);
    }

    pub fn contains(&self, id: FocusId) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn parent(&self, id: FocusId) -> Option<FocusId> {
        self.parents.get(&id).copied().flatten()
    }

    /// Direct focusable children of `parent` (or the top level for `None`), in paint
    /// order.
    pub fn children(&self, parent: Option<FocusId>) -> impl Iterator<Item = FocusId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(move |id| self.parents.get(id) == Some(&parent))
    }

    pub fn first_child(&self, id: FocusId) -> Option<FocusId> {
        self.children(Some(id)).next()
    }

    pub fn next_sibling(&self, id: FocusId) -> Option<FocusId> {
        let parent = *self.parents.get(&id)?;
        let mut siblings = self.children(parent);
        siblings.find(|sibling| *sibling == id)?;
        siblings.next()
    }

    /// Whether `descendant` is `ancestor` or nested inside it.
    pub fn is_ancestor(&self, ancestor: FocusId, descendant: FocusId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// The element after `current` in tab order, wrapping around.
    pub fn next(&self, current: Option<FocusId>) -> Option<FocusId> {
        let index = current.and_then(|current| self.order.iter().position(|id| *id == current));
        match index {
            Some(index) => self.order.get((index + 1) % self.order.len()).copied(),
            None => self.order.first().copied(),
        }
    }

    /// The element before `current` in tab order, wrapping around.
    pub fn prev(&self, current: Option<FocusId>) -> Option<FocusId> {
        let index = current.and_then(|current| self.order.iter().position(|id| *id == current));
        match index {
            Some(0) | None => self.order.last().copied(),
            Some(index) => self.order.get(index - 1).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> FocusTree {
        // 1
        // +- 2
        // |  +- 4
        // +- 3
        let mut tree = FocusTree::default();
        tree.insert(FocusId(1), None);
        tree.insert(FocusId(2), Some(FocusId(1)));
        tree.insert(FocusId(4), Some(FocusId(2)));
        tree.insert(FocusId(3), Some(FocusId(1)));
        tree
    }

    #[test]
    fn test_navigation() {
        let tree = tree();
        assert_eq!(tree.first_child(FocusId(1)), Some(FocusId(2)));
        assert_eq!(tree.next_sibling(FocusId(2)), Some(FocusId(3)));
        assert_eq!(tree.next_sibling(FocusId(3)), None);
        assert_eq!(tree.first_child(FocusId(3)), None);
        assert!(tree.is_ancestor(FocusId(1), FocusId(4)));
        assert!(!tree.is_ancestor(FocusId(3), FocusId(4)));
    }

    #[test]
    fn test_tab_order_wraps() {
        let tree = tree();
        assert_eq!(tree.next(None), Some(FocusId(1)));
        assert_eq!(tree.next(Some(FocusId(4))), Some(FocusId(3)));
        assert_eq!(tree.next(Some(FocusId(3))), Some(FocusId(1)));
        assert_eq!(tree.prev(Some(FocusId(1))), Some(FocusId(3)));
        assert_eq!(tree.prev(Some(FocusId(3))), Some(FocusId(4)));
    }

    #[test]
    fn test_focus_stack_restores_previous() {
        let mut state = FocusState::default();
        assert!(state.push(FocusId(1)));
        assert!(state.push(FocusId(2)));
        assert!(!state.push(FocusId(2)));
        assert_eq!(state.focused(), Some(FocusId(2)));

        assert!(state.remove(FocusId(2)));
        assert_eq!(state.focused(), Some(FocusId(1)));

        assert!(state.push(FocusId(3)));
        assert!(state.push(FocusId(1)));
        assert!(!state.remove(FocusId(3)));
        assert_eq!(state.focused(), Some(FocusId(1)));
    }
}
