use crate::{Bounds, Pixels, Point, Size, WindowId, point};
use std::{cell::RefCell, fmt, rc::Rc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScrollId(pub(crate) u64);

/// Scroll position of a container together with the layout it was clamped against.
/// Offsets are non-negative: `(0, 0)` shows the start of the content.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    pub offset: Point<Pixels>,
    pub viewport: Bounds<Pixels>,
    pub content_size: Size<Pixels>,
}

impl ScrollState {
    pub fn max_offset(&self) -> Point<Pixels> {
        point(
            (self.content_size.width - self.viewport.size.width).max(Pixels::ZERO),
            (self.content_size.height - self.viewport.size.height).max(Pixels::ZERO),
        )
    }

    pub fn clamp(&self, offset: Point<Pixels>) -> Point<Pixels> {
        let max = self.max_offset();
        point(
            offset.x.clamp(Pixels::ZERO, max.x),
            offset.y.clamp(Pixels::ZERO, max.y),
        )
    }
}

/// A handle to a scroll container. Clones share the same state, so the element that
/// tracks the handle and the code that scrolls it see the same offset.
#[derive(Clone)]
pub struct ScrollHandle {
    pub(crate) id: ScrollId,
    pub(crate) window_id: WindowId,
    state: Rc<RefCell<ScrollState>>,
}

impl ScrollHandle {
    pub(crate) fn new(id: ScrollId, window_id: WindowId) -> Self {
        Self {
            id,
            window_id,
            state: Rc::default(),
        }
    }

    pub fn id(&self) -> ScrollId {
        self.id
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn offset(&self) -> Point<Pixels> {
        self.state.borrow().offset
    }

    pub fn viewport(&self) -> Bounds<Pixels> {
        self.state.borrow().viewport
    }

    pub fn content_size(&self) -> Size<Pixels> {
        self.state.borrow().content_size
    }

    pub fn max_offset(&self) -> Point<Pixels> {
        self.state.borrow().max_offset()
    }

    /// Sets the offset, clamped to the scrollable range. Returns whether it moved.
    pub(crate) fn set_offset(&self, offset: Point<Pixels>) -> bool {
        let mut state = self.state.borrow_mut();
        let offset = state.clamp(offset);
        let changed = state.offset != offset;
        state.offset = offset;
        changed
    }

    /// Records the container's layout for this frame and re-clamps the offset.
    pub(crate) fn update_layout(&self, viewport: Bounds<Pixels>, content_size: Size<Pixels>) {
        let mut state = self.state.borrow_mut();
        state.viewport = viewport;
        state.content_size = content_size;
        state.offset = state.clamp(state.offset);
    }
}

impl PartialEq for ScrollHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ScrollHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollHandle")
            .field("id", &self.id)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{px, size};

    #[test]
    fn test_offset_is_clamped_to_content() {
        let handle = ScrollHandle::new(ScrollId(1), WindowId::default());
        handle.update_layout(
            Bounds::new(point(px(0.), px(0.)), size(px(100.), px(50.))),
            size(px(100.), px(200.)),
        );

        assert!(handle.set_offset(point(px(10.), px(500.))));
        assert_eq!(handle.offset(), point(px(0.), px(150.)));
        assert!(!handle.set_offset(point(px(0.), px(150.))));

        // Content shrinking pulls the offset back into range.
        handle.update_layout(handle.viewport(), size(px(100.), px(80.)));
        assert_eq!(handle.offset(), point(px(0.), px(30.)));
    }
}
