use crate::{
    AnyElement, App, Bounds, DispatchFlags, Element, ElementId, FluentBuilder, GlobalElementId,
    InteractiveElement, IntoElement, LayoutId, MenuItem, MouseMoveEvent, ParentElement, Pixels,
    Placement, SharedString, Styled, Window, div, px, rgb, white,
};
use std::{rc::Rc, time::Instant};

/// A dropdown menu opened by clicking `trigger`. Its open state, expanded submenus and
/// hovered item live in the window's [`crate::OverlayManager`] under `session_id`, so
/// they survive re-renders of the view that builds the menu.
pub fn menu(
    session_id: impl Into<SharedString>,
    trigger: impl IntoElement,
    items: Vec<MenuItem>,
) -> Menu {
    Menu {
        session_id: session_id.into(),
        placement: Placement::Below,
        trigger: Some(trigger.into_any_element()),
        items: items.into(),
    }
}

pub struct Menu {
    session_id: SharedString,
    placement: Placement,
    trigger: Option<AnyElement>,
    items: Rc<[MenuItem]>,
}

impl Menu {
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

impl IntoElement for Menu {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for Menu {
    type RequestLayoutState = AnyElement;
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        Some(ElementId::Name(self.session_id.clone()))
    }

    fn request_layout(
        &mut self,
        _id: &GlobalElementId,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let session_id = self.session_id.clone();
        let is_open = window.overlays_mut().menu_session(session_id.clone()).is_open();

        let mut trigger = div()
            .id("trigger")
            .on_click({
                let session_id = session_id.clone();
                move |_, window: &mut Window, cx: &mut App| {
                    window.overlays_mut().menu_session(session_id.clone()).toggle();
                    cx.mark_window_dirty(window.id());
                    DispatchFlags::STOP_PROPAGATION
                }
            })
            .children(self.trigger.take());
        if is_open {
            let items = self.items.clone();
            trigger = trigger.popover(self.placement, move |window, _| {
                menu_panel(&session_id, &items, 0, window)
            });
        }

        let mut element = trigger.into_any_element();
        let layout_id = element.request_layout(window, cx);
        (layout_id, element)
    }

    fn prepaint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        element: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) {
        element.prepaint(window, cx);
    }

    fn paint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        element: &mut Self::RequestLayoutState,
        _prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        element.paint(window, cx);
    }
}

const ITEM_HEIGHT: Pixels = px(24.);

fn menu_panel(
    session_id: &SharedString,
    items: &[MenuItem],
    depth: usize,
    window: &mut Window,
) -> AnyElement {
    let session = window.overlays_mut().menu_session(session_id.clone()).clone();
    div()
        .id(format!("menu-{depth}"))
        .flex()
        .flex_col()
        .min_w(px(120.))
        .py(px(4.))
        .bg(white())
        .border(px(1.))
        .border_color(rgb(0xcccccc))
        .rounded(px(4.))
        .shadow_md()
        .occlude()
        .children(items.iter().enumerate().map(|(ix, item)| {
            menu_row(
                session_id,
                item,
                depth,
                ix,
                session.is_submenu_open(depth, ix),
                session.hovered() == Some((depth, ix)),
            )
        }))
        .into_any_element()
}

fn menu_row(
    session_id: &SharedString,
    item: &MenuItem,
    depth: usize,
    ix: usize,
    submenu_open: bool,
    hovered: bool,
) -> AnyElement {
    let row = div()
        .id(ix)
        .flex()
        .items_center()
        .px(px(8.))
        .h(ITEM_HEIGHT)
        .when(hovered && item.is_interactive(), |row| row.bg(rgb(0xe8e8e8)));

    let track_hover = {
        let session_id = session_id.clone();
        let has_submenu = item.has_submenu();
        move |event: &MouseMoveEvent, window: &mut Window, cx: &mut App| {
            let changed = window.overlays_mut().menu_session(session_id.clone()).hover(
                depth,
                ix,
                has_submenu,
                event.position,
                Instant::now(),
            );
            if changed {
                cx.mark_window_dirty(window.id());
            }
        }
    };

    match item {
        MenuItem::Action {
            label,
            disabled: true,
            ..
        } => row
            .text_color(rgb(0x999999))
            .child(label.clone())
            .into_any_element(),
        MenuItem::Action { label, handler, .. } => {
            let handler = handler.clone();
            let session_id = session_id.clone();
            row.cursor_pointer()
                .on_mouse_move(track_hover)
                .on_click(move |_, window: &mut Window, cx: &mut App| {
                    window.overlays_mut().close_menu(&session_id);
                    handler(window, cx);
                    cx.mark_window_dirty(window.id());
                    DispatchFlags::STOP_PROPAGATION
                })
                .child(label.clone())
                .into_any_element()
        }
        MenuItem::Toggle {
            label,
            checked,
            handler,
        } => {
            let handler = handler.clone();
            let checked = *checked;
            let session_id = session_id.clone();
            row.cursor_pointer()
                .on_mouse_move(track_hover)
                .on_click(move |_, window: &mut Window, cx: &mut App| {
                    window.overlays_mut().close_menu(&session_id);
                    handler(!checked, window, cx);
                    cx.mark_window_dirty(window.id());
                    DispatchFlags::STOP_PROPAGATION
                })
                .child(if checked { "✓ " } else { "  " })
                .child(label.clone())
                .into_any_element()
        }
        MenuItem::Submenu { label, items } => {
            let row = row
                .on_mouse_move(track_hover)
                .child(label.clone())
                .child(" ›");
            if submenu_open {
                let items: Rc<[MenuItem]> = items.clone().into();
                let session_id = session_id.clone();
                row.popover(Placement::Right, move |window, _| {
                    menu_panel(&session_id, &items, depth + 1, window)
                })
                .into_any_element()
            } else {
                row.into_any_element()
            }
        }
        MenuItem::Header(label) => row
            .text_color(rgb(0x666666))
            .text_size(px(12.))
            .child(label.clone())
            .into_any_element(),
        MenuItem::Separator => div()
            .id(ix)
            .m(px(4.))
            .h(px(1.))
            .bg(rgb(0xdddddd))
            .into_any_element(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Render, TestAppContext, ViewContext, point};
    use std::cell::Cell;

    struct MenuView {
        saved: Rc<Cell<usize>>,
        wrap: Rc<Cell<Option<bool>>>,
    }

    impl Render for MenuView {
        fn render(&mut self, _cx: &mut ViewContext<Self>) -> impl IntoElement {
            let saved = self.saved.clone();
            let wrap = self.wrap.clone();
            div().size_full().items_start().child(menu(
                "file",
                div().w(px(40.)).h(px(20.)),
                vec![
                    MenuItem::Header("File".into()),
                    MenuItem::action("Save", move |_, _| saved.set(saved.get() + 1)),
                    MenuItem::action("Print", |_, _| {}).disabled(),
                    MenuItem::Separator,
                    MenuItem::submenu(
                        "View",
                        vec![MenuItem::toggle("Wrap", false, move |checked, _, _| {
                            wrap.set(Some(checked))
                        })],
                    ),
                ],
            ))
        }
    }

    fn is_open(cx: &TestAppContext, window_id: crate::WindowId) -> bool {
        cx.read_window(window_id, |window, _| {
            window
                .overlays()
                .read_menu_session("file")
                .is_some_and(|session| session.is_open())
        })
        .unwrap()
    }

    fn overlay_count(cx: &TestAppContext, window_id: crate::WindowId) -> usize {
        cx.read_window(window_id, |window, _| window.overlays().overlay_bounds().count())
            .unwrap()
    }

    #[test]
    fn test_menu_action_runs_and_closes() {
        let mut cx = TestAppContext::new();
        let saved = Rc::new(Cell::new(0));
        let wrap = Rc::new(Cell::new(None));
        let (_, window_id) = cx.add_window_view({
            let saved = saved.clone();
            move |_, _| MenuView { saved, wrap }
        });
        cx.run_frame();
        assert!(!is_open(&cx, window_id));

        cx.simulate_click(window_id, point(px(10.), px(10.)));
        assert!(is_open(&cx, window_id));
        cx.run_frame();
        assert_eq!(overlay_count(&cx, window_id), 1);

        // The panel sits below the 20px trigger with a 4px gap. Rows are 24px tall
        // after a 1px border and 4px of padding: header, then "Save".
        cx.simulate_click(window_id, point(px(10.), px(24. + 1. + 4. + 24. + 12.)));
        assert_eq!(saved.get(), 1);
        assert!(!is_open(&cx, window_id));
        cx.run_frame();
        assert_eq!(overlay_count(&cx, window_id), 0);
    }

    #[test]
    fn test_hovering_submenu_item_opens_it() {
        let mut cx = TestAppContext::new();
        let saved = Rc::new(Cell::new(0));
        let wrap = Rc::new(Cell::new(None));
        let (_, window_id) = cx.add_window_view({
            let wrap = wrap.clone();
            move |_, _| MenuView { saved, wrap }
        });
        cx.run_frame();
        cx.simulate_click(window_id, point(px(10.), px(10.)));
        cx.run_frame();

        // Header, Save, Print, separator (1px + 8px margin), then View.
        let view_row_y = 24. + 1. + 4. + 24. * 3. + 9. + 12.;
        cx.simulate_mouse_move(window_id, point(px(10.), px(view_row_y)));
        cx.run_frame();
        assert_eq!(overlay_count(&cx, window_id), 2);
        let submenu_open = cx
            .read_window(window_id, |window, _| {
                window
                    .overlays()
                    .read_menu_session("file")
                    .is_some_and(|session| session.is_submenu_open(0, 4))
            })
            .unwrap();
        assert!(submenu_open);

        let submenu = cx
            .read_window(window_id, |window, _| {
                window
                    .overlays()
                    .overlay_bounds()
                    .nth(1)
                    .map(|(_, bounds)| bounds)
            })
            .unwrap()
            .unwrap();
        cx.simulate_click(window_id, submenu.center());
        assert_eq!(wrap.get(), Some(true));
        assert!(!is_open(&cx, window_id));
    }
}
