use crate::{
    App, Bounds, Element, ElementId, GlobalElementId, IntoElement, LayoutId, Pixels, Style,
    Styled, Window,
};

/// An element that paints with a closure. `prepaint` runs once bounds are known and
/// its result is handed to `paint`, which can push any primitive the window supports.
pub fn canvas<T: 'static>(
    prepaint: impl 'static + FnOnce(Bounds<Pixels>, &mut Window, &mut App) -> T,
    paint: impl 'static + FnOnce(Bounds<Pixels>, T, &mut Window, &mut App),
) -> Canvas<T> {
    Canvas {
        prepaint: Some(Box::new(prepaint)),
        paint: Some(Box::new(paint)),
        style: Style::default(),
    }
}

type PrepaintCallback<T> = Box<dyn FnOnce(Bounds<Pixels>, &mut Window, &mut App) -> T>;
type PaintCallback<T> = Box<dyn FnOnce(Bounds<Pixels>, T, &mut Window, &mut App)>;

pub struct Canvas<T> {
    prepaint: Option<PrepaintCallback<T>>,
    paint: Option<PaintCallback<T>>,
    style: Style,
}

impl<T: 'static> IntoElement for Canvas<T> {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl<T: 'static> Element for Canvas<T> {
    type RequestLayoutState = ();
    type PrepaintState = Option<T>;

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn request_layout(
        &mut self,
        _id: &GlobalElementId,
        window: &mut Window,
        _cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        (window.request_layout(&self.style, &[]), ())
    }

    fn prepaint(
        &mut self,
        _id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) -> Option<T> {
        self.prepaint
            .take()
            .map(|prepaint| prepaint(bounds, window, cx))
    }

    fn paint(
        &mut self,
        _id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        if let Some(paint) = self.paint.take()
            && let Some(prepaint) = prepaint.take()
        {
            paint(bounds, prepaint, window, cx);
        }
    }
}

impl<T> Styled for Canvas<T> {
    fn style(&mut self) -> &mut Style {
        &mut self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ImageId, ImagePrimitive, ParentElement, Path, Primitive, SurfaceId, SurfacePrimitive,
        TestAppContext, div, px, rgb,
    };

    #[test]
    fn test_canvas_paints_with_its_bounds() {
        let mut cx = TestAppContext::new();
        let window_id = cx.open_window_with(|| {
            div().p(px(10.)).child(
                canvas(
                    |bounds, _, _| bounds,
                    |bounds, prepainted, window, _| {
                        assert_eq!(bounds, prepainted);
                        window.paint_path(Path::rectangle(bounds, rgb(0x00ff00)));
                        window.paint_image(ImagePrimitive {
                            bounds,
                            image: ImageId(7),
                            ..Default::default()
                        });
                        window.paint_surface(SurfacePrimitive {
                            bounds,
                            surface: SurfaceId(3),
                            ..Default::default()
                        });
                    },
                )
                .size(px(30.)),
            )
        });
        cx.run_frame();

        let kinds = cx
            .read_window(window_id, |window, _| {
                window
                    .rendered_scene()
                    .primitives()
                    .iter()
                    .filter_map(|primitive| match primitive {
                        Primitive::Path(path) => Some(("path", path.bounds)),
                        Primitive::Image(image) => Some(("image", image.bounds)),
                        Primitive::Surface(surface) => Some(("surface", surface.bounds)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap();
        let expected = Bounds::new(crate::point(px(10.), px(10.)), crate::size(px(30.), px(30.)));
        assert_eq!(
            kinds,
            vec![("path", expected), ("image", expected), ("surface", expected)]
        );
    }
}
