//! The flat list of primitives produced by the paint phase and handed to the renderer.

use crate::{Bounds, Corners, Edges, Hsla, Pixels, Point, SharedString, point};

pub(crate) type DrawOrder = u32;

/// Everything painted in one frame, in paint order.
#[derive(Default, Clone, Debug)]
pub struct Scene {
    primitives: Vec<Primitive>,
    layer_stack: Vec<Bounds<Pixels>>,
    next_order: DrawOrder,
}

impl Scene {
    pub fn clear(&mut self) {
        self.primitives.clear();
        self.layer_stack.clear();
        self.next_order = 0;
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Starts a layer whose primitives are drawn above everything inserted before it.
    pub fn push_layer(&mut self, bounds: Bounds<Pixels>) {
        self.layer_stack.push(bounds);
    }

    pub fn pop_layer(&mut self) {
        self.layer_stack.pop();
    }

    pub fn layer_depth(&self) -> usize {
        self.layer_stack.len()
    }

    pub(crate) fn insert(&mut self, primitive: impl Into<Primitive>) {
        let mut primitive = primitive.into();
        if primitive.content_mask().is_empty() {
            return;
        }
        primitive.set_order(self.next_order);
        self.next_order += 1;
        self.primitives.push(primitive);
    }

    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.primitives.iter().filter_map(|primitive| match primitive {
            Primitive::Quad(quad) => Some(quad),
            _ => None,
        })
    }

    pub fn glyph_runs(&self) -> impl Iterator<Item = &GlyphRun> {
        self.primitives.iter().filter_map(|primitive| match primitive {
            Primitive::GlyphRun(run) => Some(run),
            _ => None,
        })
    }
}

/// A single drawable item.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Shadow(Shadow),
    Quad(Quad),
    GlyphRun(GlyphRun),
    Path(Path),
    Image(ImagePrimitive),
    Surface(SurfacePrimitive),
}

impl Primitive {
    pub fn order(&self) -> DrawOrder {
        match self {
            Primitive::Shadow(shadow) => shadow.order,
            Primitive::Quad(quad) => quad.order,
            Primitive::GlyphRun(run) => run.order,
            Primitive::Path(path) => path.order,
            Primitive::Image(image) => image.order,
            Primitive::Surface(surface) => surface.order,
        }
    }

    pub fn content_mask(&self) -> Bounds<Pixels> {
        match self {
            Primitive::Shadow(shadow) => shadow.content_mask,
            Primitive::Quad(quad) => quad.content_mask,
            Primitive::GlyphRun(run) => run.content_mask,
            Primitive::Path(path) => path.content_mask,
            Primitive::Image(image) => image.content_mask,
            Primitive::Surface(surface) => surface.content_mask,
        }
    }

    fn set_order(&mut self, order: DrawOrder) {
        match self {
            Primitive::Shadow(shadow) => shadow.order = order,
            Primitive::Quad(quad) => quad.order = order,
            Primitive::GlyphRun(run) => run.order = order,
            Primitive::Path(path) => path.order = order,
            Primitive::Image(image) => image.order = order,
            Primitive::Surface(surface) => surface.order = order,
        }
    }
}

/// A filled rectangle with optional border and rounded corners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Quad {
    pub order: DrawOrder,
    pub bounds: Bounds<Pixels>,
    pub content_mask: Bounds<Pixels>,
    pub background: Hsla,
    pub border_color: Hsla,
    pub border_widths: Edges<Pixels>,
    pub corner_radii: Corners<Pixels>,
}

impl From<Quad> for Primitive {
    fn from(quad: Quad) -> Self {
        Primitive::Quad(quad)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shadow {
    pub order: DrawOrder,
    pub bounds: Bounds<Pixels>,
    pub content_mask: Bounds<Pixels>,
    pub corner_radii: Corners<Pixels>,
    pub color: Hsla,
    pub blur_radius: Pixels,
}

impl From<Shadow> for Primitive {
    fn from(shadow: Shadow) -> Self {
        Primitive::Shadow(shadow)
    }
}

/// A run of text positioned at its baseline origin. Shaping is done by the renderer's
/// text collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphRun {
    pub order: DrawOrder,
    pub origin: Point<Pixels>,
    pub content_mask: Bounds<Pixels>,
    pub text: SharedString,
    pub font_size: Pixels,
    pub color: Hsla,
}

impl From<GlyphRun> for Primitive {
    fn from(run: GlyphRun) -> Self {
        Primitive::GlyphRun(run)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImagePrimitive {
    pub order: DrawOrder,
    pub bounds: Bounds<Pixels>,
    pub content_mask: Bounds<Pixels>,
    pub corner_radii: Corners<Pixels>,
    pub image: ImageId,
}

impl From<ImagePrimitive> for Primitive {
    fn from(image: ImagePrimitive) -> Self {
        Primitive::Image(image)
    }
}

/// An externally produced texture, such as a video frame, composited into the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfacePrimitive {
    pub order: DrawOrder,
    pub bounds: Bounds<Pixels>,
    pub content_mask: Bounds<Pixels>,
    pub surface: SurfaceId,
}

impl From<SurfacePrimitive> for Primitive {
    fn from(surface: SurfacePrimitive) -> Self {
        Primitive::Surface(surface)
    }
}

/// A command of an untessellated path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point<Pixels>),
    LineTo(Point<Pixels>),
    QuadTo {
        ctrl: Point<Pixels>,
        to: Point<Pixels>,
    },
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathVertex {
    pub xy_position: Point<Pixels>,
    /// Curve coordinates for the fragment stage; `(0, 1)` marks a solid interior.
    pub st_position: Point<f32>,
}

/// How a path's shape is described to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum PathGeometry {
    /// Commands the renderer tessellates itself.
    Commands(Vec<PathCommand>),
    /// Triangles ready to rasterize, three vertices each.
    Triangles(Vec<PathVertex>),
}

/// A filled vector path.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub order: DrawOrder,
    pub bounds: Bounds<Pixels>,
    pub content_mask: Bounds<Pixels>,
    pub geometry: PathGeometry,
    pub color: Hsla,
}

impl From<Path> for Primitive {
    fn from(path: Path) -> Self {
        Primitive::Path(path)
    }
}

/// Builds raw path commands, tracking the bounds they cover.
#[derive(Clone, Debug)]
pub struct PathBuilder {
    commands: Vec<PathCommand>,
    bounds: Bounds<Pixels>,
}

impl PathBuilder {
    pub fn new(start: Point<Pixels>) -> Self {
        Self {
            commands: vec![PathCommand::MoveTo(start)],
            bounds: Bounds::new(start, Default::default()),
        }
    }

    pub fn move_to(&mut self, to: Point<Pixels>) {
        self.extend_bounds(to);
        self.commands.push(PathCommand::MoveTo(to));
    }

    pub fn line_to(&mut self, to: Point<Pixels>) {
        self.extend_bounds(to);
        self.commands.push(PathCommand::LineTo(to));
    }

    pub fn curve_to(&mut self, to: Point<Pixels>, ctrl: Point<Pixels>) {
        self.extend_bounds(ctrl);
        self.extend_bounds(to);
        self.commands.push(PathCommand::QuadTo { ctrl, to });
    }

    pub fn close(&mut self) {
        self.commands.push(PathCommand::Close);
    }

    pub fn build(self, color: Hsla) -> Path {
        Path {
            order: 0,
            bounds: self.bounds,
            content_mask: Bounds::default(),
            geometry: PathGeometry::Commands(self.commands),
            color,
        }
    }

    fn extend_bounds(&mut self, to: Point<Pixels>) {
        self.bounds = self.bounds.union(&Bounds::new(to, Default::default()));
    }
}

impl Path {
    /// A path made of already tessellated triangles.
    pub fn from_triangles(vertices: Vec<PathVertex>, color: Hsla) -> Self {
        debug_assert!(vertices.len() % 3 == 0, "path vertices must form triangles");
        let bounds = vertices
            .iter()
            .map(|vertex| Bounds::new(vertex.xy_position, Default::default()))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Path {
            order: 0,
            bounds,
            content_mask: Bounds::default(),
            geometry: PathGeometry::Triangles(vertices),
            color,
        }
    }

    /// Two triangles covering `bounds`.
    pub fn rectangle(bounds: Bounds<Pixels>, color: Hsla) -> Self {
        let solid = point(0., 1.);
        let vertex = |xy_position| PathVertex {
            xy_position,
            st_position: solid,
        };
        let top_right = point(bounds.right(), bounds.top());
        let bottom_left = point(bounds.left(), bounds.bottom());
        Self::from_triangles(
            vec![
                vertex(bounds.origin),
                vertex(top_right),
                vertex(bounds.bottom_right()),
                vertex(bounds.origin),
                vertex(bounds.bottom_right()),
                vertex(bottom_left),
            ],
            color,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{px, rgb, size};

    fn full_mask() -> Bounds<Pixels> {
        Bounds::new(point(px(0.), px(0.)), size(px(100.), px(100.)))
    }

    #[test]
    fn test_insert_assigns_paint_order_and_skips_clipped() {
        let mut scene = Scene::default();
        scene.insert(Quad {
            content_mask: full_mask(),
            background: rgb(0xff0000),
            ..Default::default()
        });
        scene.insert(Quad {
            content_mask: Bounds::default(),
            ..Default::default()
        });
        scene.insert(Shadow {
            content_mask: full_mask(),
            ..Default::default()
        });

        let orders = scene
            .primitives()
            .iter()
            .map(Primitive::order)
            .collect::<Vec<_>>();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(scene.quads().count(), 1);
    }

    #[test]
    fn test_path_builder_tracks_bounds() {
        let mut builder = PathBuilder::new(point(px(10.), px(10.)));
        builder.line_to(point(px(30.), px(10.)));
        builder.curve_to(point(px(30.), px(40.)), point(px(50.), px(25.)));
        builder.close();
        let path = builder.build(rgb(0x000000));

        assert_eq!(
            path.bounds,
            Bounds::from_corners(point(px(10.), px(10.)), point(px(50.), px(40.)))
        );
        let PathGeometry::Commands(commands) = &path.geometry else {
            panic!("expected raw commands");
        };
        assert_eq!(commands.len(), 4);
    }
}
