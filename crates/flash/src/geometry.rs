//! Geometric primitives used throughout layout, hit testing and painting.
//!
//! All coordinates are logical pixels in window space unless stated otherwise. The
//! origin is the top-left corner of the window and `y` grows downward.

use std::{
    fmt,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

/// A length in logical pixels.
#[derive(Clone, Copy, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Pixels(pub f32);

/// Constructs a [`Pixels`] value.
pub const fn px(pixels: f32) -> Pixels {
    Pixels(pixels)
}

impl Pixels {
    /// Zero pixels.
    pub const ZERO: Pixels = Pixels(0.);
    /// The largest representable length.
    pub const MAX: Pixels = Pixels(f32::MAX);

    /// Returns the larger of two lengths.
    pub fn max(self, other: Self) -> Self {
        Pixels(self.0.max(other.0))
    }

    /// Returns the smaller of two lengths.
    pub fn min(self, other: Self) -> Self {
        Pixels(self.0.min(other.0))
    }

    pub fn clamp(self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }

    pub fn abs(self) -> Self {
        Pixels(self.0.abs())
    }

    pub fn floor(self) -> Self {
        Pixels(self.0.floor())
    }

    pub fn ceil(self) -> Self {
        Pixels(self.0.ceil())
    }

    pub fn round(self) -> Self {
        Pixels(self.0.round())
    }
}

impl fmt::Debug for Pixels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl fmt::Display for Pixels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl Add for Pixels {
    type Output = Pixels;

    fn add(self, rhs: Self) -> Self::Output {
        Pixels(self.0 + rhs.0)
    }
}

impl AddAssign for Pixels {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Pixels {
    type Output = Pixels;

    fn sub(self, rhs: Self) -> Self::Output {
        Pixels(self.0 - rhs.0)
    }
}

impl SubAssign for Pixels {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<f32> for Pixels {
    type Output = Pixels;

    fn mul(self, rhs: f32) -> Self::Output {
        Pixels(self.0 * rhs)
    }
}

impl Div<f32> for Pixels {
    type Output = Pixels;

    fn div(self, rhs: f32) -> Self::Output {
        Pixels(self.0 / rhs)
    }
}

impl Neg for Pixels {
    type Output = Pixels;

    fn neg(self) -> Self::Output {
        Pixels(-self.0)
    }
}

impl From<f32> for Pixels {
    fn from(pixels: f32) -> Self {
        Pixels(pixels)
    }
}

impl From<Pixels> for f32 {
    fn from(pixels: Pixels) -> Self {
        pixels.0
    }
}

/// A point in two dimensional space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

/// Constructs a [`Point`].
pub const fn point<T>(x: T, y: T) -> Point<T> {
    Point { x, y }
}

impl<T> Point<T> {
    pub fn map<U>(self, f: impl Fn(T) -> U) -> Point<U> {
        Point {
            x: f(self.x),
            y: f(self.y),
        }
    }
}

impl<T: Add<Output = T>> Add for Point<T> {
    type Output = Point<T>;

    fn add(self, rhs: Self) -> Self::Output {
        point(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Sub<Output = T>> Sub for Point<T> {
    type Output = Point<T>;

    fn sub(self, rhs: Self) -> Self::Output {
        point(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T: Neg<Output = T>> Neg for Point<T> {
    type Output = Point<T>;

    fn neg(self) -> Self::Output {
        point(-self.x, -self.y)
    }
}

impl<T: AddAssign> AddAssign for Point<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// A two dimensional extent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

/// Constructs a [`Size`].
pub const fn size<T>(width: T, height: T) -> Size<T> {
    Size { width, height }
}

impl<T> Size<T> {
    pub fn map<U>(self, f: impl Fn(T) -> U) -> Size<U> {
        Size {
            width: f(self.width),
            height: f(self.height),
        }
    }
}

impl Size<Pixels> {
    pub fn max(self, other: Self) -> Self {
        size(self.width.max(other.width), self.height.max(other.height))
    }

    pub fn is_empty(&self) -> bool {
        self.width <= Pixels::ZERO || self.height <= Pixels::ZERO
    }
}

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds<T> {
    pub origin: Point<T>,
    pub size: Size<T>,
}

impl Bounds<Pixels> {
    pub fn new(origin: Point<Pixels>, size: Size<Pixels>) -> Self {
        Bounds { origin, size }
    }

    /// Bounds of `size` whose `corner` sits at `position`.
    pub fn from_corner_and_size(
        corner: Corner,
        position: Point<Pixels>,
        size: Size<Pixels>,
    ) -> Self {
        let origin = match corner {
            Corner::TopLeft => position,
            Corner::TopRight => point(position.x - size.width, position.y),
            Corner::BottomLeft => point(position.x, position.y - size.height),
            Corner::BottomRight => point(position.x - size.width, position.y - size.height),
        };
        Bounds { origin, size }
    }

    /// Builds the bounds spanning two opposite corners.
    pub fn from_corners(top_left: Point<Pixels>, bottom_right: Point<Pixels>) -> Self {
        Bounds {
            origin: top_left,
            size: size(bottom_right.x - top_left.x, bottom_right.y - top_left.y),
        }
    }

    pub fn left(&self) -> Pixels {
        self.origin.x
    }

    pub fn top(&self) -> Pixels {
        self.origin.y
    }

    pub fn right(&self) -> Pixels {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> Pixels {
        self.origin.y + self.size.height
    }

    pub fn bottom_right(&self) -> Point<Pixels> {
        point(self.right(), self.bottom())
    }

    pub fn center(&self) -> Point<Pixels> {
        point(
            self.origin.x + self.size.width / 2.,
            self.origin.y + self.size.height / 2.,
        )
    }

    /// Whether `point` lies inside these bounds. The right and bottom edges are
    /// exclusive so adjacent siblings never both contain a shared edge.
    pub fn contains(&self, point: &Point<Pixels>) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Whether `other` lies entirely within these bounds.
    pub fn contains_bounds(&self, other: &Self) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// The overlapping region. Disjoint bounds produce an empty rectangle.
    pub fn intersect(&self, other: &Self) -> Self {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right()).max(left);
        let bottom = self.bottom().min(other.bottom()).max(top);
        Bounds::from_corners(point(left, top), point(right, bottom))
    }

    pub fn union(&self, other: &Self) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bounds::from_corners(point(left, top), point(right, bottom))
    }

    pub fn offset(&self, offset: Point<Pixels>) -> Self {
        Bounds {
            origin: self.origin + offset,
            size: self.size,
        }
    }

    /// Shrinks the bounds by the given edge widths.
    pub fn inset(&self, edges: &Edges<Pixels>) -> Self {
        Bounds {
            origin: point(self.origin.x + edges.left, self.origin.y + edges.top),
            size: size(
                (self.size.width - edges.left - edges.right).max(Pixels::ZERO),
                (self.size.height - edges.top - edges.bottom).max(Pixels::ZERO),
            ),
        }
    }

    /// Grows the bounds outward by `amount` on every side.
    pub fn dilate(&self, amount: Pixels) -> Self {
        Bounds {
            origin: point(self.origin.x - amount, self.origin.y - amount),
            size: size(
                self.size.width + amount * 2.,
                self.size.height + amount * 2.,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }
}

/// Values for each side of a box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Edges<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Clone> Edges<T> {
    pub fn all(value: T) -> Self {
        Edges {
            top: value.clone(),
            right: value.clone(),
            bottom: value.clone(),
            left: value,
        }
    }
}

impl Edges<Pixels> {
    pub fn is_zero(&self) -> bool {
        self.top == Pixels::ZERO
            && self.right == Pixels::ZERO
            && self.bottom == Pixels::ZERO
            && self.left == Pixels::ZERO
    }
}

/// Values for each corner of a box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Corners<T> {
    pub top_left: T,
    pub top_right: T,
    pub bottom_right: T,
    pub bottom_left: T,
}

impl<T: Clone> Corners<T> {
    pub fn all(value: T) -> Self {
        Corners {
            top_left: value.clone(),
            top_right: value.clone(),
            bottom_right: value.clone(),
            bottom_left: value,
        }
    }
}

/// Identifies a corner of a rectangle, used to anchor overlays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Corner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// The corner diagonally across.
    pub fn opposite(self) -> Self {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// The corner on the other side along the x axis.
    pub fn flip_horizontal(self) -> Self {
        match self {
            Corner::TopLeft => Corner::TopRight,
            Corner::TopRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::BottomRight,
            Corner::BottomRight => Corner::BottomLeft,
        }
    }

    pub fn flip_vertical(self) -> Self {
        match self {
            Corner::TopLeft => Corner::BottomLeft,
            Corner::TopRight => Corner::BottomRight,
            Corner::BottomLeft => Corner::TopLeft,
            Corner::BottomRight => Corner::TopRight,
        }
    }

    pub fn corner_of(self, bounds: &Bounds<Pixels>) -> Point<Pixels> {
        match self {
            Corner::TopLeft => bounds.origin,
            Corner::TopRight => point(bounds.right(), bounds.top()),
            Corner::BottomLeft => point(bounds.left(), bounds.bottom()),
            Corner::BottomRight => bounds.bottom_right(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(x: f32, y: f32, w: f32, h: f32) -> Bounds<Pixels> {
        Bounds::new(point(px(x), px(y)), size(px(w), px(h)))
    }

    #[test]
    fn test_contains_excludes_far_edges() {
        let b = bounds(0., 0., 10., 10.);
        assert!(b.contains(&point(px(0.), px(0.))));
        assert!(b.contains(&point(px(9.5), px(9.5))));
        assert!(!b.contains(&point(px(10.), px(5.))));
        assert!(!b.contains(&point(px(5.), px(-1.))));
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let a = bounds(0., 0., 10., 10.);
        let b = bounds(20., 20., 5., 5.);
        assert!(!a.intersects(&b));
        assert!(a.intersect(&b).is_empty());

        let c = bounds(5., 5., 10., 10.);
        assert_eq!(a.intersect(&c), bounds(5., 5., 5., 5.));
        assert_eq!(a.union(&c), bounds(0., 0., 15., 15.));
    }

    #[test]
    fn test_inset_never_goes_negative() {
        let b = bounds(0., 0., 10., 4.);
        let inset = b.inset(&Edges::all(px(3.)));
        assert_eq!(inset.origin, point(px(3.), px(3.)));
        assert_eq!(inset.size, size(px(4.), px(0.)));
    }
}
