//! # Flash
//!
//! The runtime core of a retained-mode UI toolkit.
//!
//! Application state lives in entities owned by the [`App`]. Code reaches an entity
//! through a handle and a context, and a value being updated is leased out of the
//! store, so it can never be aliased. Side effects such as notifications, events, focus
//! changes and releases are queued as effects and applied
//! in order once the outermost update returns.
//!
//! Views are entities that implement [`Render`]. Every frame a dirty window renders its
//! root view into a tree of [`Element`]s and drives it through three phases:
//! `request_layout` (bottom-up, against the [`LayoutEngine`]), `prepaint` (hit-test
//! nodes, focus, scroll and overlay registration) and `paint` (primitives into a
//! [`Scene`]). Input is routed through the hit-test tree of the last rendered frame.
//!
//! The embedder supplies a [`Platform`], forwards animation frames to
//! [`App::on_animation_frame`] and raw input to [`App::dispatch_input`].

mod app;
mod color;
mod element;
mod elements;
mod error;
mod executor;
mod focus;
mod geometry;
mod hit_test;
mod input;
mod key_dispatch;
mod overlay;
mod platform;
mod scene;
mod scheduler;
mod scroll;
mod shared_string;
mod style;
mod subscription;
mod taffy;
mod text_system;
mod util;
mod view;
mod window;

pub use app::*;
pub use color::*;
pub use element::*;
pub use elements::*;
pub use error::*;
pub use executor::*;
pub use focus::*;
pub use geometry::*;
pub use hit_test::*;
pub use input::*;
pub use key_dispatch::*;
pub use overlay::*;
pub use platform::*;
pub use scene::*;
pub use scheduler::*;
pub use scroll::*;
pub use shared_string::*;
pub use style::*;
pub use subscription::Subscription;
pub use self::taffy::*;
pub use text_system::*;
pub use util::*;
pub use view::*;
pub use window::*;
