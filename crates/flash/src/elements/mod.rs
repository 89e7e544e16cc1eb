mod canvas;
mod div;
mod menu;
mod text;

pub use canvas::*;
pub use div::*;
pub use menu::*;
pub use text::*;
