pub mod color;
pub mod theme;

pub(crate) use color::Chroma;
pub use color::{Hsl, Rgb};
pub use theme::{Palette, PaletteSlot, ThemeData, ThemeUpdate, DEFAULT_BACKGROUND_URL};
