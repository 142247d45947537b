pub mod theme_generator;

pub use theme_generator::{DominantHue, GeneratorSettings, ThemeGenerator};
