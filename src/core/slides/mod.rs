pub mod slide_generator;
pub mod slide_models;
pub mod slide_renderer;

pub use slide_generator::{SlideGeneratorTool, SLIDE_GENERATOR_TOOL};
pub use slide_models::{Slide, SlideKind};
pub use slide_renderer::slides_to_markdown;
