#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod layout;
pub mod layout_dump;
pub mod template;
pub mod text_metrics;
pub mod theme;

/// Logical slide canvas, 16:9.
pub const SLIDE_WIDTH: f32 = 1000.0;
pub const SLIDE_HEIGHT: f32 = 562.5;

pub use config::{load_config, EngineConfig};
pub use layout::{LayoutEngine, LayoutError, LayoutResult, SlideLayout};
pub use template::{SlideData, Template, TemplateSelector};
pub use theme::Theme;

#[cfg(feature = "cli")]
pub use cli::run;
