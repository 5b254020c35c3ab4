#![forbid(unsafe_code)]

pub mod background;
pub mod blur;
pub mod buffer;
pub mod capability;
pub mod compositor;
pub mod context;
pub mod core;
pub mod error;
pub mod harmonize;
pub mod pipeline;
pub mod prompt;
pub mod quality;
pub mod store;
pub mod text_zones;

pub use background::{BackgroundOption, BackgroundSynthesizer, GRADIENT_FALLBACK_MODEL, gradient_background};
pub use buffer::PixelBuffer;
pub use capability::{ImageToImage, ImageToImageRequest, TextToImage, TextToImageRequest};
pub use compositor::{CutoutAsset, ShadowSpec, rasterize, shadow_spec};
pub use context::{EventInfo, PromptContext, RenderContext, RenderContextStore, StylePrefs};
pub use core::{Bounds, CanvasSize, Mood, Palette};
pub use error::{AfficheError, AfficheResult};
pub use harmonize::{HarmonizeParams, Harmonized, Harmonizer, RASTER_COMPOSITE_MODEL};
pub use pipeline::{CutoutFetch, DesignPipeline, RenderSession, RenderVariant};
pub use quality::{QualityMetrics, QualityReport, analyze, analyze_bytes};
pub use store::{ArtifactStore, MemoryStore, artifact_path};
pub use text_zones::{TextPlacementReport, TextZoneSuggestion, optimize, optimize_bytes};
