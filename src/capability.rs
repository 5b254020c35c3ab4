use crate::{buffer::PixelBuffer, error::AfficheResult};

/// Quality modifiers appended to generation prompts (top three are used).
pub const QUALITY_MODIFIERS: [&str; 6] = [
    "professional photography quality",
    "high resolution",
    "sharp details",
    "vibrant colors",
    "cinematic composition",
    "perfect lighting",
];

/// Things every generation should avoid, joined into one negative prompt.
pub const NEGATIVE_PROMPT: &str =
    "blurry, low quality, distorted faces, extra limbs, text, watermarks, logos";

/// Text-to-image generation parameters (background pass).
pub const BG_GUIDANCE_SCALE: f32 = 3.5;
pub const BG_INFERENCE_STEPS: u32 = 28;

/// Image-to-image refinement parameters (harmonization pass). Lower strength
/// preserves more of the raster composite's geometry.
pub const HARMONIZE_STRENGTH: f32 = 0.45;
pub const HARMONIZE_GUIDANCE_SCALE: f32 = 4.0;
pub const HARMONIZE_INFERENCE_STEPS: u32 = 28;

pub fn enhance_prompt(base: &str) -> String {
    let mods = QUALITY_MODIFIERS[..3].join(", ");
    format!("{} {}.", base.trim(), mods)
}

#[derive(Clone, Debug)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f32,
    pub steps: u32,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ImageToImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub init: PixelBuffer,
    pub strength: f32,
    pub guidance_scale: f32,
    pub steps: u32,
    pub seed: Option<u64>,
}

/// External text-to-image capability. Optional everywhere it is consumed; a
/// missing or failing implementation triggers the deterministic fallback,
/// never an error to the pipeline caller.
pub trait TextToImage: Send + Sync {
    /// Stable identifier recorded in artifact metadata, e.g. a model name.
    fn model_id(&self) -> &str;

    fn try_generate(&self, req: &TextToImageRequest) -> AfficheResult<PixelBuffer>;
}

/// External image-to-image refinement capability, same fallback discipline
/// as [`TextToImage`].
pub trait ImageToImage: Send + Sync {
    fn model_id(&self) -> &str;

    fn try_refine(&self, req: &ImageToImageRequest) -> AfficheResult<PixelBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhance_prompt_appends_top_three_modifiers() {
        let p = enhance_prompt("midnight rooftop concert");
        assert!(p.starts_with("midnight rooftop concert"));
        assert!(p.contains("professional photography quality"));
        assert!(p.contains("sharp details"));
        assert!(!p.contains("vibrant colors"));
    }

    #[test]
    fn negative_prompt_lists_artifacts_to_avoid() {
        assert!(NEGATIVE_PROMPT.contains("watermarks"));
        assert!(NEGATIVE_PROMPT.contains("blurry"));
    }
}
