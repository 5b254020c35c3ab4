use std::sync::Arc;

use crate::{
    buffer::PixelBuffer,
    capability::{
        HARMONIZE_GUIDANCE_SCALE, HARMONIZE_INFERENCE_STEPS, HARMONIZE_STRENGTH, ImageToImage,
        ImageToImageRequest, NEGATIVE_PROMPT,
    },
    compositor::{CutoutAsset, rasterize},
    core::Mood,
    error::AfficheResult,
};

/// Model name recorded when no refiner ran and the raster composite was
/// returned as-is.
pub const RASTER_COMPOSITE_MODEL: &str = "raster_composite";

/// Strength/guidance/steps for one harmonization pass. Defaults come from
/// the stock refinement tuning; `strength` trades fidelity to the raster
/// composite against stylistic change.
#[derive(Clone, Copy, Debug)]
pub struct HarmonizeParams {
    pub strength: f32,
    pub guidance_scale: f32,
    pub steps: u32,
    pub seed: Option<u64>,
}

impl Default for HarmonizeParams {
    fn default() -> Self {
        Self {
            strength: HARMONIZE_STRENGTH,
            guidance_scale: HARMONIZE_GUIDANCE_SCALE,
            steps: HARMONIZE_INFERENCE_STEPS,
            seed: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Harmonized {
    pub image: PixelBuffer,
    pub model: String,
    pub seed: Option<u64>,
}

impl Harmonized {
    pub fn is_fallback(&self) -> bool {
        self.model == RASTER_COMPOSITE_MODEL
    }
}

/// Wraps the compositor with an optional generative refinement pass. The
/// raster composite is always produced first and is the guaranteed result;
/// refiner absence or failure is never fatal.
#[derive(Clone, Default)]
pub struct Harmonizer {
    refiner: Option<Arc<dyn ImageToImage>>,
}

impl Harmonizer {
    pub fn new(refiner: Option<Arc<dyn ImageToImage>>) -> Self {
        Self { refiner }
    }

    #[tracing::instrument(skip(self, background, cutouts, prompt), fields(n = cutouts.len()))]
    pub fn harmonize(
        &self,
        background: &PixelBuffer,
        cutouts: &[CutoutAsset],
        prompt: &str,
        params: HarmonizeParams,
        mood: Mood,
    ) -> AfficheResult<Harmonized> {
        let composite = rasterize(background, cutouts, mood)?;

        let Some(refiner) = &self.refiner else {
            return Ok(Harmonized {
                image: composite,
                model: RASTER_COMPOSITE_MODEL.to_string(),
                seed: None,
            });
        };

        let req = ImageToImageRequest {
            prompt: prompt.to_string(),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
            init: composite.clone(),
            strength: params.strength,
            guidance_scale: params.guidance_scale,
            steps: params.steps,
            seed: params.seed,
        };

        match refiner.try_refine(&req) {
            Ok(refined) => {
                // Refinement models may change output dimensions; snap back
                // to the canvas.
                let refined = refined.resize(composite.width, composite.height)?;
                Ok(Harmonized {
                    image: refined,
                    model: refiner.model_id().to_string(),
                    seed: params.seed,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "harmonization failed, returning raster composite");
                Ok(Harmonized {
                    image: composite,
                    model: RASTER_COMPOSITE_MODEL.to_string(),
                    seed: None,
                })
            }
        }
    }
}
