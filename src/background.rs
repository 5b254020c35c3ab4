use std::{collections::BTreeMap, sync::Arc};

use crate::{
    buffer::PixelBuffer,
    capability::{
        BG_GUIDANCE_SCALE, BG_INFERENCE_STEPS, NEGATIVE_PROMPT, TextToImage, TextToImageRequest,
        enhance_prompt,
    },
    core::{CanvasSize, Palette},
    error::AfficheResult,
};

/// Model name recorded when the deterministic gradient path produced the
/// background.
pub const GRADIENT_FALLBACK_MODEL: &str = "gradient_fallback";

/// One candidate background for a render session. Several options may exist
/// per session; the caller picks one.
#[derive(Clone, Debug)]
pub struct BackgroundOption {
    pub image: PixelBuffer,
    pub prompt: String,
    pub model: String,
    pub seed: Option<u64>,
    pub size: CanvasSize,
    /// Caller-supplied passthrough metadata.
    pub extra: BTreeMap<String, String>,
}

impl BackgroundOption {
    pub fn is_fallback(&self) -> bool {
        self.model == GRADIENT_FALLBACK_MODEL
    }
}

/// Produces base images: generative when a [`TextToImage`] capability is
/// configured, otherwise (or on any capability failure) a vertical two-stop
/// gradient from the palette.
#[derive(Clone, Default)]
pub struct BackgroundSynthesizer {
    generator: Option<Arc<dyn TextToImage>>,
}

impl BackgroundSynthesizer {
    pub fn new(generator: Option<Arc<dyn TextToImage>>) -> Self {
        Self { generator }
    }

    /// Always succeeds as long as the palette is non-empty and well-formed.
    /// A single failed generative attempt falls through to the gradient; no
    /// retries.
    #[tracing::instrument(skip(self, palette), fields(size = ?size))]
    pub fn generate(
        &self,
        prompt: &str,
        size: CanvasSize,
        palette: &Palette,
        seed: Option<u64>,
    ) -> AfficheResult<BackgroundOption> {
        if let Some(generator) = &self.generator {
            let req = TextToImageRequest {
                prompt: enhance_prompt(prompt),
                negative_prompt: NEGATIVE_PROMPT.to_string(),
                width: size.width(),
                height: size.height(),
                guidance_scale: BG_GUIDANCE_SCALE,
                steps: BG_INFERENCE_STEPS,
                seed,
            };
            match generator.try_generate(&req) {
                Ok(image) => {
                    // Models occasionally return off-size output.
                    let image = image.resize(size.width(), size.height())?;
                    return Ok(BackgroundOption {
                        image,
                        prompt: req.prompt,
                        model: generator.model_id().to_string(),
                        seed,
                        size,
                        extra: BTreeMap::new(),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "background generation failed, using gradient fallback");
                }
            }
        }

        let image = gradient_background(size, palette)?;
        Ok(BackgroundOption {
            image,
            prompt: prompt.to_string(),
            model: GRADIENT_FALLBACK_MODEL.to_string(),
            seed: None,
            size,
            extra: BTreeMap::new(),
        })
    }
}

/// Deterministic vertical linear gradient between the first two palette
/// stops. A single-color palette yields a solid fill. Byte-identical across
/// calls for the same palette and size.
pub fn gradient_background(size: CanvasSize, palette: &Palette) -> AfficheResult<PixelBuffer> {
    let (top, bottom) = palette.gradient_stops()?;
    let (w, h) = size.dimensions();

    let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
    for y in 0..h {
        let t = if h > 1 {
            y as f32 / (h - 1) as f32
        } else {
            0.0
        };
        let row = [
            lerp_u8(top[0], bottom[0], t),
            lerp_u8(top[1], bottom[1], t),
            lerp_u8(top[2], bottom[2], t),
            255u8,
        ];
        for _ in 0..w {
            data.extend_from_slice(&row);
        }
    }
    PixelBuffer::from_raw_premul(w, h, data)
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    ((1.0 - t) * f32::from(a) + t * f32::from(b)) as u8
}
