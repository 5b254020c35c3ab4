use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    background::{BackgroundOption, BackgroundSynthesizer},
    buffer::PixelBuffer,
    compositor::CutoutAsset,
    context::{BackgroundMeta, CutoutRef, EventInfo, PromptContext, RenderContext, RenderContextStore, StylePrefs},
    core::{Bounds, CanvasSize},
    error::{AfficheError, AfficheResult},
    harmonize::{HarmonizeParams, Harmonized, Harmonizer},
    prompt::{build_background_prompt, build_harmonize_prompt},
};

/// A cutout the caller fetched for this session: identity plus raw encoded
/// bytes. Bytes that fail to decode are tolerated by omission.
#[derive(Clone, Debug)]
pub struct CutoutFetch {
    pub id: String,
    pub source: String,
    pub bytes: Vec<u8>,
    pub bounds: Bounds,
    pub z: i32,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct RenderVariant {
    pub size: CanvasSize,
    pub background: BackgroundOption,
    pub cutouts: Vec<CutoutRef>,
}

#[derive(Clone, Debug)]
pub struct RenderSession {
    pub render_id: String,
    pub campaign_id: String,
    pub variants: Vec<RenderVariant>,
}

/// Orchestrates one design session: background options, deterministic
/// compositing, optional harmonization, with session state recovered from
/// the context store between calls.
pub struct DesignPipeline {
    synthesizer: BackgroundSynthesizer,
    harmonizer: Harmonizer,
    contexts: Arc<RenderContextStore>,
    next_render: AtomicU64,
}

impl DesignPipeline {
    pub fn new(
        synthesizer: BackgroundSynthesizer,
        harmonizer: Harmonizer,
        contexts: Arc<RenderContextStore>,
    ) -> Self {
        Self {
            synthesizer,
            harmonizer,
            contexts,
            next_render: AtomicU64::new(1),
        }
    }

    pub fn contexts(&self) -> &Arc<RenderContextStore> {
        &self.contexts
    }

    /// Start a session: allocate a render id, store context, and produce one
    /// background option plus a default cutout grid per requested size.
    #[tracing::instrument(skip(self, event, style, cutout_sources), fields(campaign = campaign_id))]
    pub fn start_session(
        &self,
        campaign_id: &str,
        event: EventInfo,
        style: StylePrefs,
        cutout_sources: &[(String, String)],
    ) -> AfficheResult<RenderSession> {
        style.palette.validate()?;
        if style.sizes.is_empty() {
            return Err(AfficheError::validation(
                "style prefs must request at least one canvas size",
            ));
        }

        let render_id = self.allocate_render_id();
        let prompt_ctx = PromptContext {
            city: event.city.clone(),
            mood: style.mood,
            genre: event.genre.clone(),
            palette: style.palette.clone(),
        };
        let prompt = build_background_prompt(&prompt_ctx);

        let mut variants = Vec::with_capacity(style.sizes.len());
        let mut background_meta = Vec::new();
        let mut first_cutouts = Vec::new();
        for &size in &style.sizes {
            let background = self
                .synthesizer
                .generate(&prompt, size, &style.palette, None)?;
            background_meta.push(BackgroundMeta::of(&background));

            let cutouts = grid_layout(size, cutout_sources);
            if first_cutouts.is_empty() {
                first_cutouts = cutouts.clone();
            }
            variants.push(RenderVariant {
                size,
                background,
                cutouts,
            });
        }

        self.contexts.save(RenderContext {
            render_id: render_id.clone(),
            campaign_id: campaign_id.to_string(),
            event,
            style,
            backgrounds: background_meta,
            cutouts: first_cutouts,
            extra: Default::default(),
        });

        Ok(RenderSession {
            render_id,
            campaign_id: campaign_id.to_string(),
            variants,
        })
    }

    /// Harmonize one variant. The background must decode (fetch failure is
    /// fatal to this call); individual cutouts that fail to decode are
    /// skipped. The session's stored context supplies the prompt.
    #[tracing::instrument(skip(self, background_bytes, cutouts), fields(render = render_id))]
    pub fn harmonize_session(
        &self,
        render_id: &str,
        background_bytes: &[u8],
        cutouts: &[CutoutFetch],
        seed: Option<u64>,
    ) -> AfficheResult<Harmonized> {
        if self.contexts.get(render_id).is_none() {
            return Err(AfficheError::validation(format!(
                "unknown render id '{render_id}'"
            )));
        }

        let background = PixelBuffer::decode(background_bytes)
            .map_err(|e| AfficheError::fetch(format!("failed to decode background: {e}")))?;

        let mut assets = Vec::with_capacity(cutouts.len());
        for cut in cutouts {
            match PixelBuffer::decode(&cut.bytes) {
                Ok(image) => assets.push(CutoutAsset {
                    id: cut.id.clone(),
                    image,
                    bounds: cut.bounds,
                    z: cut.z,
                    visible: cut.visible,
                }),
                Err(e) => {
                    tracing::warn!(cutout = %cut.id, error = %e, "skipping undecodable cutout");
                }
            }
        }

        let prompt_ctx = self.contexts.prompt_context(render_id);
        let prompt = build_harmonize_prompt(prompt_ctx.city.as_deref(), Some(prompt_ctx.mood));
        let params = HarmonizeParams {
            seed,
            ..HarmonizeParams::default()
        };

        let result = self
            .harmonizer
            .harmonize(&background, &assets, &prompt, params, prompt_ctx.mood)?;

        self.contexts.update(render_id, |ctx| {
            ctx.extra
                .insert("model_harmonize".to_string(), result.model.clone());
        })?;

        Ok(result)
    }

    fn allocate_render_id(&self) -> String {
        let n = self.next_render.fetch_add(1, Ordering::Relaxed);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        format!("r-{nanos:x}-{n}")
    }
}

/// Default cutout layout: a left-to-right grid starting at x=150 and 45% of
/// the canvas height, stepping 220px, wrapping before the right margin, at
/// most ten subjects.
pub fn grid_layout(size: CanvasSize, sources: &[(String, String)]) -> Vec<CutoutRef> {
    let (w, h) = size.dimensions();
    let mut x = 150i32;
    let mut y = (h as f32 * 0.45) as i32;
    let mut z = 1i32;

    let mut out = Vec::new();
    for (id, source) in sources.iter().take(10) {
        out.push(CutoutRef {
            id: id.clone(),
            source: source.clone(),
            bounds: Bounds::new(x, y, 400, 600),
            z,
            visible: true,
        });
        x += 220;
        z += 1;
        if x > w as i32 - 400 {
            x = 150;
            y += 260;
        }
    }
    out
}
