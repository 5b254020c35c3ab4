use std::{collections::HashMap, sync::Mutex};

use crate::{
    background::BackgroundOption,
    core::{Bounds, CanvasSize, Mood, Palette},
    error::{AfficheError, AfficheResult},
};

/// Event metadata supplied by the upstream caller.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct EventInfo {
    pub title: String,
    pub city: Option<String>,
    pub date: Option<String>,
    pub audience: Option<String>,
    pub genre: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StylePrefs {
    pub mood: Mood,
    pub palette: Palette,
    pub sizes: Vec<CanvasSize>,
}

impl Default for StylePrefs {
    fn default() -> Self {
        Self {
            mood: Mood::Neon,
            palette: Palette::default(),
            sizes: vec![CanvasSize::Square],
        }
    }
}

/// Cutout metadata kept in context; pixel data stays with the caller.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CutoutRef {
    pub id: String,
    pub source: String,
    pub bounds: Bounds,
    pub z: i32,
    pub visible: bool,
}

/// Everything later pipeline stages need to recover about one render
/// session without re-supplying it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderContext {
    pub render_id: String,
    pub campaign_id: String,
    pub event: EventInfo,
    pub style: StylePrefs,
    pub backgrounds: Vec<BackgroundMeta>,
    pub cutouts: Vec<CutoutRef>,
    pub extra: HashMap<String, String>,
}

/// Serializable summary of a [`BackgroundOption`]; the pixel data itself is
/// an artifact, not context.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BackgroundMeta {
    pub prompt: String,
    pub model: String,
    pub seed: Option<u64>,
    pub size: CanvasSize,
}

impl BackgroundMeta {
    pub fn of(opt: &BackgroundOption) -> Self {
        Self {
            prompt: opt.prompt.clone(),
            model: opt.model.clone(),
            seed: opt.seed,
            size: opt.size,
        }
    }
}

/// Prompt-building view of a context, with the stock defaults when fields
/// are missing.
#[derive(Clone, Debug, PartialEq)]
pub struct PromptContext {
    pub city: Option<String>,
    pub mood: Mood,
    pub genre: Option<String>,
    pub palette: Palette,
}

impl Default for PromptContext {
    fn default() -> Self {
        Self {
            city: None,
            mood: Mood::Neon,
            genre: None,
            palette: Palette::default(),
        }
    }
}

/// Process-wide store of render session state, keyed by render id with a
/// campaign index. Overwrite-on-write; no conflict detection. Distinct
/// render ids never observe each other's state.
#[derive(Default)]
pub struct RenderContextStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    by_render: HashMap<String, RenderContext>,
    by_campaign: HashMap<String, Vec<String>>,
}

impl RenderContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, ctx: RenderContext) {
        let mut inner = self.inner.lock().expect("context store poisoned");
        let ids = inner.by_campaign.entry(ctx.campaign_id.clone()).or_default();
        if !ids.contains(&ctx.render_id) {
            ids.push(ctx.render_id.clone());
        }
        inner.by_render.insert(ctx.render_id.clone(), ctx);
    }

    /// Cloned snapshot; mutations go through [`RenderContextStore::update`].
    pub fn get(&self, render_id: &str) -> Option<RenderContext> {
        let inner = self.inner.lock().expect("context store poisoned");
        inner.by_render.get(render_id).cloned()
    }

    pub fn update(
        &self,
        render_id: &str,
        f: impl FnOnce(&mut RenderContext),
    ) -> AfficheResult<()> {
        let mut inner = self.inner.lock().expect("context store poisoned");
        let ctx = inner.by_render.get_mut(render_id).ok_or_else(|| {
            AfficheError::validation(format!("unknown render id '{render_id}'"))
        })?;
        f(ctx);
        Ok(())
    }

    pub fn renders_for_campaign(&self, campaign_id: &str) -> Vec<String> {
        let inner = self.inner.lock().expect("context store poisoned");
        inner
            .by_campaign
            .get(campaign_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Prompt view of a session's context; defaults when the id is unknown.
    pub fn prompt_context(&self, render_id: &str) -> PromptContext {
        match self.get(render_id) {
            Some(ctx) => PromptContext {
                city: ctx.event.city,
                mood: ctx.style.mood,
                genre: ctx.event.genre,
                palette: ctx.style.palette,
            },
            None => PromptContext::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(render_id: &str, campaign_id: &str) -> RenderContext {
        RenderContext {
            render_id: render_id.to_string(),
            campaign_id: campaign_id.to_string(),
            event: EventInfo {
                title: "Warehouse Nights".to_string(),
                city: Some("Berlin".to_string()),
                date: Some("2026-10-01".to_string()),
                audience: None,
                genre: Some("techno".to_string()),
            },
            style: StylePrefs::default(),
            backgrounds: vec![],
            cutouts: vec![],
            extra: HashMap::new(),
        }
    }

    #[test]
    fn save_then_get_round_trips() {
        let store = RenderContextStore::new();
        store.save(ctx("r1", "c1"));
        let got = store.get("r1").unwrap();
        assert_eq!(got.event.title, "Warehouse Nights");
        assert!(store.get("r2").is_none());
    }

    #[test]
    fn sessions_are_isolated_by_render_id() {
        let store = RenderContextStore::new();
        store.save(ctx("r1", "c1"));
        store.save(ctx("r2", "c1"));

        store
            .update("r1", |c| {
                c.cutouts.push(CutoutRef {
                    id: "a".to_string(),
                    source: "mem://a".to_string(),
                    bounds: Bounds::new(0, 0, 10, 10),
                    z: 1,
                    visible: true,
                });
            })
            .unwrap();

        assert_eq!(store.get("r1").unwrap().cutouts.len(), 1);
        assert!(store.get("r2").unwrap().cutouts.is_empty());
    }

    #[test]
    fn concurrent_sessions_never_observe_each_other() {
        let store = std::sync::Arc::new(RenderContextStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                let rid = format!("r{i}");
                store.save(ctx(&rid, "c1"));
                for j in 0..50 {
                    store
                        .update(&rid, |c| {
                            c.extra.insert(format!("k{j}"), rid.clone());
                        })
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..8 {
            let got = store.get(&format!("r{i}")).unwrap();
            assert_eq!(got.extra.len(), 50);
            for v in got.extra.values() {
                assert_eq!(v, &format!("r{i}"));
            }
        }
        assert_eq!(store.renders_for_campaign("c1").len(), 8);
    }

    #[test]
    fn update_unknown_render_id_is_an_error() {
        let store = RenderContextStore::new();
        assert!(store.update("missing", |_| {}).is_err());
    }

    #[test]
    fn prompt_context_defaults_when_unknown() {
        let store = RenderContextStore::new();
        let pc = store.prompt_context("nope");
        assert_eq!(pc, PromptContext::default());
        assert_eq!(pc.mood, Mood::Neon);
        assert_eq!(pc.palette, Palette::new(["#9D00FF", "#00FFD1"]));
    }

    #[test]
    fn prompt_context_reads_saved_style() {
        let store = RenderContextStore::new();
        let mut c = ctx("r1", "c1");
        c.style.mood = Mood::Retro;
        store.save(c);
        let pc = store.prompt_context("r1");
        assert_eq!(pc.mood, Mood::Retro);
        assert_eq!(pc.city.as_deref(), Some("Berlin"));
        assert_eq!(pc.genre.as_deref(), Some("techno"));
    }

    #[test]
    fn resaving_overwrites_without_duplicating_campaign_index() {
        let store = RenderContextStore::new();
        store.save(ctx("r1", "c1"));
        store.save(ctx("r1", "c1"));
        assert_eq!(store.renders_for_campaign("c1"), vec!["r1".to_string()]);
    }
}
