use crate::{context::PromptContext, core::Mood};

/// Evocative per-mood wording used by the prompt builders.
pub fn mood_description(mood: Mood) -> &'static str {
    match mood {
        Mood::Neon => "electric neon glow, saturated magenta and cyan light, night energy",
        Mood::Retro => "warm analog film grain, faded sunset tones, vintage poster texture",
        Mood::Minimal => "clean negative space, soft even lighting, restrained palette",
        Mood::Lush => "dense organic detail, deep greens, humid atmospheric light",
    }
}

/// Deterministic background prompt from saved session context. The
/// generative text layer that could enrich this further is an external
/// collaborator; this builder works without it.
pub fn build_background_prompt(ctx: &PromptContext) -> String {
    let mut parts = vec!["event poster background".to_string()];
    if let Some(genre) = &ctx.genre {
        parts.push(format!("{genre} music scene"));
    }
    if let Some(city) = &ctx.city {
        parts.push(format!("inspired by {city} nightlife"));
    }
    parts.push(mood_description(ctx.mood).to_string());
    if !ctx.palette.is_empty() {
        parts.push(format!("color palette {}", ctx.palette.0.join(" ")));
    }
    parts.push("no text, no people in foreground".to_string());
    parts.join(", ")
}

/// Prompt for the image-to-image harmonization pass.
pub fn build_harmonize_prompt(city: Option<&str>, mood: Option<Mood>) -> String {
    let mut p = String::from(
        "blend the performers seamlessly into the background, unify lighting and color grading, \
         consistent shadows and reflections",
    );
    if let Some(mood) = mood {
        p.push_str(", ");
        p.push_str(mood_description(mood));
    }
    if let Some(city) = city {
        p.push_str(&format!(", {city} atmosphere"));
    }
    p
}
