use crate::error::{AfficheError, AfficheResult};

/// Target canvas for one render variant. Dimensions are fixed per variant and
/// every composite produced for it has exactly these dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasSize {
    Square,
    Story,
}

impl CanvasSize {
    pub fn width(self) -> u32 {
        match self {
            CanvasSize::Square => 2048,
            CanvasSize::Story => 1080,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            CanvasSize::Square => 2048,
            CanvasSize::Story => 1920,
        }
    }

    pub fn dimensions(self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// Lighting/shadow mood for a render. Selects the compositor's shadow table
/// entry and whether rim lighting is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neon,
    Retro,
    Minimal,
    Lush,
}

impl Mood {
    pub fn name(self) -> &'static str {
        match self {
            Mood::Neon => "neon",
            Mood::Retro => "retro",
            Mood::Minimal => "minimal",
            Mood::Lush => "lush",
        }
    }

    pub const ALL: [Mood; 4] = [Mood::Neon, Mood::Retro, Mood::Minimal, Mood::Lush];
}

/// Ordered list of hex colors supplied by the caller. Never empty when
/// consumed; [`Palette::default`] carries the stock neon pair.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Palette(pub Vec<String>);

impl Palette {
    pub fn new(colors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(colors.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> AfficheResult<()> {
        if self.0.is_empty() {
            return Err(AfficheError::validation("palette must not be empty"));
        }
        for c in &self.0 {
            parse_hex_color(c)?;
        }
        Ok(())
    }

    /// First two stops as parsed RGB. A single-color palette duplicates its
    /// only stop, which makes the gradient fallback a solid fill.
    pub fn gradient_stops(&self) -> AfficheResult<([u8; 3], [u8; 3])> {
        let first = self
            .0
            .first()
            .ok_or_else(|| AfficheError::validation("palette must not be empty"))?;
        let top = parse_hex_color(first)?;
        let bottom = match self.0.get(1) {
            Some(c) => parse_hex_color(c)?,
            None => top,
        };
        Ok((top, bottom))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::new(["#9D00FF", "#00FFD1"])
    }
}

pub fn parse_hex_color(s: &str) -> AfficheResult<[u8; 3]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(AfficheError::validation(format!(
            "color '{s}' must be #RRGGBB"
        )));
    }
    let mut out = [0u8; 3];
    for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
        let part = std::str::from_utf8(chunk)
            .map_err(|_| AfficheError::validation(format!("color '{s}' must be #RRGGBB")))?;
        out[i] = u8::from_str_radix(part, 16)
            .map_err(|_| AfficheError::validation(format!("color '{s}' has invalid hex digits")))?;
    }
    Ok(out)
}

/// Cutout/text bounding box in canvas coordinates. May extend past the
/// canvas; the compositor clips via buffer bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Bounds {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}
