use crate::{
    buffer::PixelBuffer,
    core::{Bounds, CanvasSize},
    error::AfficheResult,
};

/// One candidate text band, ranked by suitability (higher = calmer region).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextZoneSuggestion {
    pub zone_id: String,
    pub bounds: Bounds,
    pub activity_score: f32,
    pub suitability: f32,
    pub background_color: [u8; 3],
    pub recommended_text_color: String,
    pub contrast_ratio: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionType {
    Centered,
    EdgeFocused,
    Balanced,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextPlacementReport {
    pub zones: Vec<TextZoneSuggestion>,
    pub composition_type: CompositionType,
    pub background_complexity: f32,
}

pub const WHITE_TEXT: &str = "#FFFFFF";
pub const BLACK_TEXT: &str = "#000000";

/// Analyze encoded background bytes. Decode failure falls back to the fixed
/// default zones; this entry point never errors.
pub fn optimize_bytes(bytes: &[u8], size: CanvasSize) -> TextPlacementReport {
    match PixelBuffer::decode(bytes) {
        Ok(image) => optimize(&image, size),
        Err(e) => {
            tracing::warn!(error = %e, "background analysis failed, using default zones");
            default_report(size)
        }
    }
}

/// Scan the background for low-activity bands and rank them for text.
#[tracing::instrument(skip(image), fields(w = image.width, h = image.height))]
pub fn optimize(image: &PixelBuffer, size: CanvasSize) -> TextPlacementReport {
    match analyze_composition(image, size) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(error = %e, "background analysis failed, using default zones");
            default_report(size)
        }
    }
}

fn analyze_composition(image: &PixelBuffer, size: CanvasSize) -> AfficheResult<TextPlacementReport> {
    let gray = image.to_gray();
    let (w, h) = (image.width as usize, image.height as usize);
    if w < 3 || h < 3 {
        return Ok(default_report(size));
    }

    // Activity (Sobel magnitude) and local 3x3 contrast over the interior.
    let (aw, ah) = (w - 2, h - 2);
    let mut activity = vec![0.0f32; aw * ah];
    let mut contrast = vec![0.0f32; aw * ah];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut region = [0.0f32; 9];
            for ky in 0..3 {
                for kx in 0..3 {
                    region[ky * 3 + kx] = gray[(y + ky - 1) * w + (x + kx - 1)];
                }
            }
            let gx = -region[0] + region[2] - 2.0 * region[3] + 2.0 * region[5] - region[6]
                + region[8];
            let gy = -region[0] - 2.0 * region[1] - region[2] + region[6] + 2.0 * region[7]
                + region[8];
            activity[(y - 1) * aw + (x - 1)] = (gx * gx + gy * gy).sqrt();

            let m = region.iter().sum::<f32>() / 9.0;
            let var = region.iter().map(|v| (v - m).powi(2)).sum::<f32>() / 9.0;
            contrast[(y - 1) * aw + (x - 1)] = var.sqrt();
        }
    }

    let bands = candidate_bands(image.width, image.height, size);
    let mut zones = Vec::with_capacity(bands.len());
    for (i, band) in bands.iter().enumerate() {
        let Some(score) = band_activity(&activity, &contrast, aw, ah, band) else {
            continue;
        };
        let avg = average_color(image, band)?;
        let text_color = recommend_text_color(avg);
        zones.push(TextZoneSuggestion {
            zone_id: format!("zone_{i}"),
            bounds: *band,
            activity_score: score,
            suitability: 1.0 / (1.0 + score),
            background_color: avg,
            recommended_text_color: text_color.to_string(),
            contrast_ratio: contrast_ratio(avg, text_color),
        });
    }

    zones.sort_by(|a, b| b.suitability.total_cmp(&a.suitability));
    zones.truncate(3);

    Ok(TextPlacementReport {
        zones,
        composition_type: detect_composition_type(&activity, aw, ah),
        background_complexity: mean(&activity),
    })
}

/// Horizontal candidate bands: three for square canvases, four for tall
/// story canvases.
fn candidate_bands(w: u32, h: u32, size: CanvasSize) -> Vec<Bounds> {
    let (w, h) = (w as i32, h as i32);
    match size {
        CanvasSize::Square => {
            let band = h / 4;
            vec![
                Bounds::new(0, 0, w as u32, band as u32),
                Bounds::new(0, h / 2 - band / 2, w as u32, band as u32),
                Bounds::new(0, h - band, w as u32, band as u32),
            ]
        }
        CanvasSize::Story => {
            let band = h / 6;
            vec![
                Bounds::new(0, 0, w as u32, band as u32),
                Bounds::new(0, h / 3, w as u32, band as u32),
                Bounds::new(0, 2 * h / 3, w as u32, band as u32),
                Bounds::new(0, h - band, w as u32, band as u32),
            ]
        }
    }
}

/// Mean of activity + 0.5 * contrast inside the band, clipped to the
/// interior maps. `None` when the band misses the maps entirely.
fn band_activity(
    activity: &[f32],
    contrast: &[f32],
    aw: usize,
    ah: usize,
    band: &Bounds,
) -> Option<f32> {
    let x1 = band.x.max(0) as usize;
    let y1 = band.y.max(0) as usize;
    let x2 = ((band.x + band.w as i32) as usize).min(aw);
    let y2 = ((band.y + band.h as i32) as usize).min(ah);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let mut sum = 0.0f32;
    let mut n = 0usize;
    for y in y1..y2 {
        for x in x1..x2 {
            sum += activity[y * aw + x] + 0.5 * contrast[y * aw + x];
            n += 1;
        }
    }
    Some(sum / n as f32)
}

/// Average straight-alpha color of a band, via a 10x10 downsample of the
/// cropped region.
fn average_color(image: &PixelBuffer, band: &Bounds) -> AfficheResult<[u8; 3]> {
    let x1 = band.x.clamp(0, image.width as i32 - 1) as u32;
    let y1 = band.y.clamp(0, image.height as i32 - 1) as u32;
    let x2 = ((band.x + band.w as i32).max(x1 as i32 + 1) as u32).min(image.width);
    let y2 = ((band.y + band.h as i32).max(y1 as i32 + 1) as u32).min(image.height);
    let (cw, ch) = (x2 - x1, y2 - y1);

    let mut crop = PixelBuffer::new(cw, ch)?;
    for y in 0..ch {
        for x in 0..cw {
            let src = image.pixel(x1 + x, y1 + y);
            let idx = ((y * cw + x) as usize) * 4;
            crop.data[idx..idx + 4].copy_from_slice(&src);
        }
    }
    let small = crop.resize(10.min(cw), 10.min(ch))?;

    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    let mut n = 0u64;
    for y in 0..small.height {
        for x in 0..small.width {
            let px = small.straight_pixel(x, y);
            r += u64::from(px[0]);
            g += u64::from(px[1]);
            b += u64::from(px[2]);
            n += 1;
        }
    }
    Ok([(r / n) as u8, (g / n) as u8, (b / n) as u8])
}

/// White text on dark regions, black on light ones.
pub fn recommend_text_color(bg: [u8; 3]) -> &'static str {
    if relative_luminance(bg) < 0.5 {
        WHITE_TEXT
    } else {
        BLACK_TEXT
    }
}

pub fn contrast_ratio(bg: [u8; 3], text_color: &str) -> f32 {
    let bg_lum = relative_luminance(bg);
    let text_lum = if text_color == WHITE_TEXT { 1.0 } else { 0.0 };
    let lighter = bg_lum.max(text_lum);
    let darker = bg_lum.min(text_lum);
    (lighter + 0.05) / (darker + 0.05)
}

fn relative_luminance(rgb: [u8; 3]) -> f32 {
    (0.299 * f32::from(rgb[0]) + 0.587 * f32::from(rgb[1]) + 0.114 * f32::from(rgb[2])) / 255.0
}

/// Centered when the middle ninth carries 1.5x the edge activity, edge
/// focused for the opposite, balanced otherwise.
fn detect_composition_type(activity: &[f32], aw: usize, ah: usize) -> CompositionType {
    if aw < 3 || ah < 3 {
        return CompositionType::Balanced;
    }

    let mut center_sum = 0.0f32;
    let mut center_n = 0usize;
    for y in ah / 3..2 * ah / 3 {
        for x in aw / 3..2 * aw / 3 {
            center_sum += activity[y * aw + x];
            center_n += 1;
        }
    }
    let center = if center_n == 0 {
        0.0
    } else {
        center_sum / center_n as f32
    };

    let mut edge_means = Vec::with_capacity(4);
    edge_means.push(region_mean(activity, aw, 0..aw, 0..ah / 3));
    edge_means.push(region_mean(activity, aw, 0..aw, 2 * ah / 3..ah));
    edge_means.push(region_mean(activity, aw, 0..aw / 3, 0..ah));
    edge_means.push(region_mean(activity, aw, 2 * aw / 3..aw, 0..ah));
    let edge = edge_means.iter().sum::<f32>() / edge_means.len() as f32;

    if center > edge * 1.5 {
        CompositionType::Centered
    } else if edge > center * 1.5 {
        CompositionType::EdgeFocused
    } else {
        CompositionType::Balanced
    }
}

fn region_mean(
    map: &[f32],
    stride: usize,
    xs: std::ops::Range<usize>,
    ys: std::ops::Range<usize>,
) -> f32 {
    let mut sum = 0.0f32;
    let mut n = 0usize;
    for y in ys {
        for x in xs.clone() {
            sum += map[y * stride + x];
            n += 1;
        }
    }
    if n == 0 { 0.0 } else { sum / n as f32 }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Fixed top/bottom zones used when the background cannot be analyzed.
pub fn default_report(size: CanvasSize) -> TextPlacementReport {
    let (top, bottom) = match size {
        CanvasSize::Square => (
            Bounds::new(100, 50, 1848, 300),
            Bounds::new(100, 1648, 1848, 300),
        ),
        CanvasSize::Story => (
            Bounds::new(80, 50, 920, 200),
            Bounds::new(80, 1620, 920, 200),
        ),
    };

    let zone = |id: &str, bounds: Bounds| TextZoneSuggestion {
        zone_id: id.to_string(),
        bounds,
        activity_score: 0.5,
        suitability: 0.8,
        background_color: [0, 0, 0],
        recommended_text_color: WHITE_TEXT.to_string(),
        contrast_ratio: 7.0,
    };

    TextPlacementReport {
        zones: vec![zone("top", top), zone("bottom", bottom)],
        composition_type: CompositionType::Balanced,
        background_complexity: 0.5,
    }
}
