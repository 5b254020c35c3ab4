use crate::{
    blur::blur_gray,
    buffer::PixelBuffer,
    error::{AfficheError, AfficheResult},
};

// Metric thresholds. These are tunable heuristics, not calibrated aesthetic
// ground truth; the score weights below assume them.
pub const SHARPNESS_THRESHOLD: f32 = 100.0;
pub const CONTRAST_THRESHOLD: f32 = 50.0;
pub const COLOR_HARMONY_THRESHOLD: f32 = 0.7;
pub const BRIGHTNESS_RANGE: (f32, f32) = (50.0, 200.0);
pub const COMPOSITION_THRESHOLD: f32 = 0.6;
pub const NOISE_RECOMMENDATION_THRESHOLD: f32 = 10.0;

/// The seven raw metrics, each a pure function of the pixel buffer.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct QualityMetrics {
    pub sharpness: f32,
    pub contrast: f32,
    pub brightness: f32,
    pub color_harmony: f32,
    pub composition: f32,
    pub noise: f32,
    pub saturation: f32,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct QualityReport {
    pub width: u32,
    pub height: u32,
    pub metrics: QualityMetrics,
    /// Weighted aggregate in [0, 1].
    pub score: f32,
    pub grade: String,
    pub recommendations: Vec<String>,
}

/// Analyze encoded image bytes. Undecodable input is an explicit error; no
/// partial report is ever returned.
pub fn analyze_bytes(bytes: &[u8]) -> AfficheResult<QualityReport> {
    let image = PixelBuffer::decode(bytes)
        .map_err(|e| AfficheError::analysis(format!("failed to decode image: {e}")))?;
    analyze(&image)
}

#[tracing::instrument(skip(image), fields(w = image.width, h = image.height))]
pub fn analyze(image: &PixelBuffer) -> AfficheResult<QualityReport> {
    if image.width < 3 || image.height < 3 {
        return Err(AfficheError::analysis(
            "image too small to analyze (need at least 3x3)",
        ));
    }

    let gray = image.to_gray();
    let (w, h) = (image.width, image.height);

    let metrics = QualityMetrics {
        sharpness: measure_sharpness(&gray, w, h),
        contrast: stddev(&gray),
        brightness: mean(&gray),
        color_harmony: measure_color_harmony(image)?,
        composition: measure_composition(&gray, w, h),
        noise: measure_noise(&gray, w, h)?,
        saturation: measure_saturation(image)?,
    };

    let score = quality_score(&metrics);
    Ok(QualityReport {
        width: w,
        height: h,
        metrics,
        score,
        grade: grade(score).to_string(),
        recommendations: recommendations(&metrics),
    })
}

/// Variance of the absolute Laplacian response over the grayscale interior.
fn measure_sharpness(gray: &[f32], w: u32, h: u32) -> f32 {
    let (w, h) = (w as usize, h as usize);
    let mut responses = Vec::with_capacity((w - 2) * (h - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = gray[y * w + x];
            let lap = 4.0 * c
                - gray[(y - 1) * w + x]
                - gray[(y + 1) * w + x]
                - gray[y * w + x - 1]
                - gray[y * w + x + 1];
            responses.push(lap.abs());
        }
    }
    variance(&responses)
}

/// Hue variance over a downsampled copy, near-grayscale pixels excluded.
/// Low variance reads as harmonious.
fn measure_color_harmony(image: &PixelBuffer) -> AfficheResult<f32> {
    let small = image.resize(100.min(image.width), 100.min(image.height))?;
    let mut hues = Vec::new();
    'outer: for y in 0..small.height {
        for x in 0..small.width {
            if hues.len() >= 1000 {
                break 'outer;
            }
            let px = small.straight_pixel(x, y);
            let (hue, sat, _) = rgb_to_hsv(px[0], px[1], px[2]);
            if sat > 0.1 {
                hues.push(hue);
            }
        }
    }
    if hues.is_empty() {
        return Ok(0.5);
    }
    let var = variance(&hues);
    Ok((1.0 - var * 2.0).clamp(0.0, 1.0))
}

/// Rule-of-thirds proximity of high-gradient interest points. Points above
/// the 90th-percentile gradient magnitude are scored by inverse distance to
/// the nearest thirds intersection.
fn measure_composition(gray: &[f32], w: u32, h: u32) -> f32 {
    let (wi, hi) = (w as usize, h as usize);

    let mut grads = Vec::with_capacity(2 * wi * hi);
    for y in 0..hi {
        for x in 0..wi - 1 {
            grads.push((gray[y * wi + x + 1] - gray[y * wi + x]).abs());
        }
    }
    for y in 0..hi - 1 {
        for x in 0..wi {
            grads.push((gray[(y + 1) * wi + x] - gray[y * wi + x]).abs());
        }
    }
    let threshold = percentile_90(&mut grads);

    let mut points = Vec::<(f32, f32)>::new();
    'scan: for y in 1..hi - 1 {
        for x in 1..wi - 1 {
            let gx = (gray[y * wi + x] - gray[y * wi + x - 1]).abs();
            let gy = (gray[y * wi + x] - gray[(y - 1) * wi + x]).abs();
            if gx > threshold || gy > threshold {
                points.push((x as f32, y as f32));
                if points.len() >= 20 {
                    break 'scan;
                }
            }
        }
    }
    if points.is_empty() {
        return 0.5;
    }

    let thirds = [
        (w as f32 / 3.0, h as f32 / 3.0),
        (w as f32 / 3.0, 2.0 * h as f32 / 3.0),
        (2.0 * w as f32 / 3.0, h as f32 / 3.0),
        (2.0 * w as f32 / 3.0, 2.0 * h as f32 / 3.0),
    ];

    let mut sum = 0.0f32;
    for (px, py) in &points {
        let mut min_d = f32::MAX;
        for (ix, iy) in &thirds {
            let d = ((px - ix).powi(2) + (py - iy).powi(2)).sqrt();
            min_d = min_d.min(d);
        }
        sum += (1.0 - min_d / (w as f32 * 0.1)).max(0.0);
    }
    sum / points.len() as f32
}

/// Standard deviation of the residual between the image and a lightly
/// blurred copy of itself.
fn measure_noise(gray: &[f32], w: u32, h: u32) -> AfficheResult<f32> {
    let blurred = blur_gray(gray, w, h, 2, 1.0)?;
    let residual: Vec<f32> = gray.iter().zip(&blurred).map(|(a, b)| a - b).collect();
    Ok(stddev(&residual))
}

fn measure_saturation(image: &PixelBuffer) -> AfficheResult<f32> {
    let small = image.resize(50.min(image.width), 50.min(image.height))?;
    let mut sum = 0.0f32;
    let mut n = 0usize;
    for y in 0..small.height {
        for x in 0..small.width {
            let px = small.straight_pixel(x, y);
            let (_, sat, _) = rgb_to_hsv(px[0], px[1], px[2]);
            sum += sat;
            n += 1;
        }
    }
    Ok(if n == 0 { 0.0 } else { sum / n as f32 })
}

/// Fixed weighted sum: sharpness 25%, contrast 20%, brightness-in-range 15%,
/// color harmony 20%, composition 20%.
pub fn quality_score(m: &QualityMetrics) -> f32 {
    let sharpness = (m.sharpness / SHARPNESS_THRESHOLD).min(1.0);
    let contrast = (m.contrast / CONTRAST_THRESHOLD).min(1.0);
    let brightness = if m.brightness >= BRIGHTNESS_RANGE.0 && m.brightness <= BRIGHTNESS_RANGE.1 {
        1.0
    } else {
        0.5
    };
    sharpness * 0.25 + contrast * 0.2 + brightness * 0.15 + m.color_harmony * 0.2 + m.composition * 0.2
}

pub fn grade(score: f32) -> &'static str {
    if score >= 0.9 {
        "A+"
    } else if score >= 0.8 {
        "A"
    } else if score >= 0.7 {
        "B+"
    } else if score >= 0.6 {
        "B"
    } else if score >= 0.5 {
        "C+"
    } else if score >= 0.4 {
        "C"
    } else {
        "D"
    }
}

fn recommendations(m: &QualityMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if m.sharpness < SHARPNESS_THRESHOLD {
        out.push("Increase inference steps for sharper details".to_string());
    }
    if m.contrast < CONTRAST_THRESHOLD {
        out.push("Enhance contrast in prompt or post-processing".to_string());
    }
    if m.brightness < BRIGHTNESS_RANGE.0 {
        out.push("Image too dark - adjust lighting in prompt".to_string());
    } else if m.brightness > BRIGHTNESS_RANGE.1 {
        out.push("Image too bright - reduce exposure in prompt".to_string());
    }
    if m.color_harmony < COLOR_HARMONY_THRESHOLD {
        out.push("Improve color harmony with better palette specification".to_string());
    }
    if m.composition < COMPOSITION_THRESHOLD {
        out.push("Enhance composition with rule of thirds guidance".to_string());
    }
    if m.noise > NOISE_RECOMMENDATION_THRESHOLD {
        out.push("Reduce noise by increasing guidance scale".to_string());
    }

    if out.is_empty() {
        out.push("Quality looks good! Consider minor refinements.".to_string());
    }
    out
}

/// Hue in [0,1), saturation and value in [0,1].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max };
    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        (((g - b) / delta) % 6.0) / 6.0
    } else if max == g {
        (((b - r) / delta) + 2.0) / 6.0
    } else {
        (((r - g) / delta) + 4.0) / 6.0
    };
    let h = if h < 0.0 { h + 1.0 } else { h };
    (h, s, v)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64) as f32
}

fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = f64::from(mean(values));
    (values
        .iter()
        .map(|&v| (f64::from(v) - m).powi(2))
        .sum::<f64>()
        / values.len() as f64) as f32
}

fn stddev(values: &[f32]) -> f32 {
    variance(values).sqrt()
}

fn percentile_90(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * 0.9) as usize;
    let idx = idx.min(values.len() - 1);
    let (_, v, _) = values.select_nth_unstable_by(idx, |a, b| a.total_cmp(b));
    *v
}
