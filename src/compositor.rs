use crate::{
    blur::blur_premul,
    buffer::PixelBuffer,
    core::{Bounds, Mood},
    error::AfficheResult,
};

/// A subject cutout to place on the canvas. The compositor only reads it;
/// the caller keeps ownership for the duration of one rasterize call.
#[derive(Clone, Debug)]
pub struct CutoutAsset {
    pub id: String,
    pub image: PixelBuffer,
    pub bounds: Bounds,
    pub z: i32,
    pub visible: bool,
}

/// Per-mood shadow parameters. `blur_radius` is the soft ambient radius; the
/// contact shadow reuses it at one third (min 2) with alpha scaled by 0.8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowSpec {
    pub blur_radius: u32,
    pub dx: i32,
    pub dy: i32,
    pub alpha: u8,
    pub rgb: [u8; 3],
    pub rim_light: bool,
}

pub fn shadow_spec(mood: Mood) -> ShadowSpec {
    match mood {
        Mood::Neon => ShadowSpec {
            blur_radius: 30,
            dx: -12,
            dy: 18,
            alpha: 140,
            rgb: [10, 0, 30],
            rim_light: true,
        },
        Mood::Retro => ShadowSpec {
            blur_radius: 18,
            dx: 16,
            dy: 16,
            alpha: 120,
            rgb: [40, 20, 10],
            rim_light: false,
        },
        Mood::Minimal => ShadowSpec {
            blur_radius: 12,
            dx: 0,
            dy: 8,
            alpha: 90,
            rgb: [0, 0, 0],
            rim_light: false,
        },
        Mood::Lush => ShadowSpec {
            blur_radius: 36,
            dx: -8,
            dy: 24,
            alpha: 110,
            rgb: [5, 25, 10],
            rim_light: false,
        },
    }
}

const CONTACT_RADIUS_DIV: u32 = 3;
const CONTACT_ALPHA_SCALE: f32 = 0.8;
const RIM_RADIUS: u32 = 6;
const RIM_ALPHA: u8 = 160;
const RIM_RGB: [u8; 3] = [0, 255, 209]; // #00FFD1

/// Deterministic composite: cutouts over the background, back to front, with
/// two mood-driven shadow layers beneath each cutout and an optional neon rim
/// glow. The result always has the background's dimensions; out-of-canvas
/// bounds clip silently. An empty cutout list returns the background
/// unchanged.
#[tracing::instrument(skip(background, cutouts), fields(n = cutouts.len(), mood = mood.name()))]
pub fn rasterize(
    background: &PixelBuffer,
    cutouts: &[CutoutAsset],
    mood: Mood,
) -> AfficheResult<PixelBuffer> {
    let mut canvas = background.clone();

    let mut order: Vec<&CutoutAsset> = cutouts.iter().filter(|c| c.visible).collect();
    order.sort_by_key(|c| c.z);

    let spec = shadow_spec(mood);
    for cut in order {
        if cut.bounds.w == 0 || cut.bounds.h == 0 {
            continue;
        }
        let resized = cut.image.resize(cut.bounds.w, cut.bounds.h)?;
        let mask = resized.alpha();

        let ambient = shadow_layer(
            &mask,
            cut.bounds.w,
            cut.bounds.h,
            spec.blur_radius,
            spec.rgb,
            spec.alpha,
        )?;
        canvas.composite_over(
            &ambient.image,
            cut.bounds.x + spec.dx - ambient.pad,
            cut.bounds.y + spec.dy - ambient.pad,
        );

        let contact_radius = (spec.blur_radius / CONTACT_RADIUS_DIV).max(2);
        let contact_alpha = (f32::from(spec.alpha) * CONTACT_ALPHA_SCALE).round() as u8;
        let contact = shadow_layer(
            &mask,
            cut.bounds.w,
            cut.bounds.h,
            contact_radius,
            spec.rgb,
            contact_alpha,
        )?;
        canvas.composite_over(
            &contact.image,
            cut.bounds.x + spec.dx - contact.pad,
            cut.bounds.y + spec.dy - contact.pad,
        );

        if spec.rim_light {
            let rim = rim_layer(&mask, cut.bounds.w, cut.bounds.h)?;
            canvas.composite_over(
                &rim.image,
                cut.bounds.x - rim.pad,
                cut.bounds.y - rim.pad,
            );
        }

        canvas.composite_over(&resized, cut.bounds.x, cut.bounds.y);
    }

    Ok(canvas)
}

struct PaddedLayer {
    image: PixelBuffer,
    pad: i32,
}

/// Tinted, blurred copy of a cutout's alpha mask. Padded so the blur can
/// spread past the cutout's own bounds.
fn shadow_layer(
    mask: &[u8],
    w: u32,
    h: u32,
    radius: u32,
    rgb: [u8; 3],
    alpha: u8,
) -> AfficheResult<PaddedLayer> {
    let pad = radius;
    let lw = w + 2 * pad;
    let lh = h + 2 * pad;

    let mut data = vec![0u8; (lw as usize) * (lh as usize) * 4];
    for y in 0..h {
        for x in 0..w {
            let m = mask[(y * w + x) as usize];
            if m == 0 {
                continue;
            }
            let a = ((u16::from(m) * u16::from(alpha) + 127) / 255) as u8;
            let idx = (((y + pad) * lw + x + pad) as usize) * 4;
            let a16 = u16::from(a);
            data[idx] = ((u16::from(rgb[0]) * a16 + 127) / 255) as u8;
            data[idx + 1] = ((u16::from(rgb[1]) * a16 + 127) / 255) as u8;
            data[idx + 2] = ((u16::from(rgb[2]) * a16 + 127) / 255) as u8;
            data[idx + 3] = a;
        }
    }

    let layer = PixelBuffer::from_raw_premul(lw, lh, data)?;
    let sigma = (radius as f32 / 2.0).max(0.5);
    Ok(PaddedLayer {
        image: blur_premul(&layer, radius, sigma)?,
        pad: pad as i32,
    })
}

/// Cyan glow along the cutout's alpha edge: blurred mask minus the mask
/// itself, so only the halo outside (and at the fringe of) the subject
/// remains.
fn rim_layer(mask: &[u8], w: u32, h: u32) -> AfficheResult<PaddedLayer> {
    let pad = RIM_RADIUS;
    let lw = w + 2 * pad;
    let lh = h + 2 * pad;

    let mut padded = vec![0u8; (lw as usize) * (lh as usize) * 4];
    for y in 0..h {
        for x in 0..w {
            let m = mask[(y * w + x) as usize];
            if m == 0 {
                continue;
            }
            let idx = (((y + pad) * lw + x + pad) as usize) * 4;
            padded[idx] = m;
            padded[idx + 1] = m;
            padded[idx + 2] = m;
            padded[idx + 3] = m;
        }
    }

    let sigma = (RIM_RADIUS as f32 / 2.0).max(0.5);
    let blurred = blur_premul(
        &PixelBuffer::from_raw_premul(lw, lh, padded)?,
        RIM_RADIUS,
        sigma,
    )?;

    let mut data = vec![0u8; blurred.data.len()];
    for y in 0..lh {
        for x in 0..lw {
            let idx = ((y * lw + x) as usize) * 4;
            let spread = blurred.data[idx + 3];
            let inside = if x >= pad && x < pad + w && y >= pad && y < pad + h {
                mask[((y - pad) * w + (x - pad)) as usize]
            } else {
                0
            };
            let edge = spread.saturating_sub(inside);
            if edge == 0 {
                continue;
            }
            let a = ((u16::from(edge) * u16::from(RIM_ALPHA) + 127) / 255) as u8;
            let a16 = u16::from(a);
            data[idx] = ((u16::from(RIM_RGB[0]) * a16 + 127) / 255) as u8;
            data[idx + 1] = ((u16::from(RIM_RGB[1]) * a16 + 127) / 255) as u8;
            data[idx + 2] = ((u16::from(RIM_RGB[2]) * a16 + 127) / 255) as u8;
            data[idx + 3] = a;
        }
    }

    Ok(PaddedLayer {
        image: PixelBuffer::from_raw_premul(lw, lh, data)?,
        pad: pad as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CanvasSize;

    fn red_square(side: u32) -> PixelBuffer {
        PixelBuffer::filled(side, side, [255, 0, 0, 255]).unwrap()
    }

    fn cutout(id: &str, image: PixelBuffer, bounds: Bounds, z: i32, visible: bool) -> CutoutAsset {
        CutoutAsset {
            id: id.to_string(),
            image,
            bounds,
            z,
            visible,
        }
    }

    #[test]
    fn empty_cutout_list_returns_background_unchanged() {
        for size in [CanvasSize::Square, CanvasSize::Story] {
            let bg = PixelBuffer::filled(size.width(), size.height(), [30, 40, 50, 255]).unwrap();
            let out = rasterize(&bg, &[], Mood::Neon).unwrap();
            assert_eq!((out.width, out.height), size.dimensions());
            assert_eq!(out.data, bg.data);
        }
    }

    #[test]
    fn each_mood_selects_its_documented_parameters() {
        assert_eq!(
            shadow_spec(Mood::Neon),
            ShadowSpec {
                blur_radius: 30,
                dx: -12,
                dy: 18,
                alpha: 140,
                rgb: [10, 0, 30],
                rim_light: true
            }
        );
        assert_eq!(
            shadow_spec(Mood::Retro),
            ShadowSpec {
                blur_radius: 18,
                dx: 16,
                dy: 16,
                alpha: 120,
                rgb: [40, 20, 10],
                rim_light: false
            }
        );
        assert_eq!(
            shadow_spec(Mood::Minimal),
            ShadowSpec {
                blur_radius: 12,
                dx: 0,
                dy: 8,
                alpha: 90,
                rgb: [0, 0, 0],
                rim_light: false
            }
        );
        assert_eq!(
            shadow_spec(Mood::Lush),
            ShadowSpec {
                blur_radius: 36,
                dx: -8,
                dy: 24,
                alpha: 110,
                rgb: [5, 25, 10],
                rim_light: false
            }
        );

        // All specs are pairwise distinct.
        let specs: Vec<_> = Mood::ALL.iter().map(|&m| shadow_spec(m)).collect();
        for i in 0..specs.len() {
            for j in (i + 1)..specs.len() {
                assert_ne!(specs[i], specs[j]);
            }
        }
    }

    #[test]
    fn opaque_cutout_lands_pure_at_its_center() {
        let bg = PixelBuffer::filled(2048, 2048, [0, 0, 0, 255]).unwrap();
        let cuts = [cutout(
            "a",
            red_square(100),
            Bounds::new(0, 0, 100, 100),
            1,
            true,
        )];
        let out = rasterize(&bg, &cuts, Mood::Minimal).unwrap();
        assert_eq!((out.width, out.height), (2048, 2048));
        assert_eq!(out.pixel(50, 50), [255, 0, 0, 255]);
    }

    #[test]
    fn shadow_darkens_background_below_the_cutout() {
        // Gray background so the darkening is observable.
        let bg = PixelBuffer::filled(512, 512, [128, 128, 128, 255]).unwrap();
        let cuts = [cutout(
            "a",
            red_square(100),
            Bounds::new(100, 100, 100, 100),
            1,
            true,
        )];
        let out = rasterize(&bg, &cuts, Mood::Minimal).unwrap();

        // Minimal offsets straight down by 8; just below the cutout's bottom
        // edge sits inside both shadow layers.
        let px = out.pixel(150, 205);
        assert!(px[0] < 128, "expected shadow darker than background, got {px:?}");
        assert_ne!(px, [255, 0, 0, 255]);

        // Far corner stays untouched.
        assert_eq!(out.pixel(500, 20), [128, 128, 128, 255]);
    }

    #[test]
    fn invisible_cutout_contributes_nothing() {
        let bg = PixelBuffer::filled(256, 256, [128, 128, 128, 255]).unwrap();
        let cuts = [cutout(
            "hidden",
            red_square(64),
            Bounds::new(50, 50, 64, 64),
            1,
            false,
        )];
        let out = rasterize(&bg, &cuts, Mood::Retro).unwrap();
        assert_eq!(out.data, bg.data);
    }

    #[test]
    fn z_order_decides_paint_order() {
        let bg = PixelBuffer::filled(256, 256, [0, 0, 0, 255]).unwrap();
        let red = cutout("r", red_square(64), Bounds::new(40, 40, 64, 64), 5, true);
        let blue = cutout(
            "b",
            PixelBuffer::filled(64, 64, [0, 0, 255, 255]).unwrap(),
            Bounds::new(40, 40, 64, 64),
            1,
            true,
        );
        // Listed red-first, but blue's lower z paints first, so red wins.
        let out = rasterize(&bg, &[red, blue], Mood::Minimal).unwrap();
        assert_eq!(out.pixel(72, 72), [255, 0, 0, 255]);
    }

    #[test]
    fn out_of_canvas_bounds_clip_silently() {
        let bg = PixelBuffer::filled(128, 128, [10, 10, 10, 255]).unwrap();
        let cuts = [cutout(
            "edge",
            red_square(64),
            Bounds::new(100, 100, 64, 64),
            1,
            true,
        )];
        let out = rasterize(&bg, &cuts, Mood::Lush).unwrap();
        assert_eq!((out.width, out.height), (128, 128));
        assert_eq!(out.pixel(110, 110), [255, 0, 0, 255]);
    }

    #[test]
    fn neon_rim_tints_the_edge_cyan() {
        let bg = PixelBuffer::filled(256, 256, [0, 0, 0, 255]).unwrap();
        let cuts = [cutout(
            "a",
            red_square(64),
            Bounds::new(96, 96, 64, 64),
            1,
            true,
        )];
        let out = rasterize(&bg, &cuts, Mood::Neon).unwrap();

        // Just above the cutout's top edge, outside the shadow offset
        // direction, the rim glow should read green/blue heavy.
        let px = out.pixel(128, 93);
        assert!(px[1] > px[0], "expected cyan-tinted rim, got {px:?}");
        assert!(px[2] > 0);
    }

    #[test]
    fn non_neon_moods_have_no_rim() {
        let bg = PixelBuffer::filled(256, 256, [0, 0, 0, 255]).unwrap();
        let cuts = [cutout(
            "a",
            red_square(64),
            Bounds::new(96, 96, 64, 64),
            1,
            true,
        )];
        let out = rasterize(&bg, &cuts, Mood::Minimal).unwrap();
        let px = out.pixel(128, 93);
        // Minimal's black shadow cannot raise green above red.
        assert!(px[1] <= px[0], "unexpected rim tint for minimal: {px:?}");
    }
}
