use std::io::Cursor;

use anyhow::Context as _;

use crate::error::{AfficheError, AfficheResult};

/// Owned RGBA8 raster with **premultiplied** alpha.
///
/// Everything downstream of decode works in premultiplied space; straight
/// alpha exists only at the decode/encode boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> AfficheResult<Self> {
        let len = buffer_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    /// Buffer filled with one straight-alpha color (premultiplied on store).
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> AfficheResult<Self> {
        let len = buffer_len(width, height)?;
        let px = premultiply(rgba);
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / 4 {
            data.extend_from_slice(&px);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_raw_premul(width: u32, height: u32, data: Vec<u8>) -> AfficheResult<Self> {
        let len = buffer_len(width, height)?;
        if data.len() != len {
            return Err(AfficheError::validation(
                "pixel buffer data must match width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode PNG/JPEG/... bytes into a premultiplied buffer.
    pub fn decode(bytes: &[u8]) -> AfficheResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = rgba.into_raw();
        premultiply_rgba8_in_place(&mut data);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Encode as PNG, unpremultiplying back to straight alpha.
    pub fn encode_png(&self) -> AfficheResult<Vec<u8>> {
        let mut straight = self.data.clone();
        unpremultiply_rgba8_in_place(&mut straight);
        let img = image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| AfficheError::validation("pixel buffer dimensions are inconsistent"))?;
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(out)
    }

    /// Resize with a quality-preserving filter (Catmull-Rom).
    pub fn resize(&self, width: u32, height: u32) -> AfficheResult<Self> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        if width == 0 || height == 0 {
            return Err(AfficheError::validation("resize target must be non-zero"));
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| AfficheError::validation("pixel buffer dimensions are inconsistent"))?;
        let resized =
            image::imageops::resize(&img, width, height, image::imageops::FilterType::CatmullRom);
        Ok(Self {
            width,
            height,
            data: resized.into_raw(),
        })
    }

    /// Premultiplied pixel at (x, y). Coordinates must be in bounds;
    /// out-of-bounds access panics.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{} buffer",
            self.width,
            self.height
        );
        let idx = ((y * self.width + x) as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Pixel converted back to straight alpha, for analysis and sampling.
    pub fn straight_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        unpremultiply(self.pixel(x, y))
    }

    /// Source-over composite of `src` at (x, y), clipping to this buffer.
    /// Off-canvas regions of `src` are silently dropped.
    pub fn composite_over(&mut self, src: &PixelBuffer, x: i32, y: i32) {
        for sy in 0..src.height as i32 {
            let dy = y + sy;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width as i32 {
                let dx = x + sx;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                let s = src.pixel(sx as u32, sy as u32);
                if s[3] == 0 && s[0] == 0 && s[1] == 0 && s[2] == 0 {
                    continue;
                }
                let didx = ((dy as u32 * self.width + dx as u32) as usize) * 4;
                let d = [
                    self.data[didx],
                    self.data[didx + 1],
                    self.data[didx + 2],
                    self.data[didx + 3],
                ];
                let out = over(d, s);
                self.data[didx..didx + 4].copy_from_slice(&out);
            }
        }
    }

    /// Alpha plane of this buffer.
    pub fn alpha(&self) -> Vec<u8> {
        self.data.chunks_exact(4).map(|px| px[3]).collect()
    }

    /// Rec.601 grayscale over straight-alpha pixels, one f32 per pixel in
    /// 0..=255.
    pub fn to_gray(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|px| {
                let s = unpremultiply([px[0], px[1], px[2], px[3]]);
                0.299 * f32::from(s[0]) + 0.587 * f32::from(s[1]) + 0.114 * f32::from(s[2])
            })
            .collect()
    }
}

fn buffer_len(width: u32, height: u32) -> AfficheResult<usize> {
    if width == 0 || height == 0 {
        return Err(AfficheError::validation(
            "pixel buffer dimensions must be non-zero",
        ));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| AfficheError::validation("pixel buffer size overflow"))
}

/// Premultiplied source-over. Opacity folding is not needed here; shadow and
/// rim layers bake their opacity into the alpha mask.
pub fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = u16::from(src[3]);
    if sa == 0 && src[0] == 0 && src[1] == 0 && src[2] == 0 {
        return dst;
    }
    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = src[i].saturating_add(dc);
    }
    out
}

pub fn premultiply(rgba: [u8; 4]) -> [u8; 4] {
    let a = u16::from(rgba[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    [
        ((u16::from(rgba[0]) * a + 127) / 255) as u8,
        ((u16::from(rgba[1]) * a + 127) / 255) as u8,
        ((u16::from(rgba[2]) * a + 127) / 255) as u8,
        rgba[3],
    ]
}

pub fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = u16::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    [
        ((u16::from(px[0]) * 255 + a / 2) / a).min(255) as u8,
        ((u16::from(px[1]) * 255 + a / 2) / a).min(255) as u8,
        ((u16::from(px[2]) * 255 + a / 2) / a).min(255) as u8,
        px[3],
    ]
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = unpremultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
