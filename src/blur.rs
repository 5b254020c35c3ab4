use crate::{
    buffer::PixelBuffer,
    error::{AfficheError, AfficheResult},
};

/// Separable Gaussian blur of a premultiplied buffer, clamp-to-edge. This is
/// what softens the compositor's shadow and rim layers; radius 0 is the
/// identity.
pub fn blur_premul(src: &PixelBuffer, radius: u32, sigma: f32) -> AfficheResult<PixelBuffer> {
    if radius == 0 {
        return Ok(src.clone());
    }
    let kernel = kernel_q16(radius, sigma)?;
    let (w, h) = (src.width as usize, src.height as usize);

    let mut tmp = vec![0u8; src.data.len()];
    let mut out = vec![0u8; src.data.len()];
    separable_pass(&src.data, &mut tmp, w, h, &kernel, Axis::X);
    separable_pass(&tmp, &mut out, w, h, &kernel, Axis::Y);
    PixelBuffer::from_raw_premul(src.width, src.height, out)
}

/// Gaussian blur over a single-channel f32 plane (analyzer grayscale maps).
/// Same clamp-to-edge policy as the RGBA path.
pub fn blur_gray(src: &[f32], width: u32, height: u32, radius: u32, sigma: f32) -> AfficheResult<Vec<f32>> {
    if src.len() != (width as usize) * (height as usize) {
        return Err(AfficheError::validation(
            "blur_gray expects src matching width*height",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(AfficheError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights = Vec::<f32>::with_capacity((2 * r + 1) as usize);
    let denom = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for i in -r..=r {
        let x = i as f32;
        let w = (-x * x / denom).exp();
        weights.push(w);
        sum += w;
    }
    for w in &mut weights {
        *w /= sum;
    }

    let w = width as i32;
    let h = height as i32;
    let mut tmp = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kw) in weights.iter().enumerate() {
                let sx = (x + ki as i32 - r).clamp(0, w - 1);
                acc += kw * src[(y * w + sx) as usize];
            }
            tmp[(y * w + x) as usize] = acc;
        }
    }
    let mut out = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kw) in weights.iter().enumerate() {
                let sy = (y + ki as i32 - r).clamp(0, h - 1);
                acc += kw * tmp[(sy * w + x) as usize];
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    Ok(out)
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// One 1-D convolution pass over all four channels, along either axis.
/// Weights are Q16 fixed point so the accumulator stays integral.
fn separable_pass(src: &[u8], dst: &mut [u8], w: usize, h: usize, kernel: &[u32], axis: Axis) {
    let r = (kernel.len() / 2) as i32;
    let (outer, inner) = match axis {
        Axis::X => (h, w),
        Axis::Y => (w, h),
    };
    let index = |o: usize, i: usize| match axis {
        Axis::X => (o * w + i) * 4,
        Axis::Y => (i * w + o) * 4,
    };

    for o in 0..outer {
        for i in 0..inner {
            let mut acc = [0u64; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let s = (i as i32 + ki as i32 - r).clamp(0, inner as i32 - 1) as usize;
                let idx = index(o, s);
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let idx = index(o, i);
            for c in 0..4 {
                dst[idx + c] = ((acc[c] + 0x8000) >> 16).min(255) as u8;
            }
        }
    }
}

/// Normalized Gaussian weights in Q16. Rounding drift lands on the center
/// tap so the weights always sum to exactly 1.0 and constant regions stay
/// constant.
fn kernel_q16(radius: u32, sigma: f32) -> AfficheResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(AfficheError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let raw: Vec<f64> = (-r..=r)
        .map(|i| (-(f64::from(i) * f64::from(i)) / denom).exp())
        .collect();
    let sum: f64 = raw.iter().sum();

    let mut weights: Vec<u32> = raw
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round() as u32)
        .collect();
    let total: i64 = weights.iter().map(|&q| i64::from(q)).sum();
    let center = weights.len() / 2;
    weights[center] = (i64::from(weights[center]) + (65536 - total)).clamp(0, 65536) as u32;
    Ok(weights)
}
