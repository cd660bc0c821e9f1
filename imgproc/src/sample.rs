use image::{GrayImage, RgbImage};

use crate::Interpolation;

/// Out-of-bounds handling for one raster axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    Constant(u8),
    Replicate,
    Wrap,
}

fn map_coord(coord: isize, len: usize, mode: BorderMode) -> Option<usize> {
    let n = len as isize;
    if n <= 0 {
        return None;
    }

    match mode {
        BorderMode::Constant(_) => {
            if coord < 0 || coord >= n {
                None
            } else {
                Some(coord as usize)
            }
        }
        BorderMode::Replicate => Some(coord.clamp(0, n - 1) as usize),
        BorderMode::Wrap => {
            let mut c = coord % n;
            if c < 0 {
                c += n;
            }
            Some(c as usize)
        }
    }
}

fn border_fallback(border_x: BorderMode, border_y: BorderMode) -> f32 {
    match (border_x, border_y) {
        (BorderMode::Constant(v), _) | (_, BorderMode::Constant(v)) => v as f32,
        _ => 0.0,
    }
}

fn sample_gray(
    img: &GrayImage,
    x: isize,
    y: isize,
    border_x: BorderMode,
    border_y: BorderMode,
) -> f32 {
    let width = img.width() as usize;
    let raw = img.as_raw();

    match (
        map_coord(x, width, border_x),
        map_coord(y, img.height() as usize, border_y),
    ) {
        (Some(ix), Some(iy)) => raw[iy * width + ix] as f32,
        _ => border_fallback(border_x, border_y),
    }
}

fn sample_rgb(
    img: &RgbImage,
    x: isize,
    y: isize,
    border_x: BorderMode,
    border_y: BorderMode,
) -> [f32; 3] {
    let width = img.width() as usize;
    let raw = img.as_raw();

    match (
        map_coord(x, width, border_x),
        map_coord(y, img.height() as usize, border_y),
    ) {
        (Some(ix), Some(iy)) => {
            let idx = (iy * width + ix) * 3;
            [raw[idx] as f32, raw[idx + 1] as f32, raw[idx + 2] as f32]
        }
        _ => [border_fallback(border_x, border_y); 3],
    }
}

fn bilinear_gray(
    img: &GrayImage,
    x: f32,
    y: f32,
    border_x: BorderMode,
    border_y: BorderMode,
) -> f32 {
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let v00 = sample_gray(img, x0, y0, border_x, border_y);
    let v10 = sample_gray(img, x0 + 1, y0, border_x, border_y);
    let v01 = sample_gray(img, x0, y0 + 1, border_x, border_y);
    let v11 = sample_gray(img, x0 + 1, y0 + 1, border_x, border_y);

    let v0 = v00 * (1.0 - fx) + v10 * fx;
    let v1 = v01 * (1.0 - fx) + v11 * fx;
    v0 * (1.0 - fy) + v1 * fy
}

fn bilinear_rgb(
    img: &RgbImage,
    x: f32,
    y: f32,
    border_x: BorderMode,
    border_y: BorderMode,
) -> [f32; 3] {
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let v00 = sample_rgb(img, x0, y0, border_x, border_y);
    let v10 = sample_rgb(img, x0 + 1, y0, border_x, border_y);
    let v01 = sample_rgb(img, x0, y0 + 1, border_x, border_y);
    let v11 = sample_rgb(img, x0 + 1, y0 + 1, border_x, border_y);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let v0 = v00[c] * (1.0 - fx) + v10[c] * fx;
        let v1 = v01[c] * (1.0 - fx) + v11[c] * fx;
        out[c] = v0 * (1.0 - fy) + v1 * fy;
    }
    out
}

// Area interpolation is only meaningful for forward resizes; in a gather
// (backward-mapping) sample it degrades to bilinear.
pub(crate) fn interpolate_gray(
    img: &GrayImage,
    x: f32,
    y: f32,
    interpolation: Interpolation,
    border_x: BorderMode,
    border_y: BorderMode,
) -> f32 {
    match interpolation {
        Interpolation::Nearest => {
            sample_gray(img, x.round() as isize, y.round() as isize, border_x, border_y)
        }
        Interpolation::Linear | Interpolation::Area => {
            bilinear_gray(img, x, y, border_x, border_y)
        }
    }
}

pub(crate) fn interpolate_rgb(
    img: &RgbImage,
    x: f32,
    y: f32,
    interpolation: Interpolation,
    border_x: BorderMode,
    border_y: BorderMode,
) -> [f32; 3] {
    match interpolation {
        Interpolation::Nearest => {
            sample_rgb(img, x.round() as isize, y.round() as isize, border_x, border_y)
        }
        Interpolation::Linear | Interpolation::Area => {
            bilinear_rgb(img, x, y, border_x, border_y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_border_wraps_both_ways() {
        let mut img = GrayImage::new(4, 3);
        img.put_pixel(3, 1, image::Luma([200]));
        let v = sample_gray(&img, -1, 1, BorderMode::Wrap, BorderMode::Replicate);
        assert_eq!(v, 200.0);
        let v = sample_gray(&img, 7, 1, BorderMode::Wrap, BorderMode::Replicate);
        assert_eq!(v, 200.0);
    }

    #[test]
    fn replicate_border_clamps() {
        let mut img = GrayImage::new(4, 3);
        img.put_pixel(0, 0, image::Luma([50]));
        let v = sample_gray(&img, -5, -5, BorderMode::Replicate, BorderMode::Replicate);
        assert_eq!(v, 50.0);
    }

    #[test]
    fn constant_border_outside() {
        let img = GrayImage::new(4, 3);
        let v = sample_gray(&img, 10, 0, BorderMode::Constant(7), BorderMode::Constant(7));
        assert_eq!(v, 7.0);
    }
}
