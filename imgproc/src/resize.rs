use image::{GrayImage, RgbImage};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    Linear,
    /// Pixel-area averaging; best for decimation, falls back to linear when
    /// upscaling.
    Area,
}

pub fn resize(src: &GrayImage, width: u32, height: u32, interpolation: Interpolation) -> GrayImage {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return GrayImage::new(0, 0);
    }

    match interpolation {
        Interpolation::Nearest => resize_nearest(src, width, height),
        Interpolation::Linear => resize_linear(src, width, height),
        Interpolation::Area => {
            if width < src.width() && height < src.height() {
                resize_area(src, width, height)
            } else {
                resize_linear(src, width, height)
            }
        }
    }
}

pub fn resize_rgb(
    src: &RgbImage,
    width: u32,
    height: u32,
    interpolation: Interpolation,
) -> RgbImage {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return RgbImage::new(0, 0);
    }

    match interpolation {
        Interpolation::Nearest => resize_nearest_rgb(src, width, height),
        Interpolation::Linear => resize_linear_rgb(src, width, height),
        Interpolation::Area => {
            if width < src.width() && height < src.height() {
                resize_area_rgb(src, width, height)
            } else {
                resize_linear_rgb(src, width, height)
            }
        }
    }
}

fn resize_nearest(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut dst = GrayImage::new(width, height);
    let sx = src.width() as f32 / width as f32;
    let sy = src.height() as f32 / height as f32;

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let src_y = ((y as f32 * sy).floor() as u32).min(src.height() - 1);
            for x in 0..width {
                let src_x = ((x as f32 * sx).floor() as u32).min(src.width() - 1);
                row[x as usize] = src.get_pixel(src_x, src_y)[0];
            }
        });
    dst
}

fn resize_nearest_rgb(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let mut dst = RgbImage::new(width, height);
    let sx = src.width() as f32 / width as f32;
    let sy = src.height() as f32 / height as f32;

    dst.as_mut()
        .par_chunks_mut(width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| {
            let src_y = ((y as f32 * sy).floor() as u32).min(src.height() - 1);
            for x in 0..width {
                let src_x = ((x as f32 * sx).floor() as u32).min(src.width() - 1);
                let p = src.get_pixel(src_x, src_y);
                for c in 0..3 {
                    row[x as usize * 3 + c] = p[c];
                }
            }
        });
    dst
}

fn linear_axis_scale(dst: u32, src: u32) -> f32 {
    if dst > 1 {
        (src.saturating_sub(1)) as f32 / (dst - 1) as f32
    } else {
        0.0
    }
}

fn resize_linear(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut dst = GrayImage::new(width, height);
    let sx = linear_axis_scale(width, src.width());
    let sy = linear_axis_scale(height, src.height());

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let fy = y as f32 * sy;
            let y0 = fy as u32;
            let y1 = (y0 + 1).min(src.height() - 1);
            let dy = fy - y0 as f32;
            for x in 0..width {
                let fx = x as f32 * sx;
                let x0 = fx as u32;
                let x1 = (x0 + 1).min(src.width() - 1);
                let dx = fx - x0 as f32;

                let v00 = src.get_pixel(x0, y0)[0] as f32;
                let v10 = src.get_pixel(x1, y0)[0] as f32;
                let v01 = src.get_pixel(x0, y1)[0] as f32;
                let v11 = src.get_pixel(x1, y1)[0] as f32;

                let v0 = v00 * (1.0 - dx) + v10 * dx;
                let v1 = v01 * (1.0 - dx) + v11 * dx;
                let v = v0 * (1.0 - dy) + v1 * dy;
                row[x as usize] = v.clamp(0.0, 255.0) as u8;
            }
        });
    dst
}

fn resize_linear_rgb(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let mut dst = RgbImage::new(width, height);
    let sx = linear_axis_scale(width, src.width());
    let sy = linear_axis_scale(height, src.height());

    dst.as_mut()
        .par_chunks_mut(width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| {
            let fy = y as f32 * sy;
            let y0 = fy as u32;
            let y1 = (y0 + 1).min(src.height() - 1);
            let dy = fy - y0 as f32;
            for x in 0..width {
                let fx = x as f32 * sx;
                let x0 = fx as u32;
                let x1 = (x0 + 1).min(src.width() - 1);
                let dx = fx - x0 as f32;

                for c in 0..3 {
                    let v00 = src.get_pixel(x0, y0)[c] as f32;
                    let v10 = src.get_pixel(x1, y0)[c] as f32;
                    let v01 = src.get_pixel(x0, y1)[c] as f32;
                    let v11 = src.get_pixel(x1, y1)[c] as f32;

                    let v0 = v00 * (1.0 - dx) + v10 * dx;
                    let v1 = v01 * (1.0 - dx) + v11 * dx;
                    let v = v0 * (1.0 - dy) + v1 * dy;
                    row[x as usize * 3 + c] = v.clamp(0.0, 255.0) as u8;
                }
            }
        });
    dst
}

fn area_bounds(i: u32, scale: f32, src_len: u32) -> (u32, u32) {
    let lo = (i as f32 * scale).floor() as u32;
    let hi = (((i + 1) as f32 * scale).ceil() as u32).min(src_len);
    (lo, hi.max(lo + 1))
}

fn resize_area(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut dst = GrayImage::new(width, height);
    let sx = src.width() as f32 / width as f32;
    let sy = src.height() as f32 / height as f32;

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let (y0, y1) = area_bounds(y as u32, sy, src.height());
            for x in 0..width {
                let (x0, x1) = area_bounds(x, sx, src.width());
                let mut sum = 0.0f32;
                for yy in y0..y1 {
                    for xx in x0..x1 {
                        sum += src.get_pixel(xx, yy)[0] as f32;
                    }
                }
                let n = ((x1 - x0) * (y1 - y0)) as f32;
                row[x as usize] = (sum / n).clamp(0.0, 255.0) as u8;
            }
        });
    dst
}

fn resize_area_rgb(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let mut dst = RgbImage::new(width, height);
    let sx = src.width() as f32 / width as f32;
    let sy = src.height() as f32 / height as f32;

    dst.as_mut()
        .par_chunks_mut(width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| {
            let (y0, y1) = area_bounds(y as u32, sy, src.height());
            for x in 0..width {
                let (x0, x1) = area_bounds(x, sx, src.width());
                let mut sum = [0.0f32; 3];
                for yy in y0..y1 {
                    for xx in x0..x1 {
                        let p = src.get_pixel(xx, yy);
                        for c in 0..3 {
                            sum[c] += p[c] as f32;
                        }
                    }
                }
                let n = ((x1 - x0) * (y1 - y0)) as f32;
                for c in 0..3 {
                    row[x as usize * 3 + c] = (sum[c] / n).clamp(0.0, 255.0) as u8;
                }
            }
        });
    dst
}
