use image::{GrayImage, RgbImage};
use rayon::prelude::*;

use crate::sample::{interpolate_gray, interpolate_rgb};
use crate::{BorderMode, Interpolation};

/// Sample `src` at the per-pixel coordinates given by `map_x`/`map_y`.
///
/// `map_x[y * width + x]` holds the source x coordinate of destination pixel
/// `(x, y)`; same for `map_y`.
pub fn remap(
    src: &GrayImage,
    map_x: &[f32],
    map_y: &[f32],
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border: BorderMode,
) -> GrayImage {
    remap_ex(src, map_x, map_y, width, height, interpolation, border, border)
}

/// [`remap`] with independent border handling per axis, e.g. horizontal
/// wrap-around for equirectangular panoramas.
#[allow(clippy::too_many_arguments)]
pub fn remap_ex(
    src: &GrayImage,
    map_x: &[f32],
    map_y: &[f32],
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border_x: BorderMode,
    border_y: BorderMode,
) -> GrayImage {
    assert_eq!(
        map_x.len(),
        (width * height) as usize,
        "map_x size must equal width*height"
    );
    assert_eq!(
        map_y.len(),
        (width * height) as usize,
        "map_y size must equal width*height"
    );

    let mut dst = GrayImage::new(width, height);

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as usize {
                let idx = y * width as usize + x;
                let val = interpolate_gray(
                    src,
                    map_x[idx],
                    map_y[idx],
                    interpolation,
                    border_x,
                    border_y,
                );
                row[x] = val.clamp(0.0, 255.0) as u8;
            }
        });

    dst
}

pub fn remap_rgb(
    src: &RgbImage,
    map_x: &[f32],
    map_y: &[f32],
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border: BorderMode,
) -> RgbImage {
    remap_rgb_ex(src, map_x, map_y, width, height, interpolation, border, border)
}

#[allow(clippy::too_many_arguments)]
pub fn remap_rgb_ex(
    src: &RgbImage,
    map_x: &[f32],
    map_y: &[f32],
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border_x: BorderMode,
    border_y: BorderMode,
) -> RgbImage {
    assert_eq!(
        map_x.len(),
        (width * height) as usize,
        "map_x size must equal width*height"
    );
    assert_eq!(
        map_y.len(),
        (width * height) as usize,
        "map_y size must equal width*height"
    );

    let mut dst = RgbImage::new(width, height);

    dst.as_mut()
        .par_chunks_mut(width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as usize {
                let idx = y * width as usize + x;
                let val = interpolate_rgb(
                    src,
                    map_x[idx],
                    map_y[idx],
                    interpolation,
                    border_x,
                    border_y,
                );
                for c in 0..3 {
                    row[x * 3 + c] = val[c].clamp(0.0, 255.0) as u8;
                }
            }
        });

    dst
}
