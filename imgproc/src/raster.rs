use image::{GrayImage, RgbImage};

use crate::{remap_ex, remap_rgb_ex, resize, resize_rgb, BorderMode, Interpolation};

/// Image-like raster: a color image or a single-channel mask/segmentation.
///
/// All geometric operations apply uniformly to both variants so the
/// undistortion pipeline does not care which one it is resampling.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Raster {
    pub fn width(&self) -> u32 {
        match self {
            Raster::Gray(img) => img.width(),
            Raster::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Raster::Gray(img) => img.height(),
            Raster::Rgb(img) => img.height(),
        }
    }

    pub fn resize(&self, width: u32, height: u32, interpolation: Interpolation) -> Raster {
        match self {
            Raster::Gray(img) => Raster::Gray(resize(img, width, height, interpolation)),
            Raster::Rgb(img) => Raster::Rgb(resize_rgb(img, width, height, interpolation)),
        }
    }

    pub fn remap(
        &self,
        map_x: &[f32],
        map_y: &[f32],
        width: u32,
        height: u32,
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Raster {
        self.remap_ex(map_x, map_y, width, height, interpolation, border, border)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn remap_ex(
        &self,
        map_x: &[f32],
        map_y: &[f32],
        width: u32,
        height: u32,
        interpolation: Interpolation,
        border_x: BorderMode,
        border_y: BorderMode,
    ) -> Raster {
        match self {
            Raster::Gray(img) => Raster::Gray(remap_ex(
                img,
                map_x,
                map_y,
                width,
                height,
                interpolation,
                border_x,
                border_y,
            )),
            Raster::Rgb(img) => Raster::Rgb(remap_rgb_ex(
                img,
                map_x,
                map_y,
                width,
                height,
                interpolation,
                border_x,
                border_y,
            )),
        }
    }
}

impl From<GrayImage> for Raster {
    fn from(img: GrayImage) -> Self {
        Raster::Gray(img)
    }
}

impl From<RgbImage> for Raster {
    fn from(img: RgbImage) -> Self {
        Raster::Rgb(img)
    }
}

/// Scale a raster by a factor with nearest-neighbor sampling.
///
/// A factor of exactly 1.0 is the identity: no resampling happens.
pub fn scale_image(image: &Raster, scale_factor: f64) -> Raster {
    if scale_factor == 1.0 {
        return image.clone();
    }

    let width = (image.width() as f64 * scale_factor) as u32;
    let height = (image.height() as f64 * scale_factor) as u32;
    image.resize(width, height, Interpolation::Nearest)
}
