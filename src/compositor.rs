//! Renders the leveled layer stack over the photo at native resolution.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

use crate::color;
use crate::layers::LayerStack;

/// Per-pixel tonal reference of the photo, computed once at load.
#[derive(Clone, Debug)]
pub struct ShadingMaps {
    luminance: GrayImage,
}

impl ShadingMaps {
    pub fn from_photo(photo: &RgbaImage) -> Self {
        let (w, h) = photo.dimensions();
        let mut luminance = GrayImage::new(w, h);
        let width = w as usize;
        if width > 0 {
            let src: &[u8] = photo.as_raw();
            let dst: &mut [u8] = &mut luminance;
            dst.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
                let src_row = &src[y * width * 4..(y + 1) * width * 4];
                for (out, px) in row.iter_mut().zip(src_row.chunks_exact(4)) {
                    *out = (color::luminance(px[0], px[1], px[2]) * 255.0).round() as u8;
                }
            });
        }
        Self { luminance }
    }

    pub fn luminance(&self) -> &GrayImage {
        &self.luminance
    }
}

/// Flattened per-layer parameters for the inner loop.
struct LayerParams<'a> {
    color: [f32; 3],
    white: f32,
    black: f32,
    mask: &'a [u8],
}

/// Layer color shaded by the photo's luminance `l`: darkened toward black by
/// `black * (1 - l)`, then lifted toward white by `white * l`.
pub fn shade(color: [f32; 3], l: f32, white: f32, black: f32) -> [f32; 3] {
    let dark = 1.0 - black * (1.0 - l);
    let lift = white * l;
    color.map(|c| {
        let c = c * dark;
        c + (1.0 - c) * lift
    })
}

/// Photo with every layer blended on top in stack order, photo-sized.
pub fn composite(photo: &RgbaImage, shading: &ShadingMaps, layers: &LayerStack) -> RgbaImage {
    let mut out = photo.clone();
    let (w, h) = photo.dimensions();
    let width = w as usize;
    if width == 0 || h == 0 {
        return out;
    }
    let params: Vec<LayerParams<'_>> = layers
        .iter()
        .map(|layer| {
            let rgb = color::unpack(layer.color);
            LayerParams {
                color: [rgb.r, rgb.g, rgb.b].map(|c| c as f32 / 255.0),
                white: layer.white_level,
                black: layer.black_level,
                mask: layer.mask().as_raw(),
            }
        })
        .collect();
    if params.is_empty() {
        return out;
    }
    let lum: &[u8] = shading.luminance().as_raw();

    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(width * 4).enumerate().for_each(|(y, row)| {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let i = y * width + x;
            let l = lum.get(i).copied().unwrap_or(0) as f32 / 255.0;
            let mut acc = [px[0], px[1], px[2]].map(|c| c as f32 / 255.0);
            for layer in &params {
                let m = layer.mask.get(i).copied().unwrap_or(0);
                if m == 0 {
                    continue;
                }
                let m = m as f32 / 255.0;
                let shaded = shade(layer.color, l, layer.white, layer.black);
                for c in 0..3 {
                    acc[c] = acc[c] * (1.0 - m) + shaded[c] * m;
                }
            }
            for c in 0..3 {
                px[c] = (acc[c] * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    fn gray_photo(v: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 3, Rgba([v, v, v, 255]))
    }

    #[test]
    fn luminance_map_matches_photo() {
        let maps = ShadingMaps::from_photo(&gray_photo(200));
        assert_eq!(maps.luminance().dimensions(), (4, 3));
        assert!(maps.luminance().pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn without_coverage_output_is_the_photo() {
        let photo = gray_photo(90);
        let mut layers = LayerStack::new(4, 3);
        layers.add();
        let out = composite(&photo, &ShadingMaps::from_photo(&photo), &layers);
        assert_eq!(out, photo);
    }

    #[test]
    fn full_coverage_shows_shaded_layer_color() {
        let photo = gray_photo(255);
        let mut layers = LayerStack::new(4, 3);
        let id = layers.add().id;
        layers.select(id).expect("select");
        layers.set_white_level(0.0).expect("white");
        if let Some(layer) = layers.find_layer_mut(id) {
            layer.mask_mut().put_pixel(1, 1, Luma([255]));
        }
        let out = composite(&photo, &ShadingMaps::from_photo(&photo), &layers);
        assert_eq!(out.dimensions(), (4, 3));
        // White photo: no darkening, no lift with white level 0.
        assert_eq!(*out.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn black_level_darkens_shadows() {
        let shaded = shade([1.0, 0.0, 0.0], 0.0, 0.5, 1.0);
        assert_eq!(shaded, [0.0, 0.0, 0.0]);
        let shaded = shade([1.0, 0.0, 0.0], 1.0, 1.0, 0.5);
        assert_eq!(shaded, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn later_layers_paint_over_earlier_ones() {
        let photo = gray_photo(255);
        let mut layers = LayerStack::new(4, 3);
        for color in [0xff0000, 0x0000ff] {
            let id = layers.add().id;
            layers.select(id).expect("select");
            layers.set_color(color).expect("color");
            layers.set_white_level(0.0).expect("white");
            if let Some(layer) = layers.find_layer_mut(id) {
                layer.mask_mut().put_pixel(2, 2, Luma([255]));
            }
        }
        let out = composite(&photo, &ShadingMaps::from_photo(&photo), &layers);
        assert_eq!(*out.get_pixel(2, 2), Rgba([0, 0, 255, 255]));
    }
}
