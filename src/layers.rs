use image::GrayImage;

use crate::color::{self, Hsv, Rgb};
use crate::error::BoardError;

pub type LayerId = u32;

pub const DEFAULT_LAYER_COLOR: u32 = 0xff0000;

/// One paintable mask plane over the photo.
#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Packed 0xRRGGBB.
    pub color: u32,
    /// 0.0..=1.0
    pub white_level: f32,
    /// 0.0..=1.0
    pub black_level: f32,
    /// HSV as last set; kept apart from `color` so hue and saturation
    /// survive when the packed RGB cannot express them.
    hsv: Hsv,
    mask: GrayImage,
    /// Bumped on every mask or property change so the host can cache textures.
    generation: u64,
}

impl Layer {
    pub fn new(id: LayerId, width: u32, height: u32) -> Self {
        Self {
            id,
            name: format!("layer {}", id),
            color: DEFAULT_LAYER_COLOR,
            white_level: 0.5,
            black_level: 0.5,
            hsv: color::to_hsv(DEFAULT_LAYER_COLOR),
            mask: GrayImage::new(width, height),
            generation: 0,
        }
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Mutable mask access; marks the layer dirty.
    pub fn mask_mut(&mut self) -> &mut GrayImage {
        self.generation += 1;
        &mut self.mask
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            hex_color: color::to_hex(self.color),
            rgb_color: color::unpack(self.color),
            hsv_color: self.hsv,
            white_level: self.white_level,
            black_level: self.black_level,
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }
}

/// Read-only snapshot of a layer handed to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub color: u32,
    pub hex_color: String,
    pub rgb_color: Rgb,
    pub hsv_color: Hsv,
    pub white_level: f32,
    pub black_level: f32,
}

/// Layers in z-order (back to front) plus the current selection.
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    selected: Option<LayerId>,
    width: u32,
    height: u32,
}

impl LayerStack {
    /// Masks are allocated at `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layers: Vec::new(),
            selected: None,
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Changes whenever any layer's mask or properties change, or a layer is
    /// added.
    pub fn generation(&self) -> u64 {
        self.layers.iter().map(|l| l.generation + 1).sum()
    }

    /// Append a new layer.  Ids follow the layer count; layers are never
    /// removed, so they stay unique and increasing.
    pub fn add(&mut self) -> LayerInfo {
        let id = self.layers.len() as LayerId;
        let layer = Layer::new(id, self.width, self.height);
        let info = layer.info();
        self.layers.push(layer);
        info
    }

    pub fn find_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn find_layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn select(&mut self, id: LayerId) -> Result<LayerInfo, BoardError> {
        let info = self
            .find_layer(id)
            .map(Layer::info)
            .ok_or(BoardError::LayerNotFound(id))?;
        self.selected = Some(id);
        Ok(info)
    }

    pub fn selected_id(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Layer> {
        self.selected.and_then(|id| self.find_layer(id))
    }

    fn selected_mut(&mut self) -> Result<&mut Layer, BoardError> {
        let id = self.selected.ok_or(BoardError::NoLayerSelected)?;
        self.find_layer_mut(id).ok_or(BoardError::LayerNotFound(id))
    }

    fn update_selected(&mut self, f: impl FnOnce(&mut Layer)) -> Result<LayerInfo, BoardError> {
        let layer = self.selected_mut()?;
        f(&mut *layer);
        layer.touch();
        Ok(layer.info())
    }

    /// `level` in 0..=100.
    pub fn set_black_level(&mut self, level: f32) -> Result<LayerInfo, BoardError> {
        let v = level.clamp(0.0, 100.0) / 100.0;
        self.update_selected(|l| l.black_level = v)
    }

    /// `level` in 0..=100.
    pub fn set_white_level(&mut self, level: f32) -> Result<LayerInfo, BoardError> {
        let v = level.clamp(0.0, 100.0) / 100.0;
        self.update_selected(|l| l.white_level = v)
    }

    pub fn set_color(&mut self, packed: u32) -> Result<LayerInfo, BoardError> {
        self.update_selected(|l| {
            l.color = packed & 0x00ff_ffff;
            l.hsv = color::to_hsv(l.color);
        })
    }

    /// `hue` in 0..=359.
    pub fn set_hue(&mut self, hue: u16) -> Result<LayerInfo, BoardError> {
        self.rewrite_hsv(|hsv| hsv.h = hue % 360)
    }

    /// `saturation` in 0..=100.
    pub fn set_saturation(&mut self, saturation: u8) -> Result<LayerInfo, BoardError> {
        self.rewrite_hsv(|hsv| hsv.s = saturation.min(100))
    }

    /// `brightness` in 0..=100.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<LayerInfo, BoardError> {
        self.rewrite_hsv(|hsv| hsv.v = brightness.min(100))
    }

    fn rewrite_hsv(&mut self, f: impl FnOnce(&mut Hsv)) -> Result<LayerInfo, BoardError> {
        self.update_selected(|l| {
            f(&mut l.hsv);
            l.color = color::from_hsv(l.hsv);
        })
    }
}
