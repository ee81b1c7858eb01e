use egui::Pos2;
use image::{GrayImage, Luma};

/// Photo-sized coverage mask that confines brush strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionMask {
    mask: Option<GrayImage>,
    /// Bumped on every change.
    generation: u64,
}

impl SelectionMask {
    pub fn new() -> Self {
        Self { mask: None, generation: 0 }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_none()
    }

    pub fn mask(&self) -> Option<&GrayImage> {
        self.mask.as_ref()
    }

    pub fn clear(&mut self) {
        self.mask = None;
        self.generation += 1;
    }

    pub fn replace(&mut self, mask: GrayImage) {
        self.mask = Some(mask);
        self.generation += 1;
    }

    /// Coverage at a pixel; everything is selected when there is no mask.
    pub fn coverage(&self, x: u32, y: u32) -> u8 {
        match &self.mask {
            None => 255,
            Some(m) if x < m.width() && y < m.height() => m.get_pixel(x, y).0[0],
            Some(_) => 0,
        }
    }

    /// Replace the selection with the polygon through `points` (photo space).
    pub fn set_polygon(&mut self, points: &[Pos2], width: u32, height: u32) {
        self.replace(rasterize_polygon(points, width, height));
    }
}

impl Default for SelectionMask {
    fn default() -> Self {
        Self::new()
    }
}

/// Even-odd scanline fill sampled at pixel-row centres.
pub fn rasterize_polygon(points: &[Pos2], width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let n = points.len();
    if n < 3 {
        return mask;
    }
    let mut nodes: Vec<f32> = Vec::with_capacity(n);
    for y in 0..height {
        let yf = y as f32 + 0.5;
        nodes.clear();
        for i in 0..n {
            let (a, b) = (points[i], points[(i + 1) % n]);
            if (a.y < yf && b.y >= yf) || (b.y < yf && a.y >= yf) {
                let t = (yf - a.y) / (b.y - a.y);
                nodes.push(a.x + t * (b.x - a.x));
            }
        }
        nodes.sort_by(|a, b| a.total_cmp(b));
        for pair in nodes.chunks_exact(2) {
            let x_start = (pair[0].max(0.0) as u32).min(width);
            let x_end = ((pair[1] + 0.5).max(0.0) as u32).min(width);
            for x in x_start..x_end {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn square_fills_its_interior() {
        let square = [pos2(2.0, 2.0), pos2(6.0, 2.0), pos2(6.0, 6.0), pos2(2.0, 6.0)];
        let mask = rasterize_polygon(&square, 10, 10);
        assert_eq!(mask.get_pixel(3, 3).0[0], 255);
        assert_eq!(mask.get_pixel(5, 5).0[0], 255);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(8, 4).0[0], 0);
        assert_eq!(mask.get_pixel(4, 7).0[0], 0);
    }

    #[test]
    fn degenerate_polygon_selects_nothing() {
        let mask = rasterize_polygon(&[pos2(0.0, 0.0), pos2(5.0, 5.0)], 8, 8);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn no_mask_means_everything_is_selected() {
        let mut sel = SelectionMask::new();
        assert_eq!(sel.coverage(100, 100), 255);
        sel.set_polygon(&[pos2(0.0, 0.0), pos2(2.0, 0.0), pos2(2.0, 2.0), pos2(0.0, 2.0)], 4, 4);
        assert_eq!(sel.coverage(1, 1), 255);
        assert_eq!(sel.coverage(3, 3), 0);
        let before = sel.generation();
        sel.clear();
        assert!(sel.is_empty());
        assert!(sel.generation() > before);
    }
}
