// -- Colour-space conversions for packed 0xRRGGBB layer colours ------------

/// 8-bit RGB triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Integer HSV as shown in the UI: hue 0..=359, saturation and value 0..=100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Hsv {
    pub h: u16,
    pub s: u8,
    pub v: u8,
}

pub fn unpack(color: u32) -> Rgb {
    Rgb {
        r: ((color >> 16) & 0xff) as u8,
        g: ((color >> 8) & 0xff) as u8,
        b: (color & 0xff) as u8,
    }
}

pub fn pack(rgb: Rgb) -> u32 {
    ((rgb.r as u32) << 16) | ((rgb.g as u32) << 8) | rgb.b as u32
}

/// `#rrggbb`, lowercase.
pub fn to_hex(color: u32) -> String {
    format!("#{:06x}", color & 0x00ff_ffff)
}

/// Floating HSV, every channel in 0.0..=1.0.
pub fn rgb_to_hsv_f(rgb: Rgb) -> [f32; 3] {
    let r = rgb.r as f32 / 255.0;
    let g = rgb.g as f32 / 255.0;
    let b = rgb.b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let h = if d == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / d % 6.0) / 6.0
    } else if max == g {
        (((b - r) / d) + 2.0) / 6.0
    } else {
        (((r - g) / d) + 4.0) / 6.0
    };
    let h = if h < 0.0 { h + 1.0 } else { h };
    let s = if max == 0.0 { 0.0 } else { d / max };
    [h, s, max]
}

/// Channels in 0.0..=1.0.  Rounds to the nearest 8-bit value so that
/// `to_hsv(from_hsv(..))` reproduces the integer triple.
pub fn hsv_to_rgb_f(h: f32, s: f32, v: f32) -> Rgb {
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h6 % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_u8 = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb {
        r: to_u8(r),
        g: to_u8(g),
        b: to_u8(b),
    }
}

pub fn to_hsv(color: u32) -> Hsv {
    let [h, s, v] = rgb_to_hsv_f(unpack(color));
    Hsv {
        h: ((h * 360.0).round() as u16) % 360,
        s: (s * 100.0).round() as u8,
        v: (v * 100.0).round() as u8,
    }
}

pub fn from_hsv(hsv: Hsv) -> u32 {
    pack(hsv_to_rgb_f(
        hsv.h as f32 / 360.0,
        hsv.s as f32 / 100.0,
        hsv.v as f32 / 100.0,
    ))
}

/// Rec. 601 luma in 0.0..=1.0.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
}
