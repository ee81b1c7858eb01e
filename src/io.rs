use std::path::{Path, PathBuf};
use std::sync::mpsc;

use image::{DynamicImage, RgbaImage};
use rfd::FileDialog;

use crate::error::BoardError;

/// Extensions offered in the open dialog.
pub const PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tga", "ico", "tiff", "tif"];

/// Outcome of a background photo load.
pub enum LoadResult {
    Loaded { path: PathBuf, photo: RgbaImage },
    Failed { path: PathBuf, error: BoardError },
}

/// Decode `path` to RGBA8, downsampled so neither side exceeds `max_size`.
pub fn load_photo(path: &Path, max_size: Option<u32>) -> Result<RgbaImage, BoardError> {
    let img = image::open(path)?.to_rgba8();
    let (w, h) = img.dimensions();
    let img = match max_size {
        Some(max) => downsample(img, max),
        None => img,
    };
    log_info!(
        "Loaded {} ({}x{} -> {}x{})",
        path.display(),
        w,
        h,
        img.width(),
        img.height()
    );
    Ok(img)
}

/// Target size for fitting `(w, h)` inside `max x max`: the smaller of the two
/// scale factors, dimensions rounded.  `None` when it already fits.
pub fn downsample_size(w: u32, h: u32, max: u32) -> Option<(u32, u32)> {
    if max == 0 || (w <= max && h <= max) {
        return None;
    }
    let scale = (max as f32 / w as f32).min(max as f32 / h as f32);
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    Some((nw, nh))
}

pub fn downsample(img: RgbaImage, max: u32) -> RgbaImage {
    match downsample_size(img.width(), img.height(), max) {
        Some((w, h)) => image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle),
        None => img,
    }
}

/// Decode on a worker thread; the result arrives on the returned channel.
pub fn spawn_load(path: PathBuf, max_size: Option<u32>) -> mpsc::Receiver<LoadResult> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = match load_photo(&path, max_size) {
            Ok(photo) => LoadResult::Loaded { path, photo },
            Err(error) => {
                log_err!("Failed to load {}: {}", path.display(), error);
                LoadResult::Failed { path, error }
            }
        };
        let _ = tx.send(result);
    });
    rx
}

/// Write the composite; the format follows the extension.  JPEG drops alpha.
pub fn save_result(image: &RgbaImage, path: &Path) -> Result<(), BoardError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => DynamicImage::ImageRgba8(image.clone()).to_rgb8().save(path)?,
        _ => image.save(path)?,
    }
    log_info!("Saved result to {}", path.display());
    Ok(())
}

/// Native open dialog for photos.
pub fn pick_photo_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Images", PHOTO_EXTENSIONS)
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// Native save dialog for the composite.
pub fn pick_result_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .set_file_name("result.png")
        .save_file()
}
