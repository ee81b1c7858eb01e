use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for gesture timing, zoom behaviour, the glass and tool defaults.
/// Persisted as a plain `key=value` file.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardSettings {
    /// How long a single touch waits for a second finger before it paints.
    pub tap_delay_ms: u64,
    /// Scale change per unit of wheel delta.
    pub wheel_zoom_step: f32,
    /// Minimum zoom as a fraction of the initial fit-to-container scale.
    pub min_scale_factor: f32,
    pub glass_width: f32,
    pub glass_height: f32,
    /// Magnification of the glass (2.0 = twice the on-screen size).
    pub glass_zoom: f32,
    /// Longest edge the photo is downsampled to on load, if any.
    pub max_image_size: Option<u32>,
    /// Brush diameter in surface pixels.
    pub brush_size: f32,
    /// Brush hardness, 0.0..=1.0.
    pub brush_hardness: f32,
    /// Magic wand tolerance, 1..=200.
    pub wand_tolerance: u32,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            tap_delay_ms: 100,
            wheel_zoom_step: 0.01,
            min_scale_factor: 0.3,
            glass_width: 200.0,
            glass_height: 200.0,
            glass_zoom: 2.0,
            max_image_size: None,
            brush_size: 20.0,
            brush_hardness: 0.75,
            wand_tolerance: 30,
        }
    }
}

impl BoardSettings {
    pub fn tap_delay(&self) -> Duration {
        Duration::from_millis(self.tap_delay_ms)
    }

    /// Path to the settings file.
    /// On Linux:   ~/.config/maskboard/maskboard_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\maskboard\maskboard_settings.cfg
    /// On macOS:   ~/Library/Application Support/maskboard/maskboard_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("maskboard").join("maskboard_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("maskboard")
                    .join("maskboard_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("maskboard").join("maskboard_settings.cfg"))
        }
    }

    /// Load from the platform settings file (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Save to the platform settings file.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = self.save_to(&path) {
            log_warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_string())
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "tap_delay_ms={}\n\
             wheel_zoom_step={}\n\
             min_scale_factor={}\n\
             glass_width={}\n\
             glass_height={}\n\
             glass_zoom={}\n\
             max_image_size={}\n\
             brush_size={}\n\
             brush_hardness={}\n\
             wand_tolerance={}\n",
            self.tap_delay_ms,
            self.wheel_zoom_step,
            self.min_scale_factor,
            self.glass_width,
            self.glass_height,
            self.glass_zoom,
            self.max_image_size.map(|v| v.to_string()).unwrap_or_default(),
            self.brush_size,
            self.brush_hardness,
            self.wand_tolerance,
        )
    }

    /// Parse `key=value` lines.  Unknown keys are skipped and malformed values
    /// keep their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        let d = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "tap_delay_ms" => s.tap_delay_ms = val.parse().unwrap_or(d.tap_delay_ms),
                "wheel_zoom_step" => {
                    s.wheel_zoom_step = positive(val).unwrap_or(d.wheel_zoom_step);
                }
                "min_scale_factor" => {
                    s.min_scale_factor = positive(val).unwrap_or(d.min_scale_factor);
                }
                "glass_width" => s.glass_width = positive(val).unwrap_or(d.glass_width),
                "glass_height" => s.glass_height = positive(val).unwrap_or(d.glass_height),
                "glass_zoom" => s.glass_zoom = positive(val).unwrap_or(d.glass_zoom),
                "max_image_size" => {
                    s.max_image_size = val.parse::<u32>().ok().filter(|v| *v > 0);
                }
                "brush_size" => s.brush_size = positive(val).unwrap_or(d.brush_size),
                "brush_hardness" => {
                    s.brush_hardness = val
                        .parse::<f32>()
                        .map(|v| v.clamp(0.0, 1.0))
                        .unwrap_or(d.brush_hardness);
                }
                "wand_tolerance" => {
                    s.wand_tolerance = val
                        .parse::<u32>()
                        .map(|v| v.clamp(1, 200))
                        .unwrap_or(d.wand_tolerance);
                }
                other => log_warn!("Ignoring unknown setting '{}'", other),
            }
        }
        s
    }
}

fn positive(val: &str) -> Option<f32> {
    val.parse::<f32>().ok().filter(|v| v.is_finite() && *v > 0.0)
}
