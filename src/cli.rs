// ============================================================================
// maskboard command line
// ============================================================================
//
// Usage examples:
//   maskboard                                   (empty board, open a photo from the panel)
//   maskboard portrait.jpg                      (open straight into the photo)
//   maskboard --max-size 2048 big.tif           (downsample large photos on load)
//   maskboard --config ./board.cfg --verbose    (explicit settings file, log to stderr)
//
// There is no headless mode: every option only shapes how the window starts.

use std::path::PathBuf;

use clap::Parser;

use crate::settings::BoardSettings;

/// Paint recolorable masks over a photo.
#[derive(Parser, Debug, Default)]
#[command(name = "maskboard", version, about = "Paint recolorable masks over a photo")]
pub struct CliArgs {
    /// Photo to open at startup.
    #[arg(value_name = "PHOTO")]
    pub photo: Option<PathBuf>,

    /// Downsample photos so neither side exceeds this many pixels.
    #[arg(long, value_name = "PX", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_size: Option<u32>,

    /// Settings file to use instead of the platform default.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Mirror log lines to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Settings from `--config` (or the platform file) with `--max-size`
    /// applied on top.
    pub fn resolve_settings(&self) -> BoardSettings {
        let mut settings = match &self.config {
            Some(path) => BoardSettings::load_from(path),
            None => BoardSettings::load(),
        };
        if self.max_size.is_some() {
            settings.max_image_size = self.max_size;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_photo_and_flags() {
        let args = CliArgs::parse_from(["maskboard", "--max-size", "1024", "-v", "shot.png"]);
        assert_eq!(args.photo, Some(PathBuf::from("shot.png")));
        assert_eq!(args.max_size, Some(1024));
        assert!(args.verbose);
        assert!(args.config.is_none());
    }

    #[test]
    fn zero_max_size_is_rejected() {
        assert!(CliArgs::try_parse_from(["maskboard", "--max-size", "0"]).is_err());
    }

    #[test]
    fn max_size_overrides_config_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("board.cfg");
        std::fs::write(&path, "max_image_size=500\ntap_delay_ms=80\n").expect("write");
        let args = CliArgs {
            config: Some(path.clone()),
            ..CliArgs::default()
        };
        let settings = args.resolve_settings();
        assert_eq!(settings.max_image_size, Some(500));
        assert_eq!(settings.tap_delay_ms, 80);

        let args = CliArgs {
            config: Some(path),
            max_size: Some(64),
            ..CliArgs::default()
        };
        assert_eq!(args.resolve_settings().max_image_size, Some(64));
    }
}
