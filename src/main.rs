#![windows_subsystem = "windows"]

use clap::Parser;
use eframe::egui;

use maskboard::app::MaskboardApp;
use maskboard::cli::CliArgs;
use maskboard::{log_info, logger};

fn main() -> Result<(), eframe::Error> {
    let args = CliArgs::parse();

    logger::init();
    logger::set_mirror_stderr(args.verbose);
    log_info!("maskboard {} starting", env!("CARGO_PKG_VERSION"));

    let settings = args.resolve_settings();
    let photo = args.photo.clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("maskboard"),
        ..Default::default()
    };

    eframe::run_native(
        "maskboard",
        options,
        Box::new(move |cc| Box::new(MaskboardApp::new(cc, settings, photo))),
    )
}
