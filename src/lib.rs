//! maskboard: mask painting over a photo with stacked, recolorable layers.
//!
//! The crate is split into a host-independent controller core and an
//! `eframe` shell (`app`) that feeds it input and draws its state.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;

pub mod app;
pub mod board;
pub mod cli;
pub mod color;
pub mod compositor;
pub mod error;
pub mod gesture;
pub mod glass;
pub mod input;
pub mod io;
pub mod layers;
pub mod selection;
pub mod settings;
pub mod tools;
pub mod viewport;

pub use board::{BoardController, BoardRequest};
pub use error::BoardError;
pub use layers::{LayerId, LayerInfo};
pub use tools::{ToolId, ToolValues};
