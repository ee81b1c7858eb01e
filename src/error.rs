use crate::layers::LayerId;
use crate::tools::ToolId;

/// Error type for controller operations.
#[derive(Debug)]
pub enum BoardError {
    /// The photo could not be read from disk.
    Io(std::io::Error),
    /// The photo bytes could not be decoded.
    Decode(String),
    /// No layer with this id exists.
    LayerNotFound(LayerId),
    /// A selected-layer operation was called with nothing selected.
    NoLayerSelected,
    /// The registry has no tool for this identifier.
    ToolNotRegistered(ToolId),
    /// The tool does not understand the requested setting or command.
    UnsupportedSetting { tool: ToolId, setting: &'static str },
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardError::Io(e) => write!(f, "I/O error: {}", e),
            BoardError::Decode(e) => write!(f, "Decode error: {}", e),
            BoardError::LayerNotFound(id) => write!(f, "Layer {} not found", id),
            BoardError::NoLayerSelected => write!(f, "No layer selected"),
            BoardError::ToolNotRegistered(tool) => {
                write!(f, "Tool {} is not registered", tool.name())
            }
            BoardError::UnsupportedSetting { tool, setting } => {
                write!(f, "Tool {} does not support '{}'", tool.name(), setting)
            }
        }
    }
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoardError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BoardError {
    fn from(e: std::io::Error) -> Self {
        BoardError::Io(e)
    }
}

impl From<image::ImageError> for BoardError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => BoardError::Io(io),
            other => BoardError::Decode(other.to_string()),
        }
    }
}
