mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{
    Config, DEFAULT_PORT, ENABLE_LOGGING_KEY, SECTION, Settings, WEBSOCKET_PORT_KEY,
};
pub use validation::warn_unknown_fields;
