use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directories following XDG spec
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/represence)
    pub config: PathBuf,

    /// Config file path
    pub config_file: PathBuf,
}

impl Directories {
    /// Standard XDG paths, falling back to the temp dir when the home
    /// directory cannot be determined.
    #[must_use]
    pub fn new() -> Self {
        let config = ProjectDirs::from("", "", "represence").map_or_else(
            || std::env::temp_dir().join("represence"),
            |project| project.config_dir().to_path_buf(),
        );
        Self::with_base(config)
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            config: base,
        }
    }

    /// Ensure the config directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)
    }
}

impl Default for Directories {
    fn default() -> Self {
        Self::new()
    }
}
