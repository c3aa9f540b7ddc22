use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub struct PortablePathManager;

impl PortablePathManager {
    /// Directory holding the executable, or `apps/core` when running a debug
    /// build from the workspace.
    pub fn root_dir() -> PathBuf {
        let exe_dir = match std::env::current_exe() {
            Ok(mut path) => {
                path.pop();
                path
            }
            Err(e) => {
                error!("Failed to get current exe path: {}. Falling back to current_dir.", e);
                return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            }
        };

        #[cfg(debug_assertions)]
        {
            // target/debug/<exe> -> workspace root
            let mut workspace = exe_dir.clone();
            workspace.pop();
            workspace.pop();
            let core_path = workspace.join("apps").join("core");
            if core_path.exists() {
                return core_path;
            }
        }

        exe_dir
    }

    /// Default data directory (`<root>/data`).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }
}

/// Files and directories under one data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn intents_file(&self) -> PathBuf {
        self.root.join("intents.json")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn model_file(&self) -> PathBuf {
        self.models_dir().join(crate::brain::model::MODEL_FILE)
    }

    pub fn db_dir(&self) -> PathBuf {
        self.root.join("db")
    }

    pub fn database_file(&self) -> PathBuf {
        self.db_dir().join("faqbot.sqlite")
    }

    /// SQLite URL for the interaction log, creating the file if missing.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database_file().display())
    }

    /// Creates the data, models and db directories if they don't exist.
    pub fn init(&self) -> Result<(), std::io::Error> {
        for dir in [self.root.clone(), self.models_dir(), self.db_dir()] {
            if !dir.exists() {
                info!("Creating directory: {:?}", dir);
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}
