use serde::{Deserialize, Serialize};

use crate::PitwallError;
use crate::replay::DEFAULT_PLAYBACK_RATE;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) playback_rate: f64,
    pub(crate) show_track_map: bool,
    pub(crate) show_race_control: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playback_rate: DEFAULT_PLAYBACK_RATE,
            show_track_map: true,
            show_race_control: true,
        }
    }
}

impl AppConfig {
    pub(crate) fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("pitwall").join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            serde_json::from_reader(file).ok()
        } else {
            None
        }
    }

    pub(crate) fn save(&self) -> Result<(), PitwallError> {
        let config_path = dirs::config_dir()
            .ok_or(PitwallError::NoConfigDir)?
            .join("pitwall")
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PitwallError::ConfigIOError { source: e })?;
            }
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PitwallError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self).map_err(|e| PitwallError::ConfigSerializeError { source: e })
    }
}
