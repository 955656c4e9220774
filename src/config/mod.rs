pub mod schema;

mod loader;
mod profile;

pub use schema::{
    JointSection, JointsConfig, LinkConfig, MapperSection, MotionConfig, SessionConfig,
    StatusConfig,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was read from - not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub mapper: MapperSection,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub joints: JointsConfig,
}
