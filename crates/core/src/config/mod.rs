//! Engine settings loaded from `.connector-forms.json`

mod settings;

pub use settings::{
    CONFIG_FILE_NAMES, ENV_POLL_INTERVAL_MS, ENV_POLL_TIMEOUT_MS, EngineSettings, PollOverride,
    PollSettings,
};
