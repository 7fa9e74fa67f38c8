//! Session configuration.

use crate::errors::ConfigError;
use crate::functions::TdlibParameters;

/// Global names a TDLib web build is known to register itself under, in
/// probe order.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "tdweb", "Td", "TdWeb", "TDLib", "TDWeb", "TdClient", "@dibgram_tdweb",
];

/// Configuration for [`crate::Session::initialize`].
#[derive(Clone, Debug)]
pub struct Config {
    pub api_id:                   i32,
    pub api_hash:                 String,
    pub use_test_dc:              bool,
    pub system_language_code:     String,
    pub device_model:             String,
    pub system_version:           String,
    pub application_version:      String,
    pub enable_storage_optimizer: bool,
    /// Global names probed by the module locator, first match wins.
    pub candidates:               Vec<String>,
    /// Page size of the `getChats` request.
    pub chat_limit:               i32,
    /// How many property names to include in shape diagnostics.
    pub key_sample_limit:         usize,
    /// How many `default` levels the client factory may descend.
    pub max_default_depth:        usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_id:                   0,
            api_hash:                 String::new(),
            use_test_dc:              false,
            system_language_code:     "en".into(),
            device_model:             "Browser".into(),
            system_version:           "Web".into(),
            application_version:      "1.0".into(),
            enable_storage_optimizer: true,
            candidates:               DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            chat_limit:               100,
            key_sample_limit:         40,
            max_default_depth:        1,
        }
    }
}

impl Config {
    /// Build a config from the raw api id / api hash strings typed into the UI.
    pub fn from_ui_input(api_id_raw: &str, api_hash_raw: &str) -> Result<Self, ConfigError> {
        let raw = api_id_raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidApiId(raw.to_string()));
        }
        let api_id = match raw.parse::<i32>() {
            Ok(id) if id > 0 => id,
            _                => return Err(ConfigError::NonPositiveApiId(raw.to_string())),
        };
        let api_hash = api_hash_raw.trim();
        if api_hash.is_empty() {
            return Err(ConfigError::MissingApiHash);
        }
        Ok(Self { api_id, api_hash: api_hash.to_string(), ..Default::default() })
    }

    pub(crate) fn tdlib_parameters(&self) -> TdlibParameters {
        TdlibParameters {
            use_test_dc:              self.use_test_dc,
            api_id:                   self.api_id,
            api_hash:                 self.api_hash.clone(),
            system_language_code:     self.system_language_code.clone(),
            device_model:             self.device_model.clone(),
            system_version:           self.system_version.clone(),
            application_version:      self.application_version.clone(),
            enable_storage_optimizer: self.enable_storage_optimizer,
        }
    }
}
