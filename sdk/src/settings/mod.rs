// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::path::Path;

use asic_crypto::hash::DigestAlgorithm;
use asic_status_tracker::ErrorBehavior;
use config::{Config, FileFormat};
use serde_derive::{Deserialize, Serialize};

use crate::{Error, Result};

const VERSION: u32 = 1;

// trait used to validate user input to make sure user supplied configurations are valid
pub(crate) trait SettingsValidate {
    // returns error if settings are invalid
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Settings to configure the time stamp trust store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Trust {
    /// Trust anchor certificates for time stamp authorities, as a PEM bundle.
    pub trust_anchors: Option<String>,

    /// Path of a PEM bundle with additional trust anchors. The file is read
    /// while the trust store warms up.
    pub trust_anchors_path: Option<String>,

    /// Whether time stamp signer certificates must chain to a trust anchor.
    ///
    /// The default value is true.
    pub verify_trust: bool,
}

impl Default for Trust {
    fn default() -> Self {
        Self {
            trust_anchors: None,
            trust_anchors_path: None,
            verify_trust: true,
        }
    }
}

impl SettingsValidate for Trust {
    fn validate(&self) -> Result<()> {
        if let Some(pem) = &self.trust_anchors {
            if !pem.contains("-----BEGIN") {
                return Err(Error::BadParam(
                    "trust_anchors must be a PEM bundle".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Settings to configure signature validation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Verify {
    /// Do not report time stamps that use a weak digest algorithm.
    ///
    /// The default value is false.
    pub ignore_weak_digest_warnings: bool,

    /// Stop validating a signature as soon as one check fails.
    ///
    /// The default value is false, which reports every problem found.
    pub stop_on_first_error: bool,
}

impl Verify {
    pub(crate) fn error_behavior(&self) -> ErrorBehavior {
        if self.stop_on_first_error {
            ErrorBehavior::StopOnFirstError
        } else {
            ErrorBehavior::ContinueWhenPossible
        }
    }
}

impl SettingsValidate for Verify {}

/// Settings to configure time stamp requests.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TimeStamp {
    /// URL of an RFC 3161 time stamp authority.
    pub tsa_url: Option<String>,

    /// Digest algorithm used for new time stamps, as an XML-DSig URI, a
    /// dotted OID or a short name such as `"SHA-256"`.
    pub digest_algorithm: String,

    /// Extra HTTP headers sent with each time stamp request.
    pub request_headers: Option<Vec<(String, String)>>,
}

impl TimeStamp {
    /// Returns the configured digest algorithm.
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        Ok(self.digest_algorithm.parse::<DigestAlgorithm>()?)
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self {
            tsa_url: None,
            digest_algorithm: DigestAlgorithm::Sha256.uri().to_string(),
            request_headers: None,
        }
    }
}

impl SettingsValidate for TimeStamp {
    fn validate(&self) -> Result<()> {
        self.digest_algorithm()?;
        if let Some(url) = &self.tsa_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::BadParam(format!("invalid tsa_url: {url}")));
            }
        }
        Ok(())
    }
}

/// Settings to configure core features.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Core {
    /// Streamed data files larger than this are kept in temporary files
    /// instead of memory.
    pub backing_store_memory_threshold_in_mb: usize,
}

impl Core {
    pub(crate) fn memory_threshold(&self) -> u64 {
        (self.backing_store_memory_threshold_in_mb as u64).saturating_mul(1024 * 1024)
    }
}

impl Default for Core {
    fn default() -> Self {
        Self {
            backing_store_memory_threshold_in_mb: 10,
        }
    }
}

impl SettingsValidate for Core {}

/// Settings for configuring all aspects of asic-rs.
///
/// Settings are owned by a [`Context`](crate::Context); there is no
/// process-wide copy.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Version of the configuration.
    pub version: u32,
    /// Settings for configuring the trust store.
    pub trust: Trust,
    /// Settings for configuring validation.
    pub verify: Verify,
    /// Settings for configuring time stamp requests.
    pub time_stamp: TimeStamp,
    /// Settings for configuring core features.
    pub core: Core,
}

impl Settings {
    /// Creates default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates settings from string representation of the configuration.
    /// Format of configuration must be supplied (json or toml).
    pub fn from_string(settings_str: &str, format: &str) -> Result<Self> {
        let mut settings = Settings::default();
        settings.update_from_str(settings_str, format)?;
        Ok(settings)
    }

    /// Creates settings from a JSON or TOML file, choosing the format from
    /// the file extension.
    pub fn from_file<P: AsRef<Path>>(settings_path: P) -> Result<Self> {
        let ext = settings_path
            .as_ref()
            .extension()
            .ok_or(Error::UnsupportedType)?
            .to_string_lossy()
            .to_string();

        let settings_buf = std::fs::read(&settings_path)?;
        Settings::from_string(&String::from_utf8_lossy(&settings_buf), &ext)
    }

    /// Update this `Settings` instance from a string representation.
    /// This overlays the provided configuration on top of the current settings.
    ///
    /// # Example
    /// ```
    /// use asic::settings::Settings;
    ///
    /// let mut settings = Settings::default();
    ///
    /// settings
    ///     .update_from_str(
    ///         r#"
    ///     [verify]
    ///     ignore_weak_digest_warnings = true
    /// "#,
    ///         "toml",
    ///     )
    ///     .unwrap();
    ///
    /// assert!(settings.verify.ignore_weak_digest_warnings);
    /// ```
    pub fn update_from_str(&mut self, settings_str: &str, format: &str) -> Result<()> {
        let file_format = match format.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            _ => return Err(Error::UnsupportedType),
        };

        let current_config = Config::try_from(&*self)
            .map_err(|e| Error::BadParam(format!("could not convert settings: {e}")))?;

        // later sources override earlier ones, which allows partial updates
        let merged_config = Config::builder()
            .add_source(current_config)
            .add_source(config::File::from_str(settings_str, file_format))
            .build()
            .map_err(|e| Error::BadParam(format!("could not merge configuration: {e}")))?;

        let updated_settings = merged_config
            .try_deserialize::<Settings>()
            .map_err(|e| Error::BadParam(e.to_string()))?;

        updated_settings.validate()?;

        *self = updated_settings;
        Ok(())
    }

    /// Overlays a JSON configuration using the builder pattern.
    ///
    /// ```
    /// # use asic::settings::Settings;
    /// # fn main() -> asic::Result<()> {
    /// let settings = Settings::new().with_json(r#"{"verify": {"stop_on_first_error": true}}"#)?;
    /// assert!(settings.verify.stop_on_first_error);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_json(mut self, json: &str) -> Result<Self> {
        self.update_from_str(json, "json")?;
        Ok(self)
    }

    /// Overlays a TOML configuration using the builder pattern.
    pub fn with_toml(mut self, toml: &str) -> Result<Self> {
        self.update_from_str(toml, "toml")?;
        Ok(self)
    }

    /// Serializes these settings as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: VERSION,
            trust: Default::default(),
            verify: Default::default(),
            time_stamp: Default::default(),
            core: Default::default(),
        }
    }
}

impl SettingsValidate for Settings {
    fn validate(&self) -> Result<()> {
        if self.version > VERSION {
            return Err(Error::BadParam("settings version too new".into()));
        }
        self.trust.validate()?;
        self.verify.validate()?;
        self.time_stamp.validate()?;
        self.core.validate()
    }
}
