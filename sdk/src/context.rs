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

use std::{
    path::Path,
    sync::{Arc, Mutex, OnceLock, PoisonError},
    thread::{self, JoinHandle},
};

use asic_crypto::{
    time_stamp::{HttpTimeStampProvider, TimeStampProvider},
    trust::TrustAnchors,
};
use log::{debug, info, warn};
use tempfile::TempDir;

use crate::{
    formats::{AsicS, ContainerFormat, FormatRegistry},
    settings::{SettingsValidate, Trust},
    signature::AdvancedSignatureParser,
    Error, Result, Settings,
};

/// Called once when the trust store warm-up started by
/// [`Context::initialize`] has finished.
pub type InitCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Trait for types that can be converted into Settings
pub trait IntoSettings {
    /// Convert this type into Settings
    fn into_settings(self) -> Result<Settings>;
}

/// Implement for Settings (passthrough)
impl IntoSettings for Settings {
    fn into_settings(self) -> Result<Settings> {
        Ok(self)
    }
}

/// Implement for &str (JSON/TOML string - tries both formats)
impl IntoSettings for &str {
    fn into_settings(self) -> Result<Settings> {
        let mut settings = Settings::default();
        // Try JSON first, then TOML
        settings
            .update_from_str(self, "json")
            .or_else(|_| settings.update_from_str(self, "toml"))?;
        Ok(settings)
    }
}

/// Implement for String
impl IntoSettings for String {
    fn into_settings(self) -> Result<Settings> {
        self.as_str().into_settings()
    }
}

/// Implement for serde_json::Value
impl IntoSettings for serde_json::Value {
    fn into_settings(self) -> Result<Settings> {
        let json_str = serde_json::to_string(&self)?;
        let mut settings = Settings::default();
        settings.update_from_str(&json_str, "json")?;
        Ok(settings)
    }
}

/// Library state shared by container operations.
///
/// A `Context` replaces process-wide registration: it carries the
/// application identity, settings, registered container formats, the trust
/// store and the temporary directory used for large data files. Build one
/// with the `with_*` methods, call [`Context::initialize`] once, then pass
/// it to every container operation.
///
/// Registering formats requires ownership, so the registry can't change
/// while containers are being created from a shared `&Context`.
pub struct Context {
    app_name: String,
    user_agent: Option<String>,
    settings: Settings,
    formats: FormatRegistry,
    trust: Arc<OnceLock<TrustAnchors>>,
    time_stamp_provider: OnceLock<Box<dyn TimeStampProvider + Send + Sync>>,
    signature_parser: Option<Box<dyn AdvancedSignatureParser>>,
    temp_dir: OnceLock<TempDir>,
    warm_up: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("app_name", &self.app_name)
            .field("user_agent", &self.user_agent())
            .field("settings", &self.settings)
            .field("formats", &self.formats)
            .field("trust_ready", &self.is_ready())
            .finish()
    }
}

impl Context {
    /// Creates an uninitialized context for the named application.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_agent: None,
            settings: Settings::default(),
            formats: FormatRegistry::new(),
            trust: Arc::new(OnceLock::new()),
            time_stamp_provider: OnceLock::new(),
            signature_parser: None,
            temp_dir: OnceLock::new(),
            warm_up: Mutex::new(None),
        }
    }

    /// Overrides the user agent sent to time stamp authorities.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// use the provided settings in this context
    pub fn with_settings<S: IntoSettings>(mut self, settings: S) -> Result<Self> {
        self.settings = settings.into_settings()?;
        Ok(self)
    }

    /// Use the provided time stamp authority instead of the one configured
    /// by `time_stamp.tsa_url`.
    pub fn with_time_stamp_provider<P>(self, provider: P) -> Self
    where
        P: TimeStampProvider + Send + Sync + 'static,
    {
        let _ = self.time_stamp_provider.set(Box::new(provider));
        self
    }

    /// Use the provided engine for XML advanced signatures.
    pub fn with_signature_parser<P: AdvancedSignatureParser + 'static>(mut self, parser: P) -> Self {
        self.signature_parser = Some(Box::new(parser));
        self
    }

    /// Registers a container format.
    ///
    /// Formats are probed in registration order. Formats registered here
    /// are probed before the built-in ones added by [`Context::initialize`].
    pub fn register_format<F: ContainerFormat + 'static>(mut self, format: F) -> Self {
        self.formats.register(Arc::new(format));
        self
    }

    /// Registers the built-in formats and warms up the trust store.
    ///
    /// With `on_ready`, the trust store is loaded on a background thread
    /// that calls `on_ready` exactly once with the outcome; use
    /// [`Context::wait_until_ready`] to join it. Without a callback the
    /// trust store is loaded before this returns and load errors are
    /// returned directly.
    pub fn initialize(mut self, on_ready: Option<InitCallback>) -> Result<Self> {
        self.settings.validate()?;
        self.formats.register(Arc::new(AsicS));

        info!("{} initialized ({})", self.app_name, self.user_agent());

        match on_ready {
            Some(on_ready) => {
                let trust = Arc::clone(&self.trust);
                let trust_settings = self.settings.trust.clone();

                let handle = thread::Builder::new()
                    .name("asic-trust-warm-up".into())
                    .spawn(move || {
                        let result = load_trust_anchors(&trust_settings).map(|anchors| {
                            let _ = trust.set(anchors);
                        });
                        on_ready(result);
                    })?;

                *self
                    .warm_up
                    .get_mut()
                    .unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            None => {
                let anchors = load_trust_anchors(&self.settings.trust)?;
                let _ = self.trust.set(anchors);
            }
        }

        Ok(self)
    }

    /// Blocks until a background trust store warm-up has finished.
    ///
    /// Returns an error if the trust store is not available afterwards.
    pub fn wait_until_ready(&self) -> Result<()> {
        let handle = self
            .warm_up
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| Error::BadParam("trust store warm-up panicked".into()))?;
        }

        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::BadParam("trust store is not loaded".into()))
        }
    }

    /// Returns `true` once the trust store has been loaded.
    pub fn is_ready(&self) -> bool {
        self.trust.get().is_some()
    }

    /// Tears down this context.
    ///
    /// Registered formats are dropped and temporary files are deleted. A
    /// warm-up still in progress is detached. This never fails.
    pub fn terminate(mut self) {
        self.formats.clear();
        self.app_name.clear();
        self.user_agent = None;

        if let Some(temp_dir) = self.temp_dir.take() {
            if let Err(err) = temp_dir.close() {
                warn!("could not delete temporary files: {err}");
            }
        }

        let _detached = self
            .warm_up
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        debug!("context terminated");
    }

    /// Returns the application name given at construction.
    pub fn app_info(&self) -> &str {
        &self.app_name
    }

    /// Returns the user agent sent with time stamp requests.
    pub fn user_agent(&self) -> String {
        match &self.user_agent {
            Some(user_agent) => user_agent.clone(),
            None => format!("{} asic-rs/{}", self.app_name, crate::version()),
        }
    }

    /// Returns a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns a mutable reference to the settings.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Returns the loaded trust anchors, or `None` while warm-up is still
    /// running.
    pub fn trust_anchors(&self) -> Option<&TrustAnchors> {
        self.trust.get()
    }

    /// Returns the time stamp authority to use for new signatures.
    ///
    /// Falls back to an HTTP client for `time_stamp.tsa_url` when no
    /// provider was set explicitly.
    pub fn time_stamp_provider(&self) -> Option<&dyn TimeStampProvider> {
        if self.time_stamp_provider.get().is_none() {
            let time_stamp = &self.settings.time_stamp;
            let url = time_stamp.tsa_url.as_ref()?;

            let mut provider = HttpTimeStampProvider::new(url.as_str());
            for (name, value) in time_stamp.request_headers.iter().flatten() {
                provider = provider.with_header(name.as_str(), value.as_str());
            }
            let _ = self.time_stamp_provider.set(Box::new(provider));
        }

        self.time_stamp_provider
            .get()
            .map(|provider| &**provider as &dyn TimeStampProvider)
    }

    /// Returns the registered XML advanced signature engine, if any.
    pub fn signature_parser(&self) -> Option<&dyn AdvancedSignatureParser> {
        self.signature_parser.as_deref()
    }

    pub(crate) fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    // created on first use and removed by terminate() or drop
    pub(crate) fn temp_dir(&self) -> Result<&Path> {
        if self.temp_dir.get().is_none() {
            let dir = tempfile::Builder::new().prefix("asic-").tempdir()?;
            debug!("using temporary directory {}", dir.path().display());
            let _ = self.temp_dir.set(dir);
        }

        self.temp_dir
            .get()
            .map(TempDir::path)
            .ok_or_else(|| Error::BadParam("temporary directory unavailable".into()))
    }
}

fn load_trust_anchors(trust: &Trust) -> Result<TrustAnchors> {
    let mut anchors = TrustAnchors::new();

    if let Some(pem) = &trust.trust_anchors {
        anchors
            .add_pem(pem.as_bytes())
            .map_err(|e| Error::BadParam(format!("invalid trust anchors: {e}")))?;
    }

    if let Some(path) = &trust.trust_anchors_path {
        let pem = std::fs::read(path).map_err(|_| Error::FileNotFound(path.clone()))?;
        anchors
            .add_pem(&pem)
            .map_err(|e| Error::BadParam(format!("invalid trust anchors in {path}: {e}")))?;
    }

    debug!("trust store loaded with {} anchor(s)", anchors.len());
    Ok(anchors)
}
