//! Top-level application object for the VoterInfo tool.
//!
//! Owns the shared [`Context`] and the host channel, waits for (or defaults)
//! the configuration, bootstraps the agents exactly once, and reports
//! content-height changes back to the host.
//!
//! Configuration is populated through the `CONFIG` context key exactly once.
//! Late host payloads are ignored at the channel layer; a second `set` of
//! the key is a programming error and fails loudly from inside the
//! notification callback.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};
use voterinfo_agents::{AutocompleteAgent, CivicInfoAgent, HostChannel};
use voterinfo_api::autocomplete::AutocompleteApi;
use voterinfo_api::civic_info::CivicInfoApi;
use voterinfo_api::client::ApiClient;
use voterinfo_config::AppConfig;
use voterinfo_core::context::{Context, keys};
use voterinfo_core::{Error, Result};

/// How long to wait for host configuration before starting with defaults.
pub const CONFIG_TIMEOUT: Duration = Duration::from_millis(250);

/// How long to wait before reacting to a content change report.
pub const DOCUMENT_CHANGE_DEBOUNCE: Duration = Duration::from_millis(100);

struct Agents {
    civic_info: CivicInfoAgent,
    autocomplete: AutocompleteAgent,
}

#[derive(Default)]
struct ResizeState {
    current: Option<u32>,
    last_sent: Option<u32>,
    pending: bool,
}

/// The application: context owner and component wiring.
pub struct App {
    weak: Weak<App>,
    context: Arc<Context>,
    host: Arc<HostChannel>,
    base_config: AppConfig,
    configured: AtomicBool,
    applied_config: Mutex<Option<AppConfig>>,
    agents: Mutex<Option<Agents>>,
    resize: Mutex<ResizeState>,
}

impl App {
    /// Create the application around a baseline configuration (defaults plus
    /// whatever the config file and environment provided).
    pub fn new(base_config: AppConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            context: Arc::new(Context::new()),
            host: Arc::new(HostChannel::new()),
            base_config,
            configured: AtomicBool::new(false),
            applied_config: Mutex::new(None),
            agents: Mutex::new(None),
            resize: Mutex::new(ResizeState::default()),
        })
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn host(&self) -> &Arc<HostChannel> {
        &self.host
    }

    /// The configuration the app is actually running with, once configured.
    pub fn config(&self) -> Option<AppConfig> {
        lock(&self.applied_config).clone()
    }

    /// Install the config subscriber, the host config listener, and the
    /// default-config timeout.
    pub async fn init(&self) {
        let app = self.weak.clone();
        self.context.subscribe(keys::CONFIG, move |new, _old| {
            let Some(app) = app.upgrade() else { return };
            let Some(config) = new else { return };
            if let Err(err) = app.on_config(config) {
                // Double configuration (or an unusable config) is a
                // programming error; fail loudly rather than run half-wired.
                panic!("{err}");
            }
        });

        // Listen for host-delivered configuration.
        let mut config_rx = self.host.open_config().await;
        let app = self.weak.clone();
        tokio::spawn(async move {
            while let Some(payload) = config_rx.recv().await {
                let Some(app) = app.upgrade() else { return };
                if app.context.get(keys::CONFIG).is_some() {
                    // Configuration may only be set once. Ignore this.
                    info!("Ignoring host config payload after configuration");
                    continue;
                }
                match app.base_config.merged_with_payload(&payload) {
                    Ok(merged) => app.context.set(keys::CONFIG, config_value(&merged)),
                    Err(err) => warn!(error = %err, "Discarding bad host config payload"),
                }
            }
        });

        // Go ahead and start up with defaults if the host stays quiet.
        let app = self.weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(CONFIG_TIMEOUT).await;
            let Some(app) = app.upgrade() else { return };
            if app.context.get(keys::CONFIG).is_none() {
                debug!("No host configuration arrived, applying defaults");
                app.configure_with_defaults();
            }
        });
    }

    /// Apply the baseline configuration immediately (headless drivers call
    /// this instead of waiting out the host timeout).
    pub fn configure_with_defaults(&self) {
        self.context
            .set(keys::CONFIG, config_value(&self.base_config));
    }

    /// Handle the one allowed configuration: build the API clients and
    /// agents, seed the initial lookup keys, and declare readiness.
    fn on_config(&self, config: &Value) -> Result<()> {
        if self.configured.swap(true, Ordering::SeqCst) {
            return Err(Error::config("Already configured"));
        }

        let parsed = AppConfig::from_value(config)?;
        info!(election_id = %parsed.election_id, "Configuration applied");
        *lock(&self.applied_config) = Some(parsed.clone());

        let client = ApiClient::http(&parsed)?;
        let civic_api = CivicInfoApi::new(client.clone(), &parsed)?;
        let autocomplete_api = AutocompleteApi::new(client, &parsed);

        let mut civic_info = CivicInfoAgent::new(Arc::clone(&self.context), civic_api);
        civic_info.init();
        let mut autocomplete = AutocompleteAgent::new(Arc::clone(&self.context), autocomplete_api);
        autocomplete.init();
        *lock(&self.agents) = Some(Agents {
            civic_info,
            autocomplete,
        });

        if let Some(referrer) = parsed.referrer.as_deref().filter(|r| !r.is_empty()) {
            self.context.set(keys::REFERRER, referrer);
        }
        if let Some(address) = parsed.address.as_deref().filter(|a| !a.is_empty()) {
            self.context.set(keys::ADDRESS, address);
        } else if let Some(region) = parsed.region.as_deref().filter(|r| !r.is_empty()) {
            self.context.set(keys::REGION, region);
        }

        self.context.set(keys::READY, true);
        Ok(())
    }

    /// Report the current content height. Reports are debounced and only
    /// changed heights reach the host `resize` service.
    pub fn report_content_height(&self, height: u32) {
        {
            let mut resize = lock(&self.resize);
            resize.current = Some(height);
            if resize.pending {
                return;
            }
            resize.pending = true;
        }

        let app = self.weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DOCUMENT_CHANGE_DEBOUNCE).await;
            let Some(app) = app.upgrade() else { return };
            let height = {
                let mut resize = lock(&app.resize);
                resize.pending = false;
                if resize.last_sent == resize.current {
                    None
                } else {
                    resize.last_sent = resize.current;
                    resize.current
                }
            };
            if let Some(height) = height {
                if let Err(err) = app.host.send_resize(height).await {
                    debug!(error = %err, "Resize report not delivered");
                }
            }
        });
    }

    /// Tear everything down: agents first, then the host channel, then the
    /// context itself. The app must not be used afterwards.
    pub async fn shutdown(&self) {
        if let Some(mut agents) = lock(&self.agents).take() {
            agents.civic_info.dispose();
            agents.autocomplete.dispose();
        }
        self.host.close().await;
        self.context.dispose();
    }
}

fn config_value(config: &AppConfig) -> Value {
    serde_json::to_value(config).unwrap_or_default()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
