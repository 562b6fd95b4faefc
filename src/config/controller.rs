//! Preference lifecycle: load, reload, update and the refreshes they trigger.
//!
//! # Responsibilities
//! - Own the current [`RuntimeState`] and publish replacements atomically
//! - Regenerate base templates after every successful load
//! - Persist updated preferences and refresh rulesets when running eagerly
//!
//! # Design Decisions
//! - A failed load keeps the previous state; nothing is half-applied
//! - Readers are never locked out; a handler may see the pre-reload state
//!   until the swap completes
//! - Loads and writes share one lock, so a load never sees a file that is
//!   still being written and two loads cannot publish out of order
//! - Updated preferences must parse and validate before they are persisted;
//!   the file is replaced by rename, never rewritten in place

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::env::EnvOverrides;
use crate::config::form::form_to_preferences;
use crate::config::loader::{load_preferences, parse_preferences, ConfigError};
use crate::config::schema::Preferences;
use crate::config::state::{LaunchFlags, RuntimeState, ServerConfig};
use crate::convert::TemplateSet;
use crate::observability::logging;
use crate::ruleset::{Generation, RulesetStore};

/// How an `/updateconf` body is turned into preference text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEncoding {
    /// URL-encoded `key=value` pairs.
    Form,
    /// The body is the preference file.
    Direct,
}

impl FromStr for UpdateEncoding {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "form" => Ok(UpdateEncoding::Form),
            "direct" => Ok(UpdateEncoding::Direct),
            other => Err(UpdateError::NotImplemented(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("update encoding '{0}' is not implemented")]
    NotImplemented(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct ConfigController {
    path: PathBuf,
    launch: LaunchFlags,
    overrides: EnvOverrides,
    state: ArcSwap<RuntimeState>,
    server: ServerConfig,
    rulesets: Arc<RulesetStore>,
    templates: Arc<TemplateSet>,
    io_lock: Mutex<()>,
}

impl ConfigController {
    /// Perform the first load. On failure the defaults are served instead.
    pub async fn bootstrap(
        path: PathBuf,
        launch: LaunchFlags,
        rulesets: Arc<RulesetStore>,
        templates: Arc<TemplateSet>,
    ) -> Self {
        let overrides = EnvOverrides::default();
        let defaults = RuntimeState::build(&path, Preferences::default(), launch, &overrides);

        let mut controller = Self {
            path,
            launch,
            overrides,
            state: ArcSwap::from_pointee(defaults),
            server: ServerConfig::default(),
            rulesets,
            templates,
            io_lock: Mutex::new(()),
        };

        match controller.load().await {
            Ok(state) => controller.server = ServerConfig::from_preferences(&state.preferences),
            Err(_) => tracing::error!(
                path = %controller.path.display(),
                "Continuing with default preferences"
            ),
        }

        controller
    }

    /// Apply the startup environment. Also re-applied on every later load.
    pub fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if overrides.is_empty() {
            return;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }

        let current = self.state.load_full();
        let state = RuntimeState::build(
            &self.path,
            (*current.preferences).clone(),
            self.launch,
            &overrides,
        );
        self.state.store(Arc::new(state));

        tracing::info!(
            api_mode = ?overrides.api_mode,
            managed_prefix = overrides.managed_prefix.is_some(),
            access_token = overrides.access_token.is_some(),
            port = ?overrides.port,
            "Environment overrides applied"
        );
        self.overrides = overrides;
    }

    pub fn state(&self) -> Arc<RuntimeState> {
        self.state.load_full()
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.server
    }

    pub fn preference_path(&self) -> &Path {
        &self.path
    }

    pub fn rulesets(&self) -> &Arc<RulesetStore> {
        &self.rulesets
    }

    pub fn templates(&self) -> &Arc<TemplateSet> {
        &self.templates
    }

    /// Read the preference file, publish the new state and regenerate templates.
    pub async fn load(&self) -> Result<Arc<RuntimeState>, ConfigError> {
        let _io = self.io_lock.lock().await;
        self.load_locked().await
    }

    /// `/readconf`. Does not refresh rulesets.
    pub async fn reload(&self) -> Result<Arc<RuntimeState>, ConfigError> {
        self.load().await
    }

    /// Caller holds `io_lock`.
    async fn load_locked(&self) -> Result<Arc<RuntimeState>, ConfigError> {
        let prefs = load_preferences(&self.path).inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to load preferences");
        })?;

        let state = Arc::new(RuntimeState::build(
            &self.path,
            prefs,
            self.launch,
            &self.overrides,
        ));
        self.state.store(Arc::clone(&state));
        logging::apply_level(&state.preferences.advanced.log_level);
        self.templates.regenerate(&state).await;

        tracing::info!(
            path = %self.path.display(),
            rulesets = state.rulesets.len(),
            update_ruleset_on_request = state.update_ruleset_on_request,
            "Preferences loaded"
        );
        Ok(state)
    }

    /// Refresh every configured ruleset, then regenerate templates.
    pub async fn refresh_rulesets(&self) -> Arc<Generation> {
        let state = self.state();
        let generation = self.rulesets.refresh(&state.rulesets).await;
        self.templates.regenerate(&state).await;
        generation
    }

    /// `/updateconf`: persist `body`, reload, and refresh eagerly if configured.
    ///
    /// An unknown encoding, or preferences that would not load, fail before
    /// anything is written.
    pub async fn apply_update(&self, body: &[u8], encoding: &str) -> Result<(), UpdateError> {
        let encoding: UpdateEncoding = encoding.parse()?;
        let contents = match encoding {
            UpdateEncoding::Form => form_to_preferences(body)?,
            UpdateEncoding::Direct => String::from_utf8(body.to_vec())
                .map_err(|e| ConfigError::Form(format!("body is not UTF-8: {e}")))?,
        };
        parse_preferences(&contents, &self.path).inspect_err(|e| {
            tracing::warn!(error = %e, ?encoding, "Rejected preference update");
        })?;

        let io = self.io_lock.lock().await;
        write_replacing(&self.path, contents.as_bytes())
            .await
            .map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::info!(path = %self.path.display(), bytes = contents.len(), ?encoding, "Preferences persisted");

        let state = self.load_locked().await?;
        drop(io);
        if !state.update_ruleset_on_request {
            self.rulesets.refresh(&state.rulesets).await;
        }
        Ok(())
    }
}

/// Write `data` next to `path`, then rename it over `path`.
async fn write_replacing(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.{}.tmp", std::process::id()));

    let mut file = tokio::fs::File::create(&tmp).await?;
    let written = async {
        file.write_all(data).await?;
        file.sync_all().await
    }
    .await;
    drop(file);

    match written {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    }
    .inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::{FetchError, Fetcher};
    use futures_util::future::BoxFuture;

    struct NoFetch;

    impl Fetcher for NoFetch {
        fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
            Box::pin(async move {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                })
            })
        }

        fn fetch_local<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, FetchError>> {
            Box::pin(async move {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
            })
        }
    }

    async fn controller_for(contents: &str) -> (tempfile::TempDir, ConfigController) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pref.toml");
        std::fs::write(&path, contents).unwrap();

        let fetcher: Arc<dyn Fetcher> = Arc::new(NoFetch);
        let controller = ConfigController::bootstrap(
            path,
            LaunchFlags::default(),
            Arc::new(RulesetStore::new(Arc::clone(&fetcher))),
            Arc::new(TemplateSet::new(fetcher)),
        )
        .await;
        (dir, controller)
    }

    #[tokio::test]
    async fn bootstrap_reads_file() {
        let (_dir, controller) =
            controller_for("[common]\napi_access_token = \"t\"\n[server]\nport = 8000\n").await;
        assert_eq!(controller.state().access_token, "t");
        assert_eq!(controller.server_config().port, 8000);
    }

    #[tokio::test]
    async fn bootstrap_falls_back_to_defaults() {
        let (_dir, controller) = controller_for("this is not toml").await;
        assert_eq!(controller.state().access_token, "");
        assert_eq!(controller.server_config().port, 25500);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_state() {
        let (_dir, controller) = controller_for("[common]\napi_access_token = \"t\"\n").await;
        std::fs::write(controller.preference_path(), "[server]\nport = 0\n").unwrap();

        assert!(matches!(
            controller.reload().await,
            Err(ConfigError::Validation(_))
        ));
        assert_eq!(controller.state().access_token, "t");
    }

    #[tokio::test]
    async fn port_override_wins_over_file() {
        let (_dir, mut controller) = controller_for("[server]\nport = 8000\n").await;
        controller.apply_overrides(EnvOverrides {
            port: Some(9999),
            ..Default::default()
        });
        assert_eq!(controller.server_config().port, 9999);
    }

    #[tokio::test]
    async fn token_override_survives_reload() {
        let (_dir, mut controller) = controller_for("[common]\napi_access_token = \"file\"\n").await;
        controller.apply_overrides(EnvOverrides {
            access_token: Some("env".into()),
            ..Default::default()
        });
        assert_eq!(controller.state().access_token, "env");

        controller.reload().await.unwrap();
        assert_eq!(controller.state().access_token, "env");
    }

    #[tokio::test]
    async fn unknown_encoding_leaves_file_untouched() {
        let original = "[common]\napi_access_token = \"t\"\n";
        let (_dir, controller) = controller_for(original).await;

        let err = controller
            .apply_update(b"[server]\nport = 1\n", "bogus")
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::NotImplemented(ref e) if e == "bogus"));
        assert_eq!(
            std::fs::read_to_string(controller.preference_path()).unwrap(),
            original
        );
    }

    #[tokio::test]
    async fn form_update_persists_and_reloads() {
        let (_dir, controller) = controller_for("").await;
        controller
            .apply_update(b"common.api_access_token=abc&server.port=8088", "form")
            .await
            .unwrap();

        let state = controller.state();
        assert_eq!(state.access_token, "abc");
        assert_eq!(state.preferences.server.port, 8088);
        // The listener keeps the port it started with.
        assert_eq!(controller.server_config().port, 25500);
    }

    #[tokio::test]
    async fn numeric_form_token_survives_restart() {
        let (_dir, controller) = controller_for("").await;
        controller
            .apply_update(b"common.api_access_token=12345", "form")
            .await
            .unwrap();
        assert_eq!(controller.state().access_token, "12345");

        let fetcher: Arc<dyn Fetcher> = Arc::new(NoFetch);
        let restarted = ConfigController::bootstrap(
            controller.preference_path().to_path_buf(),
            LaunchFlags::default(),
            Arc::new(RulesetStore::new(Arc::clone(&fetcher))),
            Arc::new(TemplateSet::new(fetcher)),
        )
        .await;
        assert_eq!(restarted.state().access_token, "12345");
    }

    #[tokio::test]
    async fn invalid_update_is_not_persisted() {
        let original = "[common]\napi_access_token = \"t\"\n";
        let (_dir, controller) = controller_for(original).await;

        let err = controller
            .apply_update(b"[server]\nport = 0\n", "direct")
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Config(ConfigError::Validation(_))));
        assert!(controller
            .apply_update(b"[common]\napi_access_token = 1\n", "direct")
            .await
            .is_err());

        assert_eq!(
            std::fs::read_to_string(controller.preference_path()).unwrap(),
            original
        );
        assert_eq!(controller.state().access_token, "t");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reloads_racing_updates_never_see_partial_file() {
        let (_dir, controller) = controller_for("[common]\napi_access_token = \"secret\"\n").await;
        let controller = Arc::new(controller);

        // Large enough that a write in place would be observed half done.
        let mut body = String::from("[common]\napi_access_token = \"secret\"\n");
        for i in 0..20_000 {
            body.push_str(&format!("# padding line {i:>40}\n"));
        }

        let writer = {
            let controller = Arc::clone(&controller);
            let body = body.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    controller.apply_update(body.as_bytes(), "direct").await.unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    for _ in 0..20 {
                        controller.reload().await.unwrap();
                        assert_eq!(controller.state().access_token, "secret");
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(controller.state().access_token, "secret");
    }

    #[tokio::test]
    async fn direct_update_refreshes_rulesets_when_eager() {
        let (_dir, controller) = controller_for("").await;
        let before = controller.rulesets().read().id();

        controller
            .apply_update(
                b"[[rulesets]]\ngroup = \"A\"\nruleset = \"[]FINAL\"\n",
                "direct",
            )
            .await
            .unwrap();

        let generation = controller.rulesets().read();
        assert_eq!(generation.id(), before + 1);
        assert_eq!(generation.len(), 1);
    }

    #[tokio::test]
    async fn update_skips_refresh_when_lazy() {
        let (_dir, controller) = controller_for("").await;
        controller
            .apply_update(
                b"[ruleset]\nupdate_ruleset_on_request = true\n[[rulesets]]\ngroup = \"A\"\nruleset = \"[]FINAL\"\n",
                "direct",
            )
            .await
            .unwrap();

        assert_eq!(controller.rulesets().read().id(), 0);
        assert!(controller.state().update_ruleset_on_request);
    }

    #[tokio::test]
    async fn reload_does_not_refresh_rulesets() {
        let (_dir, controller) =
            controller_for("[[rulesets]]\ngroup = \"A\"\nruleset = \"[]FINAL\"\n").await;
        controller.refresh_rulesets().await;
        assert_eq!(controller.rulesets().read().id(), 1);

        controller.reload().await.unwrap();
        assert_eq!(controller.rulesets().read().id(), 1);
    }
}
