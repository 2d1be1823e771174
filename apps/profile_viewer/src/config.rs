use std::{fs, io, path::Path, time::Duration};

use anyhow::{bail, Context};
use client_core::{CatalogError, Locale, DEFAULT_POLL_INTERVAL};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub locale: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// How long to keep the page open. Zero keeps it open until a redirect
    /// or Ctrl-C.
    pub watch_seconds: u64,
    pub catalog_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".into(),
            locale: "en".into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_secs: 10,
            watch_seconds: 30,
            catalog_path: None,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn watch_for(&self) -> Option<Duration> {
        (self.watch_seconds > 0).then(|| Duration::from_secs(self.watch_seconds))
    }

    pub fn locale(&self) -> Result<Locale, CatalogError> {
        self.locale.parse()
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    locale: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    watch_seconds: Option<u64>,
    catalog_path: Option<String>,
}

/// Defaults, then the TOML file at `path` if it exists, then `APP__*`
/// environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.locale {
        settings.locale = v;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        if v == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.watch_seconds {
        settings.watch_seconds = v;
    }
    if file_cfg.catalog_path.is_some() {
        settings.catalog_path = file_cfg.catalog_path;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__LOCALE") {
        settings.locale = v;
    }

    if let Some(v) = var("APP__POLL_INTERVAL_MS") {
        match v.parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.poll_interval_ms = parsed,
            _ => warn!(value = %v, "ignoring invalid APP__POLL_INTERVAL_MS"),
        }
    }
    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = var("APP__WATCH_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.watch_seconds = parsed;
        }
    }

    if let Some(v) = var("APP__CATALOG_PATH") {
        settings.catalog_path = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_poll_every_seven_seconds() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval(), Duration::from_millis(7000));
        assert_eq!(settings.locale().expect("locale"), Locale::En);
        assert_eq!(settings.watch_for(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            "server_url = \"http://dating.test\"\nlocale = \"fr\"\npoll_interval_ms = 2500\n",
        )
        .expect("apply file");

        assert_eq!(settings.server_url, "http://dating.test");
        assert_eq!(settings.locale().expect("locale"), Locale::Fr);
        assert_eq!(settings.poll_interval_ms, 2500);
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn env_overrides_file_and_skips_bad_numbers() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "poll_interval_ms = 2500\nwatch_seconds = 5\n").expect("file");
        apply_env(
            &mut settings,
            env_from(&[
                ("SERVER_URL", "http://plain.test"),
                ("APP__SERVER_URL", "http://app.test"),
                ("APP__POLL_INTERVAL_MS", "soon"),
                ("APP__WATCH_SECONDS", "0"),
                ("APP__CATALOG_PATH", "/etc/viewer/messages.toml"),
            ]),
        );

        assert_eq!(settings.server_url, "http://app.test");
        assert_eq!(settings.poll_interval_ms, 2500);
        assert_eq!(settings.watch_for(), None);
        assert_eq!(
            settings.catalog_path.as_deref(),
            Some("/etc/viewer/messages.toml")
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut settings = Settings::default();
        apply_env(&mut settings, env_from(&[("APP__POLL_INTERVAL_MS", "0")]));
        assert_eq!(settings.poll_interval_ms, 7000);

        let err = apply_file(&mut settings, "poll_interval_ms = 0\n").expect_err("must fail");
        assert!(err.to_string().contains("greater than zero"));
        assert_eq!(settings.poll_interval_ms, 7000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings =
            load_settings(Path::new("/nonexistent/profile_viewer.toml")).expect("settings");
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("profile_viewer_test_{suffix}.toml"));
        fs::write(&path, "poll_interval_ms = \"often\"\n").expect("write");

        let err = load_settings(&path).expect_err("must fail");
        assert!(err.to_string().contains("invalid settings file"));

        fs::remove_file(path).expect("cleanup");
    }
}
