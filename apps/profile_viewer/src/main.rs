use std::{
    future,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    ControllerOptions, CurrentUser, HttpProfileApi, MessageCatalog, ProfileRender,
    ProfileStatusController, RecordingNavigator, UserStore, ViewEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

/// Opens one profile page against a live backend and prints what it renders.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "profile_viewer.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// Signed-in user the page is viewed as.
    #[arg(long)]
    user_id: String,
    #[arg(long, default_value = "")]
    profile_id: String,
    #[arg(long)]
    locale: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: Option<u64>,
    #[arg(long)]
    watch_seconds: Option<u64>,
    #[arg(long)]
    catalog: Option<String>,
}

impl Args {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = &self.locale {
            settings.locale = v.clone();
        }
        if let Some(v) = self.poll_interval_ms {
            settings.poll_interval_ms = v;
        }
        if let Some(v) = self.watch_seconds {
            settings.watch_seconds = v;
        }
        if self.catalog.is_some() {
            settings.catalog_path = self.catalog.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();
    let settings = args.apply(load_settings(&args.config)?);

    run(&settings, &args.user_id, &args.profile_id).await
}

async fn run(settings: &Settings, user_id: &str, profile_id: &str) -> Result<()> {
    let locale = settings.locale()?;
    let catalog = match &settings.catalog_path {
        Some(path) => MessageCatalog::load(locale, Path::new(path))?,
        None => MessageCatalog::builtin(locale),
    };
    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .context("failed to build http client")?;
    let api = HttpProfileApi::with_client(http, &settings.server_url)?;
    let navigator = Arc::new(RecordingNavigator::new());
    let session = UserStore::with_user(CurrentUser::new(user_id));

    let controller = ProfileStatusController::new(
        Arc::new(api),
        navigator.clone(),
        session.clone(),
        Arc::new(catalog),
        ControllerOptions {
            poll_interval: settings.poll_interval(),
        },
    );
    let mut events = controller.subscribe();

    info!(server_url = %settings.server_url, locale = %locale, "opening profile {profile_id:?}");
    let phase = controller.open(profile_id).await;
    info!(?phase, "profile view opened");

    let mut last = controller.render().await;
    println!("{}", describe(&last));

    let deadline = async {
        match settings.watch_for() {
            Some(duration) => tokio::time::sleep(duration).await,
            None => future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    if !matches!(last, ProfileRender::Redirected(_)) {
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(ViewEvent::Redirected(_)) => {
                        println!("{}", describe(&controller.render().await));
                        break;
                    }
                    Ok(_) => {
                        let render = controller.render().await;
                        if render != last {
                            println!("{}", describe(&render));
                            last = render;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "view events lagged"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    controller.close().await;

    for route in navigator.routes() {
        println!("navigated to {route}");
    }
    if let Some(user) = session.current().await {
        println!("session user: {}", serde_json::to_string(&user)?);
    }
    Ok(())
}

fn describe(render: &ProfileRender) -> String {
    match render {
        ProfileRender::Error { message } => format!("error: {message}"),
        ProfileRender::Skeleton => "loading...".to_string(),
        ProfileRender::Content {
            profile,
            is_match,
            is_liked,
            is_blocked,
        } => {
            let mut line = format!(
                "{} [match: {is_match}, liked: {is_liked}, blocked: {is_blocked}]",
                profile.display_name()
            );
            if let Some(age) = profile.age {
                line.push_str(&format!(" age {age}"));
            }
            if !profile.tags.is_empty() {
                line.push_str(&format!(" #{}", profile.tags.join(" #")));
            }
            if let Some(seen) = profile.last_connection_date {
                line.push_str(&format!(" last seen {}", seen.format("%Y-%m-%d %H:%M")));
            }
            line
        }
        ProfileRender::Redirected(route) => format!("redirected to {route}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_loaded_settings() {
        let args = Args::try_parse_from([
            "profile_viewer",
            "--user-id",
            "u1",
            "--profile-id",
            "p9",
            "--locale",
            "es",
            "--watch-seconds",
            "0",
        ])
        .expect("args");

        let settings = args.apply(Settings::default());

        assert_eq!(args.profile_id, "p9");
        assert_eq!(settings.locale, "es");
        assert_eq!(settings.watch_for(), None);
        assert_eq!(settings.server_url, Settings::default().server_url);
    }

    #[test]
    fn cli_rejects_zero_poll_interval() {
        let parsed = Args::try_parse_from([
            "profile_viewer",
            "--user-id",
            "u1",
            "--poll-interval-ms",
            "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn describes_each_render() {
        assert_eq!(describe(&ProfileRender::Skeleton), "loading...");
        assert_eq!(
            describe(&ProfileRender::Redirected(client_core::Route::Dashboard)),
            "redirected to /dashboard"
        );

        let profile = serde_json::from_value(serde_json::json!({
            "id": "p9",
            "firstName": "Ada",
            "age": 36,
            "tags": ["math", "poetry"]
        }))
        .expect("profile");
        assert_eq!(
            describe(&ProfileRender::Content {
                profile,
                is_match: true,
                is_liked: false,
                is_blocked: false,
            }),
            "Ada [match: true, liked: false, blocked: false] age 36 #math #poetry"
        );
    }
}
