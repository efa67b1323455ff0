use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cis_api::{
    ApiClient, ApiError, ClientConfig, HttpTokenRefresher, ListQuery, LoginRequest, MessageKind,
    MessageStatus, OutgoingMessage,
};
use cis_auth::StoredCredentials;
use cis_core::{AppError, ClientStorage, Config};
use cis_i18n::{Catalog, Locale, Translator};

const PASSWORD_ENV: &str = "CIS_PASSWORD";

#[derive(Parser)]
#[command(name = "cis", version, about = "Climate Information System client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session token.
    Login {
        email: String,
        /// Falls back to the CIS_PASSWORD environment variable.
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the session token.
    Logout,
    /// List farmers, optionally exporting them to CSV.
    Farmers {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        /// Write the list to this CSV file instead of printing it.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List locations.
    Locations {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List sent messages.
    Messages,
    /// Send an SMS or alert to farmers and/or locations.
    Send {
        /// Farmer ids, comma separated.
        #[arg(long, value_delimiter = ',')]
        farmers: Vec<i64>,
        /// Location ids, comma separated.
        #[arg(long, value_delimiter = ',')]
        locations: Vec<i64>,
        #[arg(long)]
        alert: bool,
        #[arg(trailing_var_arg = true, required = true)]
        content: Vec<String>,
    },
    /// Current weather and forecast for a location.
    Weather {
        location_id: i64,
        #[arg(long, default_value_t = 3)]
        days: u8,
    },
    /// Show or change the interface language (en, rw).
    Locale { code: Option<String> },
    /// Show configuration and session state.
    Status,
}

struct App {
    config: Config,
    storage: Arc<ClientStorage>,
    client: ApiClient,
    tr: Translator,
}

impl App {
    fn build() -> Result<Self> {
        let (config, _validation) = Config::load_validated()?;

        let storage = Arc::new(
            ClientStorage::open(config.storage_path()).context("Failed to open client storage")?,
        );
        let credentials = Arc::new(StoredCredentials::new(storage.clone()));

        let client_config = ClientConfig::from(&config.api);
        let refresher = Arc::new(HttpTokenRefresher::new(&client_config, credentials.clone()));
        let client = ApiClient::new(client_config, credentials).with_refresher(refresher);

        let first_run_locale = config.i18n.default_locale.parse().unwrap_or_default();
        let tr = Translator::load_with(Arc::new(Catalog::bundled()), &storage, first_run_locale);

        Ok(Self {
            config,
            storage,
            client,
            tr,
        })
    }

    /// Translate an API failure for display.
    fn describe(&self, err: &ApiError) -> String {
        match err {
            ApiError::Network(_) => self.tr.t("errors.network"),
            ApiError::Timeout(_) => self.tr.t("errors.timeout"),
            ApiError::Http { status: 404, .. } => self.tr.t("errors.not_found"),
            ApiError::Http { status, .. } if *status >= 500 => {
                self.tr.resolve("errors.server", &[("status", status)])
            }
            ApiError::Auth(cis_core::AuthError::InvalidCredentials) => {
                self.tr.t("auth.invalid_credentials")
            }
            ApiError::Auth(_) => self.tr.t("auth.session_expired"),
            other => other.user_message(),
        }
    }

    fn fail(&self, err: ApiError) -> anyhow::Error {
        tracing::debug!("Command failed: {}", err);
        anyhow::anyhow!(self.describe(&err))
    }

    async fn run(self, command: Commands) -> Result<()> {
        match command {
            Commands::Login { email, password } => {
                let password = match password {
                    Some(password) => password,
                    None => std::env::var(PASSWORD_ENV)
                        .with_context(|| format!("Pass --password or set {}", PASSWORD_ENV))?,
                };

                let session = self
                    .client
                    .login(&LoginRequest { email, password })
                    .await
                    .map_err(|e| self.fail(e))?;
                let name = session.user.map(|u| u.name).unwrap_or_default();
                println!("{}", self.tr.resolve("auth.welcome", &[("name", &name)]));
            }
            Commands::Logout => {
                self.client.logout().await.map_err(|e| self.fail(e))?;
                println!("{}", self.tr.t("auth.logged_out"));
            }
            Commands::Farmers {
                search,
                page,
                export,
            } => {
                let query = ListQuery {
                    page,
                    per_page: None,
                    search,
                };

                if let Some(file) = export {
                    let written = self
                        .client
                        .export_farmers(&query, file)
                        .await
                        .map_err(|e| self.export_failed(e))?;
                    let file = written.display().to_string();
                    println!("{}", self.tr.resolve("farmers.exported", &[("file", &file)]));
                    return Ok(());
                }

                let farmers = self.client.list_farmers(&query).await.map_err(|e| self.fail(e))?;
                if farmers.is_empty() {
                    println!("{}", self.tr.t("farmers.empty"));
                    return Ok(());
                }
                println!("{}", self.tr.resolve("farmers.count", &[("count", &farmers.len())]));
                for farmer in farmers {
                    println!("{:>6}  {:<30} {}", farmer.id, farmer.name, farmer.phone);
                }
            }
            Commands::Locations { search } => {
                let query = search.map(ListQuery::search).unwrap_or_default();
                let locations = self.client.list_locations(&query).await.map_err(|e| self.fail(e))?;
                if locations.is_empty() {
                    println!("{}", self.tr.t("locations.empty"));
                    return Ok(());
                }
                println!("{}", self.tr.resolve("locations.count", &[("count", &locations.len())]));
                for location in locations {
                    println!("{:>6}  {}", location.id, location.display_path());
                }
            }
            Commands::Messages => {
                let messages = self
                    .client
                    .list_messages(&ListQuery::default())
                    .await
                    .map_err(|e| self.fail(e))?;
                if messages.is_empty() {
                    println!("{}", self.tr.t("messages.empty"));
                }
                for message in messages {
                    println!(
                        "{:>6}  {:<16} {:<18} {}",
                        message.id,
                        self.tr.t(kind_key(message.kind)),
                        self.tr.t(status_key(message.status)),
                        message.content
                    );
                }
            }
            Commands::Send {
                farmers,
                locations,
                alert,
                content,
            } => {
                let content = content.join(" ");
                let message = if alert {
                    OutgoingMessage::alert(content)
                } else {
                    OutgoingMessage::sms(content)
                }
                .to_farmers(farmers)
                .to_locations(locations);

                let queued = self.client.send_message(&message).await.map_err(|e| self.fail(e))?;
                println!(
                    "{}",
                    self.tr.resolve("messages.sent_count", &[("count", &queued.recipient_count)])
                );
            }
            Commands::Weather { location_id, days } => {
                let current = self
                    .client
                    .current_weather(location_id)
                    .await
                    .map_err(|e| self.fail(e))?;
                println!("{}", self.tr.t("weather.current"));
                println!("  {}", self.tr.t(current.condition.i18n_key()));
                println!(
                    "  {}",
                    self.tr.resolve("weather.temperature", &[("value", &current.temperature_c)])
                );
                if let Some(rain) = current.rainfall_mm {
                    println!("  {}", self.tr.resolve("weather.rainfall", &[("value", &rain)]));
                }

                let forecast = self
                    .client
                    .forecast(location_id, days)
                    .await
                    .map_err(|e| self.fail(e))?;
                println!("{}", self.tr.t("weather.forecast"));
                for day in &forecast {
                    println!(
                        "  {}  {:<20} {}",
                        day.date,
                        self.tr.t(day.condition.i18n_key()),
                        self.tr.resolve(
                            "weather.range",
                            &[("min", &day.min_temp_c), ("max", &day.max_temp_c)]
                        )
                    );
                }
                if forecast.iter().any(|day| day.condition.is_severe()) {
                    println!("{}", self.tr.t("weather.severe_warning"));
                }
            }
            Commands::Locale { code: None } => {
                let locale = self.tr.locale();
                println!("{} ({})", self.tr.t(locale.name_key()), locale);
            }
            Commands::Locale { code: Some(code) } => {
                let (_tr, line) = switch_locale(self.tr, &code, &self.storage);
                println!("{}", line);
            }
            Commands::Status => {
                println!("Config directory: {}", self.config.config_dir.display());
                println!("API: {}", self.client.config().base_url);
                println!("Signed in: {}", self.client.is_authenticated());
                println!("{}: {}", self.tr.t("settings.language"), self.tr.locale());
            }
        }

        Ok(())
    }

    fn export_failed(&self, err: AppError) -> anyhow::Error {
        let reason = err.user_message();
        anyhow::anyhow!(self.tr.resolve("errors.export_failed", &[("reason", &reason)]))
    }
}

/// Apply a language change, returning the translator to use from now on and
/// the line to show. Unsupported codes leave the current language in place.
fn switch_locale(tr: Translator, code: &str, storage: &ClientStorage) -> (Translator, String) {
    if code.parse::<Locale>().is_err() {
        let current = tr.t(tr.locale().name_key());
        let line = tr.resolve(
            "settings.unsupported_language",
            &[("code", &code), ("current", &current)],
        );
        return (tr.change_locale(code, storage), line);
    }

    let tr = tr.change_locale(code, storage);
    let language = tr.t(tr.locale().name_key());
    let line = tr.resolve("settings.language_changed", &[("language", &language)]);
    (tr, line)
}

fn kind_key(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Sms => "messages.sms",
        MessageKind::Alert => "messages.alert",
    }
}

fn status_key(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Pending => "messages.status.pending",
        MessageStatus::Sent => "messages.status.sent",
        MessageStatus::Delivered => "messages.status.delivered",
        MessageStatus::Failed => "messages.status.failed",
        MessageStatus::Unknown => "messages.status.unknown",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    cis_core::init()?;

    let app = App::build()?;
    app.run(cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cis_i18n::LOCALE_KEY;

    fn english() -> Translator {
        Translator::new(Arc::new(Catalog::bundled()), Locale::En)
    }

    #[test]
    fn test_switch_locale_persists_valid_code() {
        let storage = ClientStorage::in_memory();
        let (tr, line) = switch_locale(english(), "rw", &storage);

        assert_eq!(tr.locale(), Locale::Rw);
        assert_eq!(line, "Ururimi rwahinduwe: Ikinyarwanda");
        assert_eq!(storage.get(LOCALE_KEY).as_deref(), Some("rw"));
    }

    #[test]
    fn test_switch_locale_keeps_current_on_unsupported_code() {
        let storage = ClientStorage::in_memory();
        let (tr, line) = switch_locale(english(), "fr", &storage);

        assert_eq!(tr.locale(), Locale::En);
        assert_eq!(line, "Unsupported language fr, keeping English");
        assert_eq!(storage.get(LOCALE_KEY), None);
    }
}
