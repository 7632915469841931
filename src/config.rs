use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, CLI winning.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_file: String,
    pub strict_snapshot: bool,
    pub mail_api_base: String,
    pub mail_api_token: Option<String>,
    pub mail_api_cookie: Option<String>,
    pub sender_keyword: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Shared mailbox pool tracker")]
pub struct Args {
    /// Host to bind to (overrides MAILBOX_POOL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MAILBOX_POOL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Path of the JSON snapshot file (overrides MAILBOX_POOL_DATA_FILE)
    #[arg(long)]
    pub data_file: Option<String>,

    /// Refuse to start from an unparsable snapshot instead of silently
    /// treating it as empty (overrides MAILBOX_POOL_STRICT_SNAPSHOT)
    #[arg(long)]
    pub strict_snapshot: bool,

    /// Base URL of the mail-retrieval API (overrides MAILBOX_POOL_MAIL_API_BASE)
    #[arg(long)]
    pub mail_api_base: Option<String>,

    /// Public token sent to the mail-retrieval API
    /// (overrides MAILBOX_POOL_MAIL_API_TOKEN)
    #[arg(long)]
    pub mail_api_token: Option<String>,

    /// Session cookie sent to the mail-retrieval API
    /// (overrides MAILBOX_POOL_MAIL_API_COOKIE)
    #[arg(long)]
    pub mail_api_cookie: Option<String>,

    /// Keyword for the sender/subject heuristic on retrieved mail
    /// (overrides MAILBOX_POOL_SENDER_KEYWORD)
    #[arg(long)]
    pub sender_keyword: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("MAILBOX_POOL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("MAILBOX_POOL_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing MAILBOX_POOL_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading MAILBOX_POOL_PORT"),
        };
        let env_data_file =
            env::var("MAILBOX_POOL_DATA_FILE").unwrap_or_else(|_| "./data/mailboxes.json".into());
        let env_strict = env::var("MAILBOX_POOL_STRICT_SNAPSHOT")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let env_mail_base = env::var("MAILBOX_POOL_MAIL_API_BASE")
            .unwrap_or_else(|_| "http://127.0.0.1:5001".into());
        let env_mail_token = env::var("MAILBOX_POOL_MAIL_API_TOKEN").ok();
        let env_mail_cookie = env::var("MAILBOX_POOL_MAIL_API_COOKIE").ok();
        let env_keyword =
            env::var("MAILBOX_POOL_SENDER_KEYWORD").unwrap_or_else(|_| "cursor".into());

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            data_file: args.data_file.unwrap_or(env_data_file),
            strict_snapshot: args.strict_snapshot || env_strict,
            mail_api_base: args.mail_api_base.unwrap_or(env_mail_base),
            mail_api_token: args.mail_api_token.or(env_mail_token),
            mail_api_cookie: args.mail_api_cookie.or(env_mail_cookie),
            sender_keyword: args.sender_keyword.unwrap_or(env_keyword),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
