//! CLI commands

use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use wayfarer_core::FileCredentialStore;
use wayfarer_http::client::{ApiRequest, FormField, WayfarerClientBuilder};
use wayfarer_http::reqwest::Method;
use wayfarer_http::types::{LoginRequest, RegisterRequest};
use wayfarer_http::{ApiResponse, WayfarerClient};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the issued tokens
    Login {
        #[arg(long)]
        username: String,

        #[arg(long, env = "WAYFARER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store the issued tokens
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "WAYFARER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored tokens
    Logout,

    /// Show who is logged in
    Status,

    /// Send a request through the authenticated gateway
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,

        /// Path relative to the base URL
        path: String,

        /// JSON request body
        #[arg(long, conflicts_with_all = ["form", "file"])]
        json: Option<String>,

        /// Multipart text field as key=value
        #[arg(long, value_parser = parse_key_value)]
        form: Vec<(String, String)>,

        /// Multipart file field as key=path
        #[arg(long, value_parser = parse_key_value)]
        file: Vec<(String, String)>,
    },

    /// Generate a default configuration file
    Config {
        /// Output file path (defaults to <data dir>/config.json)
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub async fn execute(self, data_dir: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
        let connect = || -> Result<WayfarerClient> {
            let client_config = config::load_client_config(config_path.as_deref())?;
            let client = WayfarerClientBuilder::from_config(&client_config)
                .credential_store(Arc::new(FileCredentialStore::in_dir(&data_dir)))
                .build()?;
            info!(base_url = client.base_url(), "Client ready");
            Ok(client)
        };

        match self {
            Commands::Login { username, password } => {
                let credential = connect()?
                    .login(LoginRequest { username, password })
                    .await?;
                print_identity(credential.user.as_ref().map(|u| u.username.as_str()));
                Ok(())
            }
            Commands::Register {
                username,
                email,
                password,
            } => {
                let credential = connect()?
                    .register(RegisterRequest {
                        username,
                        email,
                        password,
                    })
                    .await?;
                print_identity(credential.user.as_ref().map(|u| u.username.as_str()));
                Ok(())
            }
            Commands::Logout => {
                connect()?.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Commands::Status => {
                match connect()?.session().credential().await? {
                    Some(credential) => {
                        print_identity(credential.user.as_ref().map(|u| u.username.as_str()));
                    }
                    None => println!("Not logged in"),
                }
                Ok(())
            }
            Commands::Request {
                method,
                path,
                json,
                form,
                file,
            } => send_request(&connect()?, &method, path, json, form, file).await,
            Commands::Config { output } => {
                let path = output.unwrap_or_else(|| data_dir.join("config.json"));
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                config::generate_default_config(&path)?;
                println!("Generated configuration at: {}", path.display());
                Ok(())
            }
        }
    }
}

async fn send_request(
    client: &WayfarerClient,
    method: &str,
    path: String,
    json: Option<String>,
    form: Vec<(String, String)>,
    file: Vec<(String, String)>,
) -> Result<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| anyhow!("invalid HTTP method: {method}"))?;
    let mut request = ApiRequest::new(method, path);

    if let Some(json) = json {
        let body: serde_json::Value =
            serde_json::from_str(&json).context("--json is not valid JSON")?;
        request = request.json(&body)?;
    } else if !form.is_empty() || !file.is_empty() {
        let mut fields: Vec<FormField> = form
            .into_iter()
            .map(|(name, value)| FormField::text(name, value))
            .collect();
        for (name, path) in file {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            let file_name = PathBuf::from(&path)
                .file_name()
                .map_or_else(|| path.clone(), |n| n.to_string_lossy().into_owned());
            fields.push(FormField::file(name, file_name, bytes));
        }
        request = request.multipart(fields);
    }

    let response = client.send(&request).await?;
    print_response(&response);

    if response.is_success() {
        return Ok(());
    }
    if response.status() == 401 && !client.session().is_authenticated().await? {
        bail!("Session expired, run `wayfarer login` again");
    }
    bail!("Request failed with status {}", response.status())
}

fn print_identity(username: Option<&str>) {
    match username {
        Some(username) => println!("Logged in as {username}"),
        None => println!("Logged in"),
    }
}

fn print_response(response: &ApiResponse) {
    println!("{}", response.status());
    match response.json::<serde_json::Value>() {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{}", response.text()),
        },
        Err(_) if response.body().is_empty() => {}
        Err(_) => println!("{}", response.text()),
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}
