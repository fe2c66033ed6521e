use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub app: AppSettings,
}

/// Credentials and endpoint of the hosted application service.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub api_key: String,
    pub app_id: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    app: AppSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    #[serde(default = "default_database_path")]
    path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AppSection {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    app_id: String,
    #[serde(default)]
    base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    "deskstream.redb".to_string()
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(Self {
                host: file_config.server.host,
                port: file_config.server.port,
                database_path: file_config.database.path,
                app: AppSettings {
                    api_key: file_config.app.api_key,
                    app_id: file_config.app.app_id,
                    base_url: file_config.app.base_url,
                },
            });
        }

        Ok(Self::from_env())
    }

    fn from_env() -> Self {
        let host = env::var("DESKSTREAM_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("DESKSTREAM_SERVER_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let database_path =
            env::var("DESKSTREAM_DB_PATH").unwrap_or_else(|_| default_database_path());
        let api_key = env::var("DASHSCOPE_API_KEY").unwrap_or_default();
        let app_id = env::var("BAILIAN_APP_ID").unwrap_or_default();
        let base_url = env::var("BAILIAN_BASE_URL").ok();

        Self {
            host,
            port,
            database_path,
            app: AppSettings {
                api_key,
                app_id,
                base_url,
            },
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("DESKSTREAM_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}
