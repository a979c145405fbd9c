use std::{env, path::PathBuf, sync::OnceLock};
use tokio::{fs::{create_dir_all, read_to_string, File}, io::AsyncWriteExt};
use serde::{Deserialize, Serialize};
use clap::Parser;
use crate::{error::Error, tools::{log::{log_info, LogServiceType}, recognition::DEFAULT_TOLERANCE}, Result};


static ARGS: OnceLock<Args> = OnceLock::new();


const ENV_DIR: &str = "IMAGE_ORGANIZER_DIR";
const ENV_PORT: &str = "IMAGE_ORGANIZER_PORT";
const ENV_TOLERANCE: &str = "FACE_RECOGNITION_TOLERANCE";
const ENV_EXTRACTOR: &str = "EXTRACTOR_URL";
const ENV_CLOUDINARY_NAME: &str = "CLOUDINARY_CLOUD_NAME";
const ENV_CLOUDINARY_KEY: &str = "CLOUDINARY_API_KEY";
const ENV_CLOUDINARY_SECRET: &str = "CLOUDINARY_API_SECRET";

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: Option<u16>,
    /// Base url used to build links to locally stored files.
    pub public_url: Option<String>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// Face detection service. Without it no face is ever detected.
    pub extractor_url: Option<String>,
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Images go to Cloudinary when set, to the local data folder otherwise.
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: None,
            public_url: None,
            tolerance: default_tolerance(),
            extractor_url: None,
            allowed_extensions: default_extensions(),
            cloudinary: None,
        }
    }
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn public_url(&self) -> String {
        self.public_url.clone().unwrap_or_else(|| format!("http://localhost:{}", self.port()))
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data folder (database, config and local images)
    #[arg(short, long)]
    dir: Option<String>,

    #[arg(short = 'k', long)]
    docker: bool,

    #[arg(short, long)]
    port: Option<u16>,
}

fn args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}

fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE
}

fn default_folder() -> String {
    "image-organizer".to_string()
}

fn default_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp"].iter().map(|e| e.to_string()).collect()
}

pub async fn initialize_config() -> Result<ServerConfig> {
    let local_path = get_server_local_path().await?;
    log_info(LogServiceType::Register, format!("LocalPath: {:?}", local_path));
    get_config_with_overrides().await
}

pub async fn get_server_local_path() -> Result<PathBuf> {
    let args = args();

    let dir_path = if let Some(argdir) = &args.dir {
        PathBuf::from(argdir)
    } else if let Ok(val) = env::var(ENV_DIR) {
        PathBuf::from(&val)
    } else if args.docker {
        PathBuf::from("/config")
    } else {
        let Some(mut dir_path) = dirs::config_local_dir() else { return Err(Error::ServerUnableToAccessServerLocalFolder); };
        dir_path.push("image-organizer");
        dir_path
    };

    let Ok(_) = create_dir_all(&dir_path).await else { return Err(Error::ServerUnableToAccessServerLocalFolder); };

    Ok(dir_path)
}

/// Environment variables win over the config file.
fn apply_overrides(config: &mut ServerConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(port) = var(ENV_PORT).and_then(|p| p.parse::<u16>().ok()) {
        config.port = Some(port);
    }
    if let Some(tolerance) = var(ENV_TOLERANCE).and_then(|t| t.parse::<f32>().ok()).filter(|t| *t > 0.0) {
        config.tolerance = tolerance;
    }
    if let Some(extractor) = var(ENV_EXTRACTOR).filter(|u| !u.is_empty()) {
        config.extractor_url = Some(extractor);
    }
    if let (Some(cloud_name), Some(api_key), Some(api_secret)) = (var(ENV_CLOUDINARY_NAME), var(ENV_CLOUDINARY_KEY), var(ENV_CLOUDINARY_SECRET)) {
        let folder = config.cloudinary.as_ref().map(|c| c.folder.clone()).unwrap_or_else(default_folder);
        config.cloudinary = Some(CloudinaryConfig { cloud_name, api_key, api_secret, folder });
    }
}

pub async fn get_config_with_overrides() -> Result<ServerConfig> {
    let mut config = get_raw_config().await?;
    apply_overrides(&mut config, |name| env::var(name).ok());
    if let Some(port) = args().port {
        config.port = Some(port);
    }
    Ok(config)
}

pub async fn get_raw_config() -> Result<ServerConfig> {
    let dir_path = get_server_file_path("config.json").await?;

    if let Ok(data) = read_to_string(&dir_path).await {
        let Ok(config) = serde_json::from_str::<ServerConfig>(&data) else { return Err(Error::ServerMalformatedConfigFile); };
        Ok(config)
    } else {
        let new_config = ServerConfig::default();
        let new_config_string = serde_json::to_string_pretty(&new_config)?;
        let Ok(mut file) = File::create(dir_path).await else { return Err(Error::ServerUnableToAccessServerLocalFolder); };
        file.write_all(new_config_string.as_bytes()).await?;
        Ok(new_config)
    }
}

pub async fn get_server_file_path(name: &str) -> Result<PathBuf> {
    let mut dir_path: PathBuf = get_server_local_path().await?;
    dir_path.push(name);
    Ok(dir_path)
}

pub async fn get_server_file_path_array(mut names: Vec<&str>) -> Result<PathBuf> {
    let mut dir_path: PathBuf = get_server_local_path().await?;
    if let Some(last) = names.pop() {
        for name in names {
            dir_path.push(name);
        }
        create_dir_all(&dir_path).await?;
        dir_path.push(last);
    }
    Ok(dir_path)
}

pub async fn get_server_folder_path_array(names: Vec<&str>) -> Result<PathBuf> {
    let mut dir_path: PathBuf = get_server_local_path().await?;
    for name in names {
        dir_path.push(name);
    }
    create_dir_all(&dir_path).await?;
    Ok(dir_path)
}
