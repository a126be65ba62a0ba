use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "plate-batch",
    about = "Read license plates from images and output the result as JSON",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Default, Args)]
pub struct SharedArgs {
    /// Cloud API token
    #[arg(short = 'a', long = "api-token")]
    pub api_token: Option<String>,

    /// Url to a self-hosted Snapshot SDK, for example http://localhost:8080
    #[arg(short = 's', long = "sdk-url")]
    pub sdk_url: Option<String>,

    /// Match the license plate pattern of a specific region (repeatable)
    #[arg(short = 'r', long = "region", id = "regions", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Name of the source camera
    #[arg(long = "camera-id")]
    pub camera_id: Option<String>,

    /// Predict vehicle make and model (SDK only)
    #[arg(long = "mmc")]
    pub mmc: bool,

    /// Blur intensity for plate redaction (1-10); requires --blur-dir
    #[arg(long = "blur-amount", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub blur_amount: Option<u32>,

    /// Output directory for redacted image copies
    #[arg(long = "blur-dir", value_name = "DIR")]
    pub blur_dir: Option<PathBuf>,

    /// Minimum spacing between cloud requests, in milliseconds (0 disables)
    #[arg(long = "request-interval", value_name = "MILLIS")]
    pub request_interval_ms: Option<u64>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read plates from local images or glob patterns
    Files(FilesArgs),
    /// Read plates from the images on an SFTP server
    Sftp(SftpArgs),
}

#[derive(Debug, Args)]
pub struct FilesArgs {
    /// Path to a vehicle image or a glob pattern
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SftpArgs {
    /// SFTP host
    #[arg(short = 'H', long = "host")]
    pub host: String,

    /// SFTP user
    #[arg(short = 'U', long = "user")]
    pub user: String,

    /// SFTP port
    #[arg(short = 'p', long = "port", default_value_t = 22)]
    pub port: u16,

    /// SFTP password (mutually exclusive with --pkey)
    #[arg(short = 'P', long = "password")]
    pub password: Option<String>,

    /// SFTP private key path (mutually exclusive with --password)
    #[arg(long = "pkey", value_name = "FILE")]
    pub pkey: Option<PathBuf>,

    /// Folder with images on the SFTP server
    #[arg(short = 'f', long = "folder", default_value = "/")]
    pub folder: PathBuf,
}
