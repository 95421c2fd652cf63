use spotify_backup::config::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_USER};
use spotify_backup::{BackupConfig, SpotifyClientImpl, SpotifyInterface};
use std::path::Path;

/// Initialise `env_logger`; `--verbose` lowers the default filter to `debug`.
///
/// `RUST_LOG` still wins when it is set.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "spotify_backup=debug,info"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Load the config file (or the environment) and print setup hints when that fails.
pub fn load_config(path: Option<&Path>) -> Result<BackupConfig, Box<dyn std::error::Error>> {
    match BackupConfig::resolve(path) {
        Ok(config) => Ok(config),
        Err(e) => {
            eprintln!("Please create a config file with your application credentials:");
            match BackupConfig::default_path() {
                Ok(default) => eprintln!("  {}", default.display()),
                Err(_) => eprintln!("  <config dir>/spotify-backup/config.json"),
            }
            eprintln!();
            eprintln!(r#"  {{"client_id": "...", "secret": "...", "user": "your_user_id"}}"#);
            eprintln!();
            eprintln!("or set the following environment variables:");
            eprintln!("  {ENV_CLIENT_ID}=your_client_id");
            eprintln!("  {ENV_CLIENT_SECRET}=your_client_secret");
            eprintln!("  {ENV_USER}=your_user_id");
            Err(e.into())
        }
    }
}

/// Build the interface over the native HTTP client.
pub fn create_interface(config: BackupConfig) -> SpotifyInterface<SpotifyClientImpl> {
    let http_client = http_client::native::NativeClient::new();
    let client = SpotifyClientImpl::from_config(Box::new(http_client), &config);
    SpotifyInterface::new(client, config)
}

/// Format a track duration in milliseconds as `m:ss`.
pub fn format_duration(milliseconds: i64) -> String {
    let seconds = milliseconds.max(0) / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
