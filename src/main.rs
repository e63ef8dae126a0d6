mod config;
mod logging;
mod ports;
mod services;
mod spotify_rs;
mod yandex_rs;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

use crate::{
    config::Config,
    logging::setup_logging,
    services::{
        cover_image::FfmpegImageCodec,
        transfer::{Category, ImportOptions, Importer, report::ImportReport},
    },
    spotify_rs::{auth::authorize_interactively, client::SpotifyClient},
    yandex_rs::client::YandexClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MUSIC_MIGRATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log level (default: info)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "MUSIC_MIGRATE_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Request timeout in seconds, overrides the config file
    #[arg(short = 'T', long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct SpotifyArgs {
    /// Spotify app client id
    #[arg(long = "id", env = "SPOTIFY_CLIENT_ID")]
    client_id: Option<String>,

    /// Spotify app client secret
    #[arg(long = "secret", env = "SPOTIFY_CLIENT_SECRET")]
    client_secret: Option<String>,

    /// Use this access token instead of logging in
    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN")]
    spotify_access_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import the Yandex Music library into Spotify
    Import {
        /// Categories to skip
        #[arg(short, long, value_enum, num_args = 1..)]
        ignore: Vec<Category>,

        /// Don't retry a multi-artist search with the first artist only
        #[arg(short = 'S', long)]
        strict_artists_search: bool,

        /// Only import tracks and albums Yandex Music marks as unavailable
        #[arg(long)]
        only_unavailable: bool,

        /// Yandex Music OAuth token
        #[arg(short = 't', long, env = "YANDEX_TOKEN")]
        yandex_token: Option<String>,

        #[command(flatten)]
        spotify: SpotifyArgs,
    },
    /// Import tracks listed in a JSON file into a new Spotify playlist
    ImportJson {
        /// JSON array of {"artist", "track", "timestamp"?} objects
        #[arg(short = 'j', long)]
        path: PathBuf,

        /// Don't retry a multi-artist search with the first artist only
        #[arg(short = 'S', long)]
        strict_artists_search: bool,

        #[command(flatten)]
        spotify: SpotifyArgs,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

/// Destination client from an explicit token, or through the interactive login.
async fn connect_spotify(
    spotify: SpotifyArgs,
    config: &Config,
    timeout: Duration,
) -> Result<SpotifyClient> {
    if let Some(token) = spotify.spotify_access_token {
        log::debug!("Using the provided Spotify access token");
        return Ok(SpotifyClient::new(token, timeout));
    }

    let client_id = spotify
        .client_id
        .or_else(|| config.spotify.client_id.clone())
        .ok_or_else(|| eyre!("Spotify client id is required (--id or SPOTIFY_CLIENT_ID)"))?;
    let client_secret = spotify
        .client_secret
        .or_else(|| config.spotify.client_secret.clone())
        .ok_or_else(|| {
            eyre!("Spotify client secret is required (--secret or SPOTIFY_CLIENT_SECRET)")
        })?;

    let token =
        authorize_interactively(&client_id, &client_secret, &config.spotify.redirect_uri)
            .await
            .wrap_err("Spotify login failed")?;
    log::debug!("Spotify token granted for scopes: {}", token.scope);

    Ok(SpotifyClient::new(token.access_token, timeout))
}

fn print_report(report: &ImportReport) {
    println!();
    print!("{}", report);
    if report.is_clean() {
        log::info!("Everything was imported");
    } else {
        log::warn!("{} items were not imported", report.total_failures());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("Music migrate starting");
    log::debug!("Loading configuration");

    let mut config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load music-migrate config")?;

    if let Some(timeout) = args.timeout {
        config.import.request_timeout_secs = timeout;
    }
    let timeout = config.import.request_timeout();

    match args.command {
        Commands::Import {
            ignore,
            strict_artists_search,
            only_unavailable,
            yandex_token,
            spotify,
        } => {
            let skip: HashSet<Category> = ignore.into_iter().collect();
            let options: ImportOptions = config
                .import
                .import_options(strict_artists_search, only_unavailable);

            let yandex_token = yandex_token
                .or_else(|| config.yandex.token.clone())
                .ok_or_else(|| eyre!("Yandex Music token is required (--yandex-token or YANDEX_TOKEN)"))?;
            let source =
                YandexClient::connect(yandex_token, timeout, config.import.cover_size.clone())
                    .await?;

            let destination = connect_spotify(spotify, &config, timeout).await?;
            let importer = Importer::connect(destination, options).await?;

            let report = importer
                .run_full_import(&source, &FfmpegImageCodec, &skip)
                .await;
            print_report(&report);
        }
        Commands::ImportJson {
            path,
            strict_artists_search,
            spotify,
        } => {
            log::debug!("Starting JSON import from: {}", path.display());
            let options = config.import.import_options(strict_artists_search, false);

            let destination = connect_spotify(spotify, &config, timeout).await?;
            let importer = Importer::connect(destination, options).await?;

            let report = importer.run_json_import(&path).await?;
            print_report(&report);
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}
