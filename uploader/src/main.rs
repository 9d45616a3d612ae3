use clap::Parser;
use eyre::Context;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_uploader::{
    CredentialManager, OAuthManager, UploadRequest, YouTubeClient, config, credentials, pipeline,
};

/// Upload a video to YouTube as described by a JSON config file.
#[derive(Debug, Parser)]
#[command(name = "youtube-upload", version)]
struct Cli {
    /// JSON file describing the video to upload.
    #[arg(long, env = "YT_UPLOAD_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// OAuth client secret file downloaded from the Google Cloud console.
    #[arg(long, env = "YT_UPLOAD_CLIENT_SECRET", default_value = "client.json")]
    client_secret: PathBuf,

    /// Where the OAuth token is kept between runs.
    #[arg(long, env = "YT_UPLOAD_TOKEN_STORE", default_value = "token.json")]
    token_store: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    // stdout is for the person (or automation) watching the upload; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    let request = match UploadRequest::load(&cli.config).await {
        Ok(request) => request,
        Err(e) => {
            println!("{:#}", eyre::Report::new(e));
            std::process::exit(1);
        }
    };

    let oauth = OAuthManager::from_client_secret_file(&cli.client_secret).await?;
    let credential_manager = CredentialManager::new(oauth, &cli.token_store);
    let token = credential_manager
        .obtain(async |auth_url: &str| credentials::prompt_on_console(auth_url).await)
        .await
        .context("obtain YouTube credentials")?;
    tracing::debug!(
        store = %credential_manager.store_path().display(),
        expires_at = %token.expires_at,
        "have valid token"
    );

    let yt = YouTubeClient::new(token.access_token())?;
    pipeline::run(&request, &yt).await?;

    Ok(())
}
