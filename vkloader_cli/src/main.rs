use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use vkloader_core::auth::credentials::{oauth_url, Credentials};
use vkloader_core::catalog::catalog_fetcher::API_METHOD_ENDPOINT;
use vkloader_core::types::types::DEFAULT_WORKERS;
use vkloader_core::{Coordinator, LoaderError, PoolConfig};

mod terminal_observer;
use terminal_observer::TerminalProgressObserver;

#[derive(Parser, Debug)]
#[command(name = "vkloader", about = "VK audio downloader")]
struct Args {
    /// Client (application) ID
    client_id: String,

    /// Output directory
    dir: PathBuf,

    /// VK user ID
    #[arg(short = 'u', long = "auth-user-id", env = "VKLOADER_USER_ID")]
    user_id: Option<String>,

    /// VK access token
    #[arg(short = 't', long = "auth-access-token", alias = "aith-access-token", env = "VKLOADER_ACCESS_TOKEN")]
    access_token: Option<String>,

    /// Concurrent downloads
    #[arg(short = 'c', long = "concurrent", alias = "concurent", default_value_t = DEFAULT_WORKERS)]
    concurrent: usize,

    /// Skip file download if already exists and has non-null length
    #[arg(short = 's', long = "skip")]
    skip: bool,

    #[arg(long, hide = true, env = "VKLOADER_API_ENDPOINT", default_value = API_METHOD_ENDPOINT)]
    api_endpoint: String,
}

impl Args {
    /// Credentials passed on the command line, if both halves are present.
    fn supplied_credentials(&self) -> Option<Credentials> {
        match (self.user_id.as_deref(), self.access_token.as_deref()) {
            (Some(user_id), Some(token)) if !user_id.is_empty() && !token.is_empty() => {
                Some(Credentials::new(user_id, token))
            }
            _ => None,
        }
    }
}

/// Walks the user through the browser authorization and reads back the redirect URL.
fn prompt_credentials(client_id: &str) -> Result<Credentials, LoaderError> {
    println!(
        "Go to the URL and give me back a redirected URL from browser: {}",
        oauth_url(client_id)?
    );
    print!("URL: ");
    std::io::stdout().flush()?;

    let mut redirect = String::new();
    std::io::stdin().read_line(&mut redirect)?;
    Credentials::from_redirect_url(&redirect)
}

async fn run(args: Args) -> Result<(), LoaderError> {
    println!("Saving to: {}", args.dir.display());

    let credentials = match args.supplied_credentials() {
        Some(credentials) => credentials,
        None => prompt_credentials(&args.client_id)?,
    };

    println!("User ID: {}", credentials.user_id);
    println!("Token: {}", credentials.access_token);

    let config = PoolConfig::builder(&args.dir)
        .with_workers(args.concurrent)
        .with_skip_if_exists(args.skip)
        .build()?;

    let mut loader = Coordinator::with_endpoint(credentials, config, args.api_endpoint)?;
    loader.add_observer(Arc::new(TerminalProgressObserver::new()));

    let start = Instant::now();
    let attempted = loader.run().await?;
    log::info!(
        "{} tracks processed in {:.2}s",
        attempted,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("vkloader: {}", e);
        std::process::exit(1);
    }
}
