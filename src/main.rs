use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use google_id_token::Error;
use google_id_token::IdToken;
use google_id_token::Result;
use google_id_token::Retriever;
use google_id_token::Verifier;
use google_id_token::VerifyIdToken;
use tracing_subscriber::EnvFilter;

/// Retrieve or verify Google ID tokens
#[derive(Debug, Parser)]
#[command(name = "google-id-token", version)]
struct Cli {
    /// Timeout in seconds
    #[arg(short, long, global = true, default_value_t = 5)]
    timeout: u64,

    /// Client ID, used as the token audience and to key the token cache.
    /// Required for service account keys and the metadata server.
    #[arg(long, global = true, env = "GOOGLE_ID_TOKEN_CLIENT_ID", default_value = "")]
    client_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Get a new token
    New,
    /// Get a cached or new token
    Get,
    /// Print the decoded token
    Print(PrintArgs),
    /// Verify the token
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
struct PrintArgs {
    /// ID token to print; the cached or a new token if omitted
    #[arg(short, long)]
    id_token: Option<String>,

    /// Print the header instead of the payload
    #[arg(long)]
    header: bool,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    /// ID token to verify
    #[arg(short, long)]
    id_token: String,

    /// Audience that this ID token is intended for
    #[arg(short, long, default_value = "")]
    audience: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let deadline = Duration::from_secs(cli.timeout);
    let client_id = cli.client_id;

    match cli.command {
        Command::New => within(deadline, async move {
            Retriever::new(client_id).await?.get_new_id_token().await
        })
        .await
        .map(IdToken::into_jwt),
        Command::Get => within(deadline, cached_or_new(client_id))
            .await
            .map(IdToken::into_jwt),
        Command::Print(args) => {
            let token = match args.id_token {
                Some(jwt) => IdToken::parse(jwt)?,
                None => within(deadline, cached_or_new(client_id)).await?,
            };

            Ok(if args.header {
                token.header().to_string()
            } else {
                token.payload().to_string()
            })
        }
        Command::Verify(args) => {
            let verifier = Verifier::default();
            verifier
                .verify_within(&args.id_token, &args.audience, deadline)
                .await
                .map(|()| String::new())
        }
    }
}

async fn cached_or_new(client_id: String) -> Result<IdToken> {
    Retriever::new(client_id).await?.get_id_token().await
}

async fn within<T>(deadline: Duration, future: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| Error::DeadlineExceeded(deadline))?
}
