mod cli;

use crate::cli::{Command, LogFormat, CLI};
use clap::Parser;
use shrink_core::{OwnerId, RequestContext, ShortCode, Storage};
use shrink_generator::RandomGenerator;
use shrink_shortener::{Shortened, ShortenerService};
use shrink_storage::open_storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    let storage_config = config.storage_config()?;
    info!(
        storage_backend = %storage_config.backend,
        base_url = %config.base_url,
        "opening storage"
    );

    let storage = open_storage(storage_config).await?;
    let service: ShortenerService<dyn Storage, RandomGenerator> = ShortenerService::new(
        storage,
        RandomGenerator::with_length(config.code_length),
        config.base_url.clone(),
    );

    let outcome = run(&service, config.command).await;
    service.shutdown().await?;
    outcome
}

async fn run(
    service: &ShortenerService<dyn Storage, RandomGenerator>,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Shorten { url, owner } => {
            let ctx = match owner {
                Some(owner) => RequestContext::for_owner(OwnerId::new(owner)?),
                None => RequestContext::anonymous(),
            };
            match service.shorten(&ctx, &url).await? {
                Shortened::Created(short_url) => println!("{short_url}"),
                Shortened::Existing(short_url) => println!("{short_url} (existing)"),
            }
        }
        Command::Resolve { code } => {
            let original = service.resolve(&ShortCode::new(code)?).await?;
            println!("{original}");
        }
        Command::List { owner } => {
            let ctx = RequestContext::for_owner(OwnerId::new(owner)?);
            for url in service.urls(&ctx).await? {
                println!("{}\t{}", url.short_url, url.original_url);
            }
        }
        Command::Delete { owner, codes } => {
            let ctx = RequestContext::for_owner(OwnerId::new(owner)?);
            let codes = codes
                .into_iter()
                .map(ShortCode::new)
                .collect::<Result<Vec<_>, _>>()?;
            let requested = codes.len();
            service.delete_urls(&ctx, codes).await?;
            // shutdown drains the pipeline before the process exits
            println!("accepted {requested} code(s) for deletion");
        }
        Command::Stats => {
            let stats = service.stats().await?;
            println!("urls\t{}\nusers\t{}", stats.urls, stats.users);
        }
        Command::Ping => {
            service.ping().await?;
            println!("ok");
        }
        Command::NewOwner => {
            let ctx = service.issue_owner();
            if let Some(owner) = ctx.owner() {
                println!("{owner}");
            }
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
