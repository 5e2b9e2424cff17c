use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use feedtree::config::Config;
use feedtree::model::{AddressResolver, FeedCollection, Handle, Role};
use feedtree::util::{sanitize_line, truncate_to_width};

/// Config file path (~/.config/feedtree/config.toml), if HOME is set.
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("feedtree")
            .join("config.toml"),
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "feedtree",
    about = "Parse RSS 2.0 documents, merge refeeds by channel link, and print the channel/item tree"
)]
struct Args {
    /// Config file (defaults to ~/.config/feedtree/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Abort a document on duplicate elements instead of keeping the first
    #[arg(long)]
    strict: bool,

    /// Maximum columns per printed line
    #[arg(long, default_value_t = 100)]
    width: usize,

    /// RSS documents, ingested in order; later files refresh earlier ones
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match args.config.as_ref().cloned().or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };
    if args.strict {
        config.strict = true;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let collection = FeedCollection::new(config.id_pool(), config.parser_options());
    let mut failures = 0;
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
        match collection.ingest(&bytes) {
            Ok(channel) => {
                tracing::debug!(path = %path.display(), channel = channel.id(), "Ingested feed");
            }
            Err(err) => {
                failures += 1;
                eprintln!("{}: {err}", path.display());
            }
        }
    }

    print_tree(&AddressResolver::new(&collection), args.width);

    if failures == args.files.len() {
        bail!("No feed could be parsed");
    }
    Ok(())
}

fn print_tree(resolver: &AddressResolver<'_>, width: usize) {
    let root = resolver.root();
    for row in 0..resolver.child_count(root) {
        let Some(channel) = resolver.resolve_address(row, root) else {
            continue;
        };
        let title = field(resolver, channel, Role::Title).unwrap_or_else(|| "(untitled)".into());
        let mut line = title;
        if let Some(link) = field(resolver, channel, Role::Link) {
            line.push_str(&format!(" <{link}>"));
        }
        let items = resolver.child_count(channel);
        line.push_str(&format!(" ({items} items)"));
        println!("{}", truncate_to_width(&line, width));

        for item_row in 0..items {
            let Some(item) = resolver.resolve_address(item_row, channel) else {
                continue;
            };
            let title = field(resolver, item, Role::Title)
                .or_else(|| field(resolver, item, Role::Description))
                .unwrap_or_else(|| "(untitled)".into());
            let mut line = format!("  {}. {title}", item_row + 1);
            if let Some(date) = field(resolver, item, Role::PubDate) {
                line.push_str(&format!(" [{date}]"));
            }
            println!("{}", truncate_to_width(&line, width));
        }
    }
}

/// A field as one sanitized line.
fn field(resolver: &AddressResolver<'_>, handle: Handle, role: Role) -> Option<String> {
    let value = resolver.data(handle, role)?.to_string();
    let line = sanitize_line(&value);
    (!line.is_empty()).then(|| line.into_owned())
}
