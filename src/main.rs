//! Intercept Layers command line tool
//!
//! Replays captured client bytes through next-layer resolution and prints the
//! resulting layer stack. Useful for checking host filters and modes against
//! real traffic samples.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};
use tokio::io::AsyncRead;

use intercept_layers::common::{init_logger, Result};
use intercept_layers::config::{self, defaults, ProxyOptions};
use intercept_layers::{Address, Client, Context, LayerSession, Progress, APP_NAME, VERSION};

/// Intercept Layers: decide the protocol layer stack for a client stream
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Load options from a JSON configuration file
    #[clap(long, env = "INTERCEPT_LAYERS_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Operating mode: regular, transparent, upstream:<addr>, reverse:<addr>, socks5
    #[clap(long)]
    mode: Option<String>,

    /// Host pattern to pass through without interception (repeatable)
    #[clap(long = "ignore-hosts")]
    ignore_hosts: Vec<String>,

    /// Host pattern to intercept; all other hosts are ignored (repeatable)
    #[clap(long = "allow-hosts")]
    allow_hosts: Vec<String>,

    /// Host pattern to always treat as raw TCP (repeatable)
    #[clap(long = "tcp-hosts")]
    tcp_hosts: Vec<String>,

    /// Treat traffic that does not look like HTTP as raw TCP (true or false)
    #[clap(long, value_name = "BOOL")]
    rawtcp: Option<bool>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long)]
    log_level: Option<String>,

    /// Intended destination of the connection (host:port)
    #[clap(long)]
    server: Option<String>,

    /// Client address of the connection (host:port)
    #[clap(long, default_value = "127.0.0.1:50000")]
    client: String,

    /// File with the captured client bytes, or '-' for stdin
    #[clap(long, default_value = "-")]
    input: String,
}

impl Args {
    /// Command line values override file and environment values
    fn apply_overrides(&self, options: &mut ProxyOptions) -> Result<()> {
        if let Some(mode) = &self.mode {
            options.mode = mode.parse()?;
        }
        if !self.ignore_hosts.is_empty() {
            options.ignore_hosts = self.ignore_hosts.clone();
        }
        if !self.allow_hosts.is_empty() {
            options.allow_hosts = self.allow_hosts.clone();
        }
        if !self.tcp_hosts.is_empty() {
            options.tcp_hosts = self.tcp_hosts.clone();
        }
        if let Some(rawtcp) = self.rawtcp {
            options.rawtcp = rawtcp;
        }
        if let Some(level) = &self.log_level {
            options.log_level = level.clone();
        }
        Ok(())
    }
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncRead + Unpin>> {
    if input == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(input).await?;
    Ok(Box::new(file))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(args.log_level.as_deref().unwrap_or(defaults::LOG_LEVEL_STR));
    info!("Starting {} v{}", APP_NAME, VERSION);

    let mut options = ProxyOptions::auto_load(args.config_file.as_deref())?;
    args.apply_overrides(&mut options)?;
    config::log_options(&options);

    let policy = config::apply(&options)?;

    let client = Client::new(args.client.parse::<Address>()?);
    let mut context = Context::new(client);
    if let Some(server) = &args.server {
        context = context.with_server(server.parse::<Address>()?);
    }

    let mut reader = open_input(&args.input).await?;
    let mut session = LayerSession::new(context, policy);
    let progress = session.run(&mut reader).await?;

    let stack = session
        .layers()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    println!("{}", stack);

    match progress {
        Progress::Established(layer) => info!("Stream handed to {}", layer),
        Progress::NeedMoreData => warn!(
            "Input ended before a layer took over the stream ({} bytes buffered)",
            session.buffered().len()
        ),
    }

    Ok(())
}
