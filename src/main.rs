use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::TryStreamExt;
use serde::Serialize;
use std::path::PathBuf;
use tfibm::config::{validate_region, Config, Overrides};
use tfibm::datasource::{self, registry, Arguments, ReadError};
use tfibm::ibm::client::IbmClient;
use tfibm::ibm::http::format_ibm_error;
use tfibm::ibm::vpc::{AddressPrefixes, Vpcs};
use tfibm::lookup::{list_all, Collection, LookupContext, LookupError, Named};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Read IBM Cloud data sources from the command line
#[derive(Parser, Debug)]
#[command(name = "tfibm", version, about, long_about = None)]
struct Args {
    /// IBM Cloud region (e.g. us-south, eu-de)
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// IAM API key (defaults to IC_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a data source and print its attributes
    Read {
        /// Data source name, e.g. ibm_is_vpc_address_prefix
        data_source: String,

        /// Argument as key=value (repeatable)
        #[arg(short = 'a', long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
    /// List data sources, or print the schema of one
    Schema {
        /// Only this data source
        data_source: Option<String>,
    },
    /// List records of a collection
    List {
        #[command(subcommand)]
        kind: ListKind,
    },
    /// Save the region as the default
    SetRegion { region: String },
}

#[derive(Subcommand, Debug)]
enum ListKind {
    /// VPCs in the region
    Vpcs,
    /// Address prefixes of a VPC
    AddressPrefixes {
        /// VPC identifier
        #[arg(long)]
        vpc: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty argument name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG narrows per-module output within the chosen level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tfibm started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tfibm").join("tfibm.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tfibm").join("tfibm.log");
    }
    PathBuf::from("tfibm.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Some(region) = &args.region {
        if !validate_region(region) {
            anyhow::bail!("Invalid region name: {}", region);
        }
    }

    // File, then environment, then flags
    let mut config = Config::load();
    config.apply(Overrides::from_env());
    config.apply(Overrides {
        region: args.region.clone(),
        api_key: args.api_key.clone(),
        iam_token: None,
        timeout_secs: args.timeout,
    });
    if args.api_key.is_some() {
        // An explicit key outranks a token from the environment
        config.iam_token = None;
    }

    match args.command {
        Command::Schema { data_source } => print_schema(data_source.as_deref()),
        Command::SetRegion { region } => {
            // Rewrite the file alone so overrides are never persisted
            Config::load().set_region(&region)?;
            println!("Default region set to {}", region);
            Ok(())
        }
        Command::Read {
            data_source,
            args: pairs,
            output,
        } => {
            let client = IbmClient::new(&config)?;
            let ctx = cancel_on_ctrl_c(&config);
            let arguments: Arguments = pairs.into_iter().collect();

            tracing::info!("Using region: {}", client.region);
            match datasource::read_data_source(&data_source, &client, &ctx, &arguments).await {
                Ok(attrs) => print_output(&attrs, output),
                Err(err) => Err(anyhow::anyhow!(describe_read_error(&err))),
            }
        }
        Command::List { kind } => {
            let client = IbmClient::new(&config)?;
            let ctx = cancel_on_ctrl_c(&config);

            let result = match kind {
                ListKind::Vpcs => print_listing(&ctx, &Vpcs::new(&client)).await,
                ListKind::AddressPrefixes { vpc } => {
                    print_listing(&ctx, &AddressPrefixes::new(&client, &vpc)).await
                }
            };
            result.map_err(|err| anyhow::anyhow!(describe_lookup_error(&err)))
        }
    }
}

/// Context that is cancelled on Ctrl-C, with an overall deadline of
/// several request timeouts
fn cancel_on_ctrl_c(config: &Config) -> LookupContext {
    let (ctx, handle) = LookupContext::new()
        .with_timeout(config.timeout() * 5)
        .cancellable();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling lookup");
            handle.cancel();
        }
    });

    ctx
}

async fn print_listing<C>(ctx: &LookupContext, collection: &C) -> Result<(), LookupError>
where
    C: Collection,
{
    let records = list_all(ctx, collection);
    futures::pin_mut!(records);

    let mut count = 0usize;
    while let Some(record) = records.try_next().await? {
        println!("{}\t{}", record.id(), record.name());
        count += 1;
    }
    tracing::info!("Listed {} {} record(s)", count, C::ENTITY);
    Ok(())
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to render JSON")?
        }
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML")?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn print_schema(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let (_, def) = registry::get_data_source(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown data source: {}", name))?;
            print_output(def, OutputFormat::Json)
        }
        None => {
            for name in registry::all_data_source_names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn describe_lookup_error(err: &LookupError) -> String {
    match err.remote() {
        Some(remote) => format!("{}: {}", err.entity(), format_ibm_error(remote)),
        None => err.to_string(),
    }
}

fn describe_read_error(err: &ReadError) -> String {
    match err {
        ReadError::Lookup(err) => describe_lookup_error(err),
        other => other.to_string(),
    }
}
