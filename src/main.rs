use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use resource_client::config::Config;
use resource_client::transport::auth::Credentials;
use resource_client::transport::http::{format_error, AuthenticatedClient};
use resource_client::{RequestContext, ResourceClient, VERSION};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Create, read, update, delete and restart REST resources
#[derive(Parser, Debug)]
#[command(name = "resource-client", version, about, long_about = None)]
struct Args {
    /// API base URL (overrides config and RESOURCE_CLIENT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Resource root path, e.g. "servers"
    #[arg(short, long, global = true)]
    root: Option<String>,

    /// Resource description used in error messages
    #[arg(long, global = true)]
    description: Option<String>,

    /// Static bearer token (overrides config and RESOURCE_CLIENT_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Authenticate with Application Default Credentials
    #[arg(long, global = true)]
    adc: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output format for response bodies
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long, global = true)]
    readonly: bool,

    /// Persist the resolved connection settings to the config file
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// POST a new resource to {root} or {root}/{ext}
    Create {
        /// Path extension appended to the root path
        #[arg(long)]
        ext: Option<String>,
        /// JSON body, or @file to read it from a file
        #[arg(long)]
        data: Option<String>,
    },
    /// PUT {root}/{ext}
    Update {
        ext: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// PUT {root}/{ext}/restart
    Restart {
        ext: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// GET {root}/{ext}
    Fetch { ext: String },
    /// GET a full resource path
    Info { path: String },
    /// PUT a full resource path
    Modify {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// DELETE a full resource path
    Delete {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
}

impl Command {
    fn is_write(&self) -> bool {
        !matches!(self, Command::Fetch { .. } | Command::Info { .. })
    }

    fn needs_root(&self) -> bool {
        matches!(
            self,
            Command::Create { .. }
                | Command::Update { .. }
                | Command::Restart { .. }
                | Command::Fetch { .. }
        )
    }
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
    fn as_filter(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = level.as_filter()?;

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
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG wins over --log-level when set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("resource-client {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("resource-client").join("resource-client.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".resource-client").join("resource-client.log");
    }
    PathBuf::from("resource-client.log")
}

/// Parse a `--data` argument: inline JSON or `@path`; absent means no body
fn parse_data(data: Option<&str>) -> Result<Value> {
    let Some(data) = data else {
        return Ok(Value::Null);
    };

    let content = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request body from {}", path))?,
        None => data.to_string(),
    };

    serde_json::from_str(&content).context("Request body is not valid JSON")
}

fn print_output(output: Option<Value>, format: OutputFormat) -> Result<()> {
    let Some(value) = output else {
        eprintln!("No content");
        return Ok(());
    };

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
    };
    println!("{}", rendered.trim_end());

    Ok(())
}

async fn build_credentials(args: &Args, config: &Config) -> Result<Credentials> {
    if args.adc || config.use_adc {
        return Credentials::adc(config.effective_scopes()).await;
    }

    Ok(match config.effective_token(args.token.as_deref()) {
        Some(token) => Credentials::Static(token),
        None => Credentials::Anonymous,
    })
}

async fn run(args: &Args, config: &mut Config) -> Result<()> {
    if args.readonly && args.command.is_write() {
        return Err(anyhow::anyhow!("Read-only mode: write operations are blocked"));
    }

    let base_url = config.effective_base_url(args.base_url.as_deref()).context(
        "No base URL configured. Set RESOURCE_CLIENT_BASE_URL or use --base-url flag",
    )?;
    let root_path = config
        .effective_root_path(args.root.as_deref())
        .unwrap_or_default();
    if root_path.is_empty() && args.command.needs_root() {
        return Err(anyhow::anyhow!(
            "No resource root path configured. Use --root flag"
        ));
    }
    let description = config.effective_description(args.description.as_deref(), &root_path);
    let timeout = config.effective_timeout(args.timeout);

    tracing::info!("Using base URL: {}, root: {}", base_url, root_path);

    if args.save {
        config.base_url = Some(base_url.clone());
        config.root_path = (!root_path.is_empty()).then(|| root_path.clone());
        config.description = Some(description.clone());
        config.use_adc = config.use_adc || args.adc;
        config.timeout_secs = timeout.map(|t| t.as_secs());
        config.save()?;
    }

    let credentials = build_credentials(args, config).await?;
    let transport = AuthenticatedClient::with_timeout(&base_url, credentials, timeout)?;
    let client = ResourceClient::new(Arc::new(transport), root_path, description);

    let (ctx, cancel) = RequestContext::background().with_cancel();
    let ctx = match timeout {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling request");
            cancel.cancel();
        }
    });

    let output: Option<Value> = match &args.command {
        Command::Create { ext: None, data } => {
            let body = parse_data(data.as_deref())?;
            Some(client.create_resource(&ctx, &body).await?)
        }
        Command::Create { ext: Some(ext), data } => {
            let body = parse_data(data.as_deref())?;
            Some(client.create_resource_with_path_ext(&ctx, ext, &body).await?)
        }
        Command::Update { ext, data } => {
            let body = parse_data(data.as_deref())?;
            client.modify_resource_with_path_ext(&ctx, ext, &body).await?
        }
        Command::Restart { ext, data } => {
            let body = parse_data(data.as_deref())?;
            client.restart_resource(&ctx, ext, &body).await?
        }
        Command::Fetch { ext } => Some(client.fetch_resource(&ctx, ext).await?),
        Command::Info { path } => Some(client.get_resource_info(&ctx, path).await?),
        Command::Modify { path, data } => {
            let body = parse_data(data.as_deref())?;
            client.modify_resource(&ctx, path, &body).await?
        }
        Command::Delete { path, data } => {
            let body = parse_data(data.as_deref())?;
            client.delete_resource(&ctx, path, &body).await?
        }
    };

    print_output(output, args.output)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let mut config = Config::load();

    if let Err(err) = run(&args, &mut config).await {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_error(&err));
        // Flush the log file before exiting
        drop(log_guard);
        std::process::exit(1);
    }
}
