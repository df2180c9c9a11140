use anyhow::Context;
use docqa::{
    api,
    cli::{output::Output, Cli, Commands},
    rag::{HttpFetcher, IngestionPipeline},
    utils::toml_config::ServerConfig,
    workflows::StreamEvent,
    AppError, AppState, DocQaConfig, HttpGatewayClient, IndexHandle,
    PipelineExecutor,
};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let command = cli.command();

    if let Commands::Config { validate } = command {
        return show_config(&cli, validate, output);
    }

    let config = Arc::new(
        DocQaConfig::load_or_default(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?,
    );
    init_tracing(&config.server, cli.verbose);

    match command {
        Commands::Serve => serve(config, output).await,
        Commands::Ingest { urls } => ingest(&config, urls, output).await,
        Commands::Ask { question, stream } => ask(&config, &question, stream, output).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` raises the default to debug
fn init_tracing(server: &ServerConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        server.log_level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if server.log_format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

async fn serve(config: Arc<DocQaConfig>, output: &Output) -> anyhow::Result<()> {
    output.banner();

    let gateway = Arc::new(HttpGatewayClient::from_config(&config)?);
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.gateway.timeout_secs,
    ))?);

    let index = IndexHandle::empty();
    match index
        .load_from(
            &config.ingestion.index_dir,
            config.models.embedding_dimensions,
        )
        .await
    {
        Ok(entries) => info!(entries, "Index loaded"),
        Err(AppError::IndexNotFound(path)) => {
            warn!(path = %path, "No persisted index; serving in degraded mode until ingestion runs")
        }
        Err(e) => {
            error!(error = %e, "Persisted index could not be loaded; serving in degraded mode")
        }
    }

    let state = AppState::new(config.clone(), index, gateway, fetcher)?;
    let app = api::build_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    output.success(&format!("Serving on http://{}", addr));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn ingest(config: &DocQaConfig, urls: Vec<String>, output: &Output) -> anyhow::Result<()> {
    let urls = if urls.is_empty() {
        config.ingestion.urls.clone()
    } else {
        urls
    };
    output.info(&format!("Ingesting {} source URL(s)", urls.len()));

    let gateway = Arc::new(HttpGatewayClient::from_config(config)?);
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.gateway.timeout_secs,
    ))?);
    let pipeline = IngestionPipeline::from_config(config, fetcher, gateway)?;

    let (_, report) = pipeline.ingest(&urls).await?;
    output.report(&report);
    output.success("Index written");
    Ok(())
}

async fn ask(
    config: &DocQaConfig,
    question: &str,
    stream: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let index = IndexHandle::empty();
    if let Err(e) = index
        .load_from(
            &config.ingestion.index_dir,
            config.models.embedding_dimensions,
        )
        .await
    {
        if matches!(e, AppError::IndexNotFound(_)) {
            output.hint("Run `docqa-server ingest` to build the index first");
        }
        return Err(e.into());
    }

    let gateway = Arc::new(HttpGatewayClient::from_config(config)?);
    let executor = PipelineExecutor::from_config(config, index, gateway);

    if !stream {
        let state = executor.invoke(question).await?;
        println!("{}", state.formatted_output().unwrap_or_default());
        return Ok(());
    }

    let mut events = executor.stream(question);
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Stage(event) => {
                output.stage(event.stage.name(), event.field.name(), &event.value)
            }
            StreamEvent::Failed { error, .. } => return Err(error.into()),
        }
    }
    Ok(())
}

fn show_config(cli: &Cli, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = DocQaConfig::load_or_default(&cli.config)
        .with_context(|| format!("Invalid configuration in {}", cli.config.display()))?;

    if validate {
        output.success(&format!("{} is valid", cli.config.display()));
        return Ok(());
    }

    output.header("Configuration");
    output.kv("file", &cli.config.display().to_string());
    output.kv(
        "server",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv("gateway", &config.gateway.base_url);
    output.kv(
        "auth",
        &format!(
            "{} (from ${})",
            config.gateway.auth_header, config.gateway.api_key_env
        ),
    );
    output.kv(
        "embedding",
        &format!(
            "{} ({} dims)",
            config.models.embedding, config.models.embedding_dimensions
        ),
    );
    output.kv("completion", &config.models.completion);
    output.kv(
        "chunking",
        &format!(
            "size {}, overlap {}",
            config.chunking.chunk_size, config.chunking.chunk_overlap
        ),
    );
    output.kv("retrieval k", &config.retrieval.k.to_string());
    output.kv("index", &config.ingestion.index_dir.display().to_string());

    output.header("Sources");
    for url in &config.ingestion.urls {
        output.list_item(url);
    }

    if config.api_key().is_err() {
        output.warning(&format!(
            "${} is not set; gateway calls will fail",
            config.gateway.api_key_env
        ));
    }
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
