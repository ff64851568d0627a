//! CLI entrypoint for exec-insights
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use insights_application::{
    ConversationLogger, DispatchPlanUseCase, HandleTurnUseCase, NoConversationLogger, SessionStore,
    ToolGateway,
};
use insights_domain::{KeywordInterpreter, OutputFormat, ToolRegistry};
use insights_infrastructure::{
    ConfigLoader, FileConfig, FixtureToolGateway, GatewayMode, HttpToolGateway, JsonlTurnLogger,
    build_registry, registry_schema,
};
use insights_presentation::{ChatRepl, Cli, ConsoleFormatter, OutputFormatter, ProgressReporter};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        for source in ConfigLoader::config_sources(cli.config.as_ref()) {
            println!("{}", source);
        }
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    let log_file = cli.log_file.clone().or_else(|| config.logging.file_path());
    let _guard = init_tracing(cli.verbose, log_file.as_deref())?;

    config.ensure_valid()?;

    if !config.output.color {
        colored::control::set_override(false);
    }

    info!("Starting exec-insights");

    // === Dependency Injection ===
    let registry = Arc::new(
        build_registry(
            &config.gateway.base_url,
            &config.tools.backend_overrides(),
            &config.tools.aliases,
        )
        .context("Invalid tool catalog")?,
    );

    let format = cli
        .output
        .map(OutputFormat::from)
        .or(config.output.format)
        .unwrap_or_default();

    if cli.list_tools {
        if format == OutputFormat::Json {
            println!("{}", tools_json(&registry)?);
        } else {
            print!("{}", ConsoleFormatter::format_tools(&registry));
        }
        return Ok(());
    }

    let gateway = build_gateway(&config, cli.offline)?;
    let dispatcher =
        DispatchPlanUseCase::new(gateway, Arc::clone(&registry)).with_params(config.dispatch.to_params());

    let sessions = Arc::new(SessionStore::new(config.session.to_params()));
    let shutdown = CancellationToken::new();
    let janitor = sessions.spawn_janitor(shutdown.clone());

    let style = cli
        .style
        .map(Into::into)
        .unwrap_or_else(|| config.output.parse_style().0);

    let logger: Arc<dyn ConversationLogger> = match config.logging.transcript_path() {
        Some(path) => match JsonlTurnLogger::open(&path) {
            Some(logger) => Arc::new(logger),
            None => Arc::new(NoConversationLogger),
        },
        None => Arc::new(NoConversationLogger),
    };

    let use_case = Arc::new(
        HandleTurnUseCase::new(
            Arc::new(KeywordInterpreter::new(Arc::clone(&registry))),
            dispatcher,
            sessions,
        )
        .with_style(style)
        .with_logger(logger),
    );

    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| format!("cli-{}", chrono::Local::now().format("%Y%m%d-%H%M%S")));

    let outcome = if cli.chat {
        let repl = ChatRepl::new(Arc::clone(&use_case), session_id)
            .with_progress(!cli.quiet)
            .with_format(format);
        repl.run().await.context("Chat session failed")
    } else {
        answer_once(&use_case, &cli, &session_id, format).await
    };

    shutdown.cancel();
    let _ = janitor.await;
    outcome
}

async fn answer_once(
    use_case: &HandleTurnUseCase,
    cli: &Cli,
    session_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let Some(query) = cli.query.as_deref() else {
        bail!("A question is required. Use --chat for interactive mode.");
    };

    let answer = if cli.quiet || format == OutputFormat::Json {
        use_case.handle_turn(session_id, query).await?
    } else {
        let progress = ProgressReporter::new();
        use_case
            .handle_turn_with_progress(session_id, query, &progress)
            .await?
    };

    println!("{}", ConsoleFormatter.render(&answer, format));
    Ok(())
}

fn build_gateway(config: &FileConfig, offline: bool) -> Result<Arc<dyn ToolGateway>> {
    let (mode, _) = config.gateway.parse_mode();
    if offline || mode == GatewayMode::Fixture {
        info!("Serving tool calls from fixtures");
        return Ok(Arc::new(FixtureToolGateway::new()));
    }
    let gateway = HttpToolGateway::new(&config.gateway.user_agent)
        .context("Failed to create HTTP gateway")?;
    info!("Tool-servers at {}", config.gateway.base_url);
    Ok(Arc::new(gateway))
}

fn tools_json(registry: &ToolRegistry) -> Result<String> {
    Ok(serde_json::to_string_pretty(&registry_schema(registry))?)
}

/// Initialize logging based on verbosity level, optionally mirrored to a file.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Cannot create log directory {}", directory.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
