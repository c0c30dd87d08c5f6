use anyhow::{Context, Result};
use cvrag::{
    cli::{output::Output, Cli, Commands},
    rag::{embeddings::{check_local_model, LOCAL_RUNTIME}, EmbeddingModelType, IndexReader},
    types::AskResponse,
    utils::logging,
    AppState, RagConfig, RagPipeline,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let (config_path, required) = cli.config_path();
    let config = RagConfig::load(&config_path, required)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    logging::init(&config.logging, cli.verbose);

    match cli.command {
        Commands::Ask {
            question,
            json,
            top_k,
        } => ask(config, &output, &question.join(" "), json, top_k).await,
        Commands::Check => check(config, &output).await,
        Commands::Serve { host, port } => serve(config, host, port).await,
    }
}

async fn ask(
    config: RagConfig,
    output: &Output,
    question: &str,
    json: bool,
    top_k: Option<usize>,
) -> Result<()> {
    let pipeline = RagPipeline::from_config(&config)?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let answer = match pipeline.answer_with(question, top_k).await {
        Ok(answer) => answer,
        Err(err) => {
            output.error(&err.to_string());
            if err.is_structural() {
                output.hint("Build the index and cache the embedding model before asking questions.");
            }
            return Err(err.into());
        }
    };

    if answer.failed {
        output.warning(&format!("{} failed; the sources below were still retrieved", answer.backend));
    }

    if json {
        let response: AskResponse = answer.into();
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        output.answer(&answer);
    }
    Ok(())
}

async fn check(config: RagConfig, output: &Output) -> Result<()> {
    let pipeline = RagPipeline::from_config(&config)?;
    let mut ready = true;

    output.header("Index");
    let paths = pipeline.retriever().paths().clone();
    output.kv("index", &paths.index_file.display().to_string());
    output.kv("metadata", &paths.meta_file.display().to_string());
    match IndexReader::open_async(paths).await {
        Ok(reader) => output.success(&format!(
            "{} fragments, {} dimensions",
            reader.len(),
            reader.dimensions()
        )),
        Err(err) => {
            ready = false;
            output.error(&err.to_string());
        }
    }

    output.header("Embedding model");
    output.kv("model", &config.embedding.model);
    output.kv("cache", &config.embedding.cache_dir.display().to_string());
    output.kv("runtime", if LOCAL_RUNTIME { "fastembed" } else { "not compiled" });
    let located = config
        .embedding
        .model
        .parse::<EmbeddingModelType>()
        .and_then(|kind| check_local_model(&config.embedding.cache_dir, kind));
    match located {
        Ok(snapshot) => output.success(&format!("cached at {}", snapshot.display())),
        Err(err) => {
            ready = false;
            output.error(&err.to_string());
        }
    }

    output.header("Generation");
    match pipeline.dispatcher().selected_kind() {
        Some(kind) => output.kv("backend", kind.name()),
        None => {
            ready = false;
            output.error("no generation backend is configured");
        }
    }

    if ready {
        output.success("Ready");
        Ok(())
    } else {
        anyhow::bail!("cvrag is not ready to answer questions")
    }
}

async fn serve(mut config: RagConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let pipeline = RagPipeline::from_config(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pipeline);
    let app = cvrag::api::routes::app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
