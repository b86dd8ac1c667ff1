//! `parlance`: route chat messages to structured commands from the terminal.
//!
//! ```bash
//! parlance route "покажи новости про AI"
//! echo "open settings" | parlance route
//! parlance rank "make it dark"
//! parlance intents
//! ```

mod rules;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use parlance_ai::{EmbeddingProvider, Gate, ModelLoader, RolePrefixes, Router};
use parlance_core::{RouteContext, RouterConfig, builtin};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL_DIR: &str = "models/multilingual-e5-small";

#[derive(Parser)]
#[command(name = "parlance", version, about = "Layered intent router for chat commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Router config file (TOML)
    #[arg(long, global = true, env = "PARLANCE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding model.onnx and tokenizer.json
    #[arg(long, global = true, env = "PARLANCE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Override the minimum top score
    #[arg(long, global = true)]
    min_score: Option<f32>,

    /// Override the minimum gap to the runner-up
    #[arg(long, global = true)]
    min_gap: Option<f32>,
}

#[derive(Subcommand)]
enum Command {
    /// Route messages and print one JSON outcome per line (reads stdin if none given)
    Route {
        messages: Vec<String>,

        /// Session id forwarded to the deterministic layer
        #[arg(long)]
        session: Option<String>,

        /// Active view: home, tasks, news or settings
        #[arg(long)]
        view: Option<String>,
    },
    /// Show every intent's score and gap for one message
    Rank {
        message: String,

        #[arg(long)]
        json: bool,
    },
    /// List intents in the built-in catalog
    Intents,
    /// Load the model and build the centroid index, then report timings
    Warmup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "parlance starting");

    match &cli.command {
        Command::Intents => {
            let catalog = builtin::catalog()?;
            for card in catalog.list() {
                let first = card.examples().first().map(String::as_str).unwrap_or("");
                println!("{:<18} {:>3}  {first}", card.id(), card.examples().len());
            }
            println!(
                "{} intents, {} examples",
                catalog.len(),
                catalog.example_count()
            );
        }
        Command::Warmup => {
            let router = build_router(&cli, &config)?;
            let start = Instant::now();
            router.warmup().await.context("warming up semantic layer")?;
            println!(
                "{} intents ready in {} ms (dim {})",
                router.catalog().len(),
                start.elapsed().as_millis(),
                router.provider().dim().await?
            );
        }
        Command::Rank { message, json } => {
            let router = build_router(&cli, &config)?;
            let ranked = router.explain(message).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                let gate = router.gate();
                for (i, m) in ranked.iter().enumerate() {
                    let mark = if i == 0 && gate.accepts(m) { "*" } else { " " };
                    println!("{mark} {:.4}  {:.4}  {}", m.score, m.gap, m.intent_id);
                }
            }
        }
        Command::Route {
            messages,
            session,
            view,
        } => {
            let router = build_router(&cli, &config)?;
            let ctx = RouteContext {
                session_id: session.clone(),
                locale: None,
                active_view: view.as_deref().map(rules::parse_view).transpose()?,
            };

            let mut out = std::io::stdout();
            if messages.is_empty() {
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                route_lines(&router, &ctx, stdin, &mut out).await?;
            } else {
                for message in messages {
                    writeln!(out, "{}", route_line(&router, message, &ctx).await?)?;
                }
            }
        }
    }
    Ok(())
}

/// Route every line of `input`, writing one JSON object per line to `out`.
///
/// A Layer 0 error is reported on its own line and the stream continues.
async fn route_lines<R, W>(
    router: &Router,
    ctx: &RouteContext,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        writeln!(out, "{}", route_line(router, &line, ctx).await?)?;
    }
    Ok(())
}

async fn route_line(router: &Router, message: &str, ctx: &RouteContext) -> anyhow::Result<String> {
    let json = match router.route(message, ctx).await {
        Ok(outcome) => serde_json::to_string(&outcome)?,
        Err(e) => {
            let error = format!("{e:#}");
            tracing::warn!(%error, "message rejected");
            serde_json::json!({ "status": "error", "error": error }).to_string()
        }
    };
    Ok(json)
}

fn load_config(cli: &Cli) -> anyhow::Result<RouterConfig> {
    let mut config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)?,
        None => RouterConfig::default(),
    };
    if let Some(min_score) = cli.min_score {
        config.min_score = min_score;
    }
    if let Some(min_gap) = cli.min_gap {
        config.min_gap = min_gap;
    }
    if let Some(dir) = &cli.model_dir {
        config.model_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn build_router(cli: &Cli, config: &RouterConfig) -> anyhow::Result<Router> {
    let model_dir = config
        .model_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));
    tracing::debug!(
        model_dir = %model_dir.display(),
        min_score = config.min_score,
        min_gap = config.min_gap,
        config = ?cli.config,
        "building router"
    );
    let provider = Arc::new(EmbeddingProvider::new(
        model_loader(model_dir),
        RolePrefixes::from(config),
    ));
    let catalog = builtin::catalog().context("loading built-in intents")?;
    Ok(Router::new(
        catalog,
        rules::slash_command,
        provider,
        Gate::from(config),
    ))
}

#[cfg(feature = "onnx")]
fn model_loader(model_dir: PathBuf) -> impl ModelLoader {
    parlance_ai::OnnxLoader::new(model_dir)
}

#[cfg(not(feature = "onnx"))]
fn model_loader(model_dir: PathBuf) -> impl ModelLoader {
    tracing::warn!(
        model_dir = %model_dir.display(),
        "built without the onnx feature; only slash commands will resolve"
    );
    NoModel
}

#[cfg(any(test, not(feature = "onnx")))]
struct NoModel;

#[cfg(any(test, not(feature = "onnx")))]
#[async_trait::async_trait]
impl ModelLoader for NoModel {
    async fn load(&self) -> anyhow::Result<Arc<dyn parlance_ai::EmbeddingModel>> {
        anyhow::bail!("parlance was built without the onnx feature")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        let provider = Arc::new(EmbeddingProvider::new(NoModel, RolePrefixes::default()));
        Router::new(
            builtin::catalog().unwrap(),
            rules::slash_command,
            provider,
            Gate::default(),
        )
    }

    fn parse_lines(out: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn bad_line_does_not_end_the_stream() {
        let router = router();
        let mut out = Vec::new();
        let input: &[u8] = b"/done\n/tasks\nopen settings\n";
        route_lines(&router, &RouteContext::default(), input, &mut out)
            .await
            .unwrap();

        let lines = parse_lines(out);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"], "error");
        assert!(
            lines[0]["error"]
                .as_str()
                .unwrap()
                .contains("/done needs a task title")
        );
        assert_eq!(lines[1]["status"], "resolved");
        assert_eq!(lines[1]["command"]["kind"], "list_tasks");
        // No model: plain text hands off.
        assert_eq!(lines[2]["status"], "unhandled");
        assert_eq!(lines[2]["handoff"]["kind"], "none");
    }

    #[tokio::test]
    async fn slash_command_resolves_on_layer_zero() {
        let json = route_line(&router(), "/go settings", &RouteContext::default())
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["layer"], 0);
        assert_eq!(value["command"]["view"], "settings");
    }
}
