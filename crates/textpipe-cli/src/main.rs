use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;
use textpipe_core::{rank_words_from_url, GenerationRequest, RankWindow, TextGenerator};
use textpipe_local::{InferenceClient, InferenceConfig, LocalFetcher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod envfile;

const DEFAULT_PROMPT: &str = "Life is a box of";
const DEFAULT_BOOK_URL: &str = "https://www.gutenberg.org/cache/epub/16317/pg16317.txt";

#[derive(Parser, Debug)]
#[command(name = "textpipe")]
#[command(about = "Prompt a hosted text-generation model, or rank the words of a web document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a prompt to the inference endpoint and print the continuation, cut to whole sentences.
    Generate(GenerateCmd),
    /// Fetch a document, strip markup, and print words in a frequency-rank window.
    RankWords(RankWordsCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct GenerateCmd {
    /// Prompt text.
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,
    /// Maximum number of new tokens to generate.
    #[arg(long, default_value_t = textpipe_core::DEFAULT_MAX_NEW_TOKENS)]
    max_new_tokens: u32,
    /// Sampling temperature.
    #[arg(long, default_value_t = textpipe_core::DEFAULT_TEMPERATURE)]
    temperature: f64,
    /// Inference endpoint URL (default: the hosted gpt2 model).
    #[arg(long, env = textpipe_local::inference::ENDPOINT_ENV)]
    endpoint: Option<String>,
    /// Output format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct RankWordsCmd {
    /// Document URL.
    #[arg(long, default_value = DEFAULT_BOOK_URL)]
    url: String,
    /// First rank to print (1-based, inclusive).
    #[arg(long, default_value_t = 10)]
    start_rank: usize,
    /// Last rank to print (inclusive).
    #[arg(long, default_value_t = 20)]
    end_rank: usize,
    /// Fetch timeout (ms).
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
    /// Output format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("TEXTPIPE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // stdout carries pipeline output only.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn run_generate(args: GenerateCmd) -> Result<()> {
    let mut config = InferenceConfig::from_env();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    let client = InferenceClient::new(config)?;
    tracing::debug!(endpoint = client.endpoint(), "generating");
    let req = GenerationRequest {
        prompt: args.prompt,
        max_new_tokens: args.max_new_tokens,
        temperature: args.temperature,
    };
    let text = client.generate(&req).await?;

    match args.output.to_ascii_lowercase().as_str() {
        "json" => println!(
            "{}",
            serde_json::json!({
                "input": req.prompt,
                "generated_text": text,
            })
        ),
        _ => {
            println!("Input: {}", req.prompt);
            println!("Generated Text: {text}");
        }
    }
    Ok(())
}

async fn run_rank_words(args: RankWordsCmd) -> Result<()> {
    let window = RankWindow::new(args.start_rank, args.end_rank)?;
    let fetcher = LocalFetcher::with_timeout(Duration::from_millis(args.timeout_ms))?;
    let ranking = rank_words_from_url(&fetcher, &args.url, window).await?;

    match args.output.to_ascii_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string(&ranking)?),
        _ => {
            println!(
                "Words ranked from {}th to {}th by frequency:",
                window.start(),
                window.end()
            );
            for w in &ranking.words {
                println!("{}. {}: {}", w.rank, w.word, w.count);
            }
        }
    }
    Ok(())
}

/// Every pipeline failure is reported the same way, on stdout, without a failing exit status.
fn report(result: Result<()>) {
    if let Err(e) = result {
        tracing::debug!(error = ?e, "pipeline failed");
        println!("An error occurred: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = envfile::load();
    init_tracing();
    if loaded > 0 {
        tracing::debug!(vars = loaded, "loaded env file");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => report(run_generate(args).await),
        Commands::RankWords(args) => report(run_rank_words(args).await),
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "textpipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("textpipe {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }

    Ok(())
}
