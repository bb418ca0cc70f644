use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use hkrag_cli::{init_tracing, load_settings, print_startup_error};
use hkrag_core::config::{DEFAULT_OLLAMA_BASE_URL, GENERATION_MODEL_PRESETS};
use hkrag_core::types::{QueryRequest, QueryResponse};
use hkrag_pipeline::chat::{Reply, Transcript, EXAMPLE_QUESTIONS};
use hkrag_pipeline::format::{sources_markdown, to_response};
use hkrag_pipeline::QueryPipeline;

const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "hkrag-chat", about = "Terminal chat about Hong Kong healthcare")]
struct ChatCli {
    /// Base URL of a running hkrag-server.
    #[arg(long, env = "HKRAG_API_URL", default_value = "http://localhost:8000")]
    api: String,

    /// Answer in-process instead of calling the API.
    #[arg(long)]
    local: bool,

    /// Directory holding config.toml (for --local).
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Print the known generation models and exit.
    #[arg(long)]
    list_models: bool,
}

enum Backend {
    Api { client: reqwest::Client, base: String },
    Local(QueryPipeline),
}

struct TurnResult {
    answer: String,
    sources: Vec<String>,
    details: Option<String>,
    latency_seconds: Option<f64>,
}

impl Backend {
    async fn ask(&self, question: &str) -> Result<TurnResult> {
        match self {
            Backend::Api { client, base } => {
                let resp = client
                    .post(format!("{base}/query"))
                    .json(&QueryRequest { question: question.to_string() })
                    .send()
                    .await
                    .context("Connection Error: is hkrag-server running?")?;
                let status = resp.status();
                if !status.is_success() {
                    let detail = resp
                        .json::<Value>()
                        .await
                        .ok()
                        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                        .unwrap_or_default();
                    return Err(anyhow!("API Error: {} {}", status.as_u16(), detail));
                }
                let body: QueryResponse = resp.json().await.context("invalid API response")?;
                Ok(TurnResult { answer: body.answer, sources: body.sources, details: None, latency_seconds: body.latency_seconds })
            }
            Backend::Local(pipeline) => {
                let answer = pipeline.answer(question).await?;
                let details = (!answer.retrieved.is_empty()).then(|| sources_markdown(&answer.retrieved));
                let resp = to_response(&answer);
                Ok(TurnResult { answer: resp.answer, sources: resp.sources, details, latency_seconds: resp.latency_seconds })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");
    let cli = ChatCli::parse();
    if cli.list_models {
        println!("Generation models:");
        for (name, description) in GENERATION_MODEL_PRESETS {
            println!("  {name:<24} {description}");
        }
        println!("\nOllama (generation.provider = \"ollama\", {DEFAULT_OLLAMA_BASE_URL}): any pulled model, e.g. llama3.2:3b");
        return Ok(());
    }

    let backend = match connect(&cli).await {
        Ok(b) => b,
        Err(e) => {
            print_startup_error(&e);
            return Err(e);
        }
    };
    println!("\n🏥 Hong Kong Healthcare Assistant. Type /help for commands.\n");
    repl(&backend).await
}

async fn connect(cli: &ChatCli) -> Result<Backend> {
    if cli.local {
        let settings = load_settings(cli.config_dir.as_deref())?;
        let pipeline = QueryPipeline::from_settings(&settings).await?;
        if !pipeline.is_grounded() {
            println!("⚠️ No vector database found at {}.", settings.data.store_dir().display());
            println!("   Answers will not cite documents. Run `cargo run --bin hkrag-ingest` to build it.");
        }
        return Ok(Backend::Local(pipeline));
    }
    let client = reqwest::Client::builder()
        .timeout(API_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;
    let base = cli.api.trim_end_matches('/').to_string();
    match client.get(format!("{base}/")).send().await {
        Ok(r) if r.status().is_success() => println!("✅ API Connected ({base})"),
        _ => println!("❌ API Offline ({base}); start it with `cargo run --bin hkrag-server`"),
    }
    Ok(Backend::Api { client, base })
}

async fn repl(backend: &Backend) -> Result<()> {
    let mut transcript = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let input = line.trim();
        if input.is_empty() { continue; }
        match input {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/examples" => {
                println!("Example questions:");
                for q in EXAMPLE_QUESTIONS { println!("  - {q}"); }
            }
            "/history" => print_history(&transcript),
            "/sources" => match transcript.last_sources() {
                Some(sources) if !sources.is_empty() => {
                    for (i, s) in sources.iter().enumerate() { println!("  {}. {s}", i + 1); }
                }
                _ => println!("No sources for the last answer."),
            },
            "/clear" => {
                transcript.clear();
                println!("Chat history cleared.");
            }
            cmd if cmd.starts_with('/') => println!("Unknown command {cmd}; try /help"),
            question => {
                println!("🤔 Thinking...");
                match backend.ask(question).await {
                    Ok(turn) => {
                        println!("\nAssistant: {}\n", turn.answer);
                        if let Some(details) = &turn.details {
                            println!("📚 Sources:\n{details}\n");
                        } else if !turn.sources.is_empty() {
                            println!("📚 Sources: {}\n", turn.sources.join(", "));
                        }
                        if let Some(latency) = turn.latency_seconds { println!("⏱️ {latency:.2}s\n"); }
                        transcript.record_answer(question, &turn.answer, turn.sources);
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        println!("\n❌ {message}\n");
                        transcript.record_error(question, &message);
                    }
                }
            }
        }
    }
    println!("Goodbye!");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /examples  example questions");
    println!("  /history   this session's questions and answers");
    println!("  /sources   sources of the last answer");
    println!("  /clear     clear the chat history");
    println!("  /quit      exit");
}

fn print_history(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("No messages yet.");
        return;
    }
    for (i, turn) in transcript.turns().iter().enumerate() {
        println!("{}. You: {}", i + 1, turn.question);
        match &turn.reply {
            Reply::Answer { text, .. } => println!("   Assistant: {text}"),
            Reply::Error(message) => println!("   ❌ {message}"),
        }
    }
}
