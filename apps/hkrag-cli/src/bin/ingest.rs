use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use hkrag_cli::{init_tracing, load_settings, print_startup_error};
use hkrag_embed::get_default_embedder;
use hkrag_pipeline::{IngestOptions, IngestOutcome, IngestReport, Ingestor};

#[derive(Parser, Debug)]
#[command(name = "hkrag-ingest", about = "Load, split and embed documents into the vector store")]
struct IngestCli {
    /// Directory holding config.toml (defaults to the working directory).
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Input directory with PDF/TXT/CSV/JSON files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Vector store directory.
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Remove the existing store before ingesting instead of appending to it.
    #[arg(long)]
    reset: bool,
}

fn main() -> ExitCode {
    init_tracing("warn");
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_startup_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = IngestCli::parse();
    let mut settings = load_settings(cli.config_dir.as_deref())?;
    if let Some(dir) = &cli.data_dir { settings.data.input_dir = dir.to_string_lossy().to_string(); }
    if let Some(dir) = &cli.store_dir { settings.data.store_dir = dir.to_string_lossy().to_string(); }

    println!("{}", "=".repeat(60));
    println!("🚀 HK Healthcare RAG Data Ingestion");
    println!("{}", "=".repeat(60));

    // credentials are checked before touching any files
    let embedder = get_default_embedder(&settings.embedding)?;
    println!("🔑 Embeddings: {}", embedder.embedder_id());

    let ingestor = Ingestor::new(&settings, embedder)?;
    let opts = IngestOptions { reset: cli.reset, show_progress: true };
    println!("\n📂 Loading documents from {}...", ingestor.input_dir().display());
    let outcome = tokio::runtime::Runtime::new()?.block_on(async { ingestor.run(&opts).await })?;
    match outcome {
        IngestOutcome::MissingInput(dir) => {
            println!("\n📁 Created {} directory.", dir.display());
            println!("\n⚠️ Please add your Hong Kong healthcare documents there!");
            println!("\nSupported formats: PDF, TXT, CSV, JSON");
            println!("\nExample files to add:");
            println!("- HK hospital directories");
            println!("- Healthcare service guides");
            println!("- Medical information PDFs");
            println!("- Healthcare facility lists (JSON)");
            println!("\n👉 After adding files, run this command again!");
        }
        IngestOutcome::NoFiles(dir) => {
            println!("\n⚠️ No PDF, TXT, CSV or JSON files found in {}", dir.display());
            println!("\nPlease add documents first!");
            println!("\nExample test file you can create:");
            println!("  echo 'Hong Kong healthcare test document' > {}/test.txt", dir.display());
        }
        IngestOutcome::NoChunks { files, skipped } => {
            print_files(&files);
            print_skipped(&skipped);
            println!("\n❌ No chunks created. Check your documents!");
        }
        IngestOutcome::Completed(report) => print_summary(&report),
    }
    Ok(())
}

fn print_files(files: &[PathBuf]) {
    println!("\n📁 Found {} files:", files.len());
    for f in files.iter().take(5) {
        println!("  - {}", f.file_name().map(|n| n.to_string_lossy()).unwrap_or_default());
    }
    if files.len() > 5 {
        println!("  ... and {} more", files.len() - 5);
    }
}

fn print_skipped(skipped: &[hkrag_core::loader::SkippedFile]) {
    if skipped.is_empty() { return; }
    println!("\n⚠️ Skipped {} files:", skipped.len());
    for s in skipped {
        println!("  - {}: {}", s.path.display(), s.reason);
    }
}

fn print_summary(report: &IngestReport) {
    print_files(&report.files);
    print_skipped(&report.skipped);
    println!("\n{}", "=".repeat(60));
    println!("✨ Ingestion Complete! Your vector database is ready.");
    println!("{}", "=".repeat(60));
    println!("\n📊 Summary:");
    println!("  - Documents: {}", report.documents);
    println!("  - Chunks: {}", report.chunks);
    println!("  - Vector DB: {}", report.store_dir.display());
    println!("  - Total vectors: {}", report.total_in_store);
    if report.total_in_store > report.written {
        println!("\n💡 Chunks were appended to an existing store; use --reset to rebuild it.");
    }
    println!("\n🚀 Next steps:");
    println!("  1. Start the API: cargo run --bin hkrag-server");
    println!("  2. Chat: cargo run --bin hkrag-chat");
}
