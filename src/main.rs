use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use studynotes::config::{Config, NotesProfile};
use studynotes::processing::NotesService;
use studynotes::{api, logging};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "studynotes",
    about = "Turn lecture PDFs into structured study notes"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Port to bind; overrides SERVER_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ingest one PDF and write its notes as JSON.
    Notes {
        /// PDF to process.
        pdf: PathBuf,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Content profile overriding NOTES_PROFILE (`concise` or `comprehensive`).
        #[arg(long, value_parser = parse_profile)]
        profile: Option<NotesProfile>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();
    let mut config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Serve { port } => {
            if port.is_some() {
                config.server_port = port;
            }
            serve(Arc::new(config)).await
        }
        Command::Notes { pdf, out, profile } => {
            if let Some(profile) = profile {
                config.notes_profile = profile;
            }
            notes(Arc::new(config), pdf, out).await
        }
    }
}

async fn serve(config: Arc<Config>) -> Result<()> {
    let max_upload_bytes = config.max_file_size_bytes();
    let service = NotesService::from_config(Arc::clone(&config))?;
    let app = api::create_router(Arc::new(service), max_upload_bytes);

    let (listener, port) = bind_listener(&config)
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn notes(config: Arc<Config>, pdf: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let filename = pdf
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("invalid PDF path: {}", pdf.display()))?
        .to_string();
    let bytes = tokio::fs::read(&pdf)
        .await
        .with_context(|| format!("failed to read {}", pdf.display()))?;

    let service = NotesService::from_config(config)?;
    let ingestion = service.upload_pdf(&filename, bytes).await?;
    let doc_id = ingestion.doc_id();
    let outcome = ingestion.wait().await?;
    tracing::info!(
        doc_id = %doc_id,
        pages = outcome.total_pages,
        chunks = outcome.total_chunks,
        "Ingestion finished"
    );

    let (_, generation) = service.request_generation(doc_id).await?;
    let record = generation.wait().await?;
    let json = serde_json::to_string_pretty(&record.content)?;

    match out {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Notes written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_profile(value: &str) -> Result<NotesProfile, String> {
    value
        .parse()
        .map_err(|_| format!("unknown profile '{value}', expected concise or comprehensive"))
}

async fn bind_listener(config: &Config) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
