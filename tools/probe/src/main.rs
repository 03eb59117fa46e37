mod checks;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use domain::{
    prescriptions::{self, GeminiProvider, ModelProvider},
    GeminiConfig,
};

use checks::{Summary, BACKEND, OCR, TARGETS};

#[derive(Parser)]
#[command(name = "probe")]
#[command(about = "Diagnostics for the prescription extraction service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check which local services are listening and responding
    Status {
        /// Host the services run on
        #[arg(long, default_value = "localhost")]
        host: String,
    },
    /// Run one extraction against the configured model using a local image
    Extract {
        /// Path to the prescription image
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    match Cli::parse().command {
        Commands::Status { host } => status(&host).await,
        Commands::Extract { path } => extract(path).await,
    }
}

async fn status(host: &str) -> Result<()> {
    println!("Port Configuration Test");
    println!("{}", "=".repeat(30));

    println!("\nPort Usage:");
    let mut backend_up = false;
    let mut ocr_up = false;
    for target in TARGETS {
        let in_use = checks::port_in_use(host, target.port).await;
        if target == BACKEND {
            backend_up = in_use;
        } else if target == OCR {
            ocr_up = in_use;
        }
        println!(
            "Port {} ({}): {}",
            target.port,
            target.name,
            if in_use { "IN USE" } else { "FREE" }
        );
    }

    println!("\nService Status:");
    let client = reqwest::Client::new();
    for target in TARGETS {
        let url = target.url(host);
        let running = checks::service_running(&client, &url).await;
        println!(
            "{} ({}): {}",
            target.name,
            url,
            if running { "RUNNING" } else { "NOT RUNNING" }
        );
    }

    println!("\n{}", Summary::from_ports(backend_up, ocr_up));
    Ok(())
}

async fn extract(path: PathBuf) -> Result<()> {
    let image = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let provider = GeminiProvider::new(GeminiConfig::from_env());
    tracing::info!("Extracting {} with {}", path.display(), provider.model_id());

    let model = provider.connect()?;
    let extraction = prescriptions::extract(model.as_ref(), &image).await?;

    if extraction.needs_review {
        if extraction.raw_output.is_empty() {
            println!("No usable output from model.");
        } else {
            println!("Could not parse JSON, raw output:\n");
            println!("{}", extraction.raw_output);
        }
        return Ok(());
    }

    println!("Structured Prescription Data:\n");
    println!("{}", serde_json::to_string_pretty(&extraction.extracted_data)?);

    if let Some(normalized) = extraction.normalized() {
        println!("\nNormalized:\n");
        println!("{}", serde_json::to_string_pretty(&normalized)?);

        let patient = if normalized.patient_name.is_empty() {
            "unknown patient"
        } else {
            normalized.patient_name.as_str()
        };
        println!(
            "\n{} medication(s) for {}",
            normalized.medications.len(),
            patient
        );

        if normalized.issues.is_empty() {
            println!("No issues found.");
        } else {
            println!("\nIssues:");
            for issue in &normalized.issues {
                println!("  - {} [{:?}] {}", issue.path, issue.code, issue.note);
            }
        }
    }
    Ok(())
}
