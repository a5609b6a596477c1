use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use glimpse_core::onnx::OnnxExtractor;
use glimpse_core::{manifest, GalleryBuilder, NearestMatcher};
use glimpse_hw::Camera;

mod config;
mod engine;
mod render;
mod session;

use config::Config;
use render::ConsoleSink;
use session::Session;

#[derive(Parser)]
#[command(name = "glimpse", about = "Live face recognition from a webcam")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live recognition loop until Ctrl-C
    Run {
        /// V4L2 device path (overrides GLIMPSE_CAMERA_DEVICE)
        #[arg(long)]
        device: Option<String>,
        /// Match distance threshold (overrides GLIMPSE_MATCH_THRESHOLD)
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Regenerate manifest.json from the reference images directory
    Manifest,
    /// Build the gallery from reference photos and print what enrolled
    Gallery,
    /// List available video capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.command {
        Commands::Run { device, threshold } => {
            if let Some(device) = device {
                config.camera_device = device;
            }
            if let Some(threshold) = threshold {
                config.match_threshold = threshold;
            }
            run(&config).await
        }
        Commands::Manifest => {
            let labels = manifest::generate_with(&config.images_dir, &config.image_extensions)
                .context("manifest generation failed")?;
            println!(
                "wrote {} with {} labels",
                config.manifest_path().display(),
                labels.len()
            );
            Ok(())
        }
        Commands::Gallery => gallery_report(&config),
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("no video capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({})", dev.path, dev.name, dev.driver);
            }
            Ok(())
        }
    }
}

/// Full pipeline: models + camera up front, then gallery, then the loop.
async fn run(config: &Config) -> Result<()> {
    let engine = engine::spawn_engine(
        &config.camera_device,
        &config.detector_model_path(),
        &config.embedder_model_path(),
        config.images_dir.clone(),
        config.image_extensions.clone(),
    )
    .context("engine startup failed")?;

    let labels = load_labels(config);
    let gallery = engine.build_gallery(labels).await?;
    if gallery.is_empty() {
        tracing::warn!("gallery is empty; every face will match as unknown");
    }

    let matcher = NearestMatcher::new(&gallery, config.match_threshold);
    let session = Session::start(
        engine,
        gallery,
        matcher,
        config.tick_period(),
        Box::new(ConsoleSink),
    );
    tracing::info!(
        enrolled = session.matcher().len(),
        labels = ?session.gallery().labels().collect::<Vec<_>>(),
        "watching for enrolled faces (Ctrl-C to stop)"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    session.stop().await;

    Ok(())
}

/// Load manifest labels, downgrading failure to an empty gallery.
fn load_labels(config: &Config) -> Vec<String> {
    match manifest::load(&config.manifest_path()) {
        Ok(labels) => {
            tracing::info!(count = labels.len(), "manifest loaded");
            labels
        }
        Err(err) => {
            tracing::error!(error = %err, "manifest unavailable; starting with an empty gallery");
            Vec::new()
        }
    }
}

/// Build the gallery without a camera and print a per-label summary.
fn gallery_report(config: &Config) -> Result<()> {
    let mut extractor = OnnxExtractor::load(
        &config.detector_model_path(),
        &config.embedder_model_path(),
    )
    .context("model load failed")?;

    let labels = load_labels(config);
    let gallery = GalleryBuilder::new(&mut extractor, config.images_dir.clone())
        .with_extensions(config.image_extensions.clone())
        .build(&labels);

    println!("enrolled {}/{} labels", gallery.len(), labels.len());
    for label in &labels {
        match gallery.get(label) {
            Some(desc) => println!("  {label}: {}-dim descriptor", desc.len()),
            None => println!("  {label}: SKIPPED (no face or unreadable image)"),
        }
    }

    Ok(())
}
