// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — command-line front end.
//
// Entry point. Initialises logging, reads the input files, runs one
// conversion session, and writes the results.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use folio_core::config::ConversionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::human_errors::humanize_error;
use folio_core::types::{Anchor, ConversionMode, ImageLayout, OverlayProfile, OverlayScope, SourceItem, SourceKind};
use folio_document::ConversionSession;
use folio_document::session::{ConversionOutput, kind_from_name};
use tracing::info;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Merge PDFs and images, stamp signatures, and convert between PDF and DOCX", long_about = None)]
struct Cli {
    /// JSON configuration file (paper size, margin, line clustering, ...)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge PDFs and images into one PDF, in the order given
    Merge {
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, value_name = "FILE", default_value = "merged.pdf")]
        output: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Turn images into a PDF, one page per image
    Images {
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, value_name = "FILE", default_value = "images.pdf")]
        output: PathBuf,

        /// Shrink images below the fitted size, in (0, 1]
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Placement on the page: l/c/r combined with t/c/b (e.g. "lt", "cc", "rb")
        #[arg(long, default_value = "cc")]
        anchor: Anchor,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Rebuild each PDF as a DOCX from its text and images
    #[command(name = "to-docx")]
    ToDocx {
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Lay out each DOCX's paragraphs as a PDF
    #[command(name = "to-pdf")]
    ToPdf {
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,
    },
}

/// Signature overlay flags shared by every subcommand.
#[derive(Args)]
struct OverlayArgs {
    /// Signature image (PNG or JPEG) stamped onto the output
    #[arg(long, value_name = "FILE")]
    signature: Option<PathBuf>,

    /// Left edge of the signature, as a fraction of the page width
    #[arg(long, default_value_t = 0.7)]
    sig_x: f64,

    /// Bottom edge of the signature, as a fraction of the page height
    #[arg(long, default_value_t = 0.1)]
    sig_y: f64,

    /// Signature width in points
    #[arg(long, default_value_t = 150.0)]
    sig_width: f64,

    /// Which pages get the signature: all, first, or last
    #[arg(long, default_value = "all")]
    sig_scope: OverlayScope,
}

impl OverlayArgs {
    fn profile(&self) -> Result<Option<OverlayProfile>> {
        let Some(path) = &self.signature else {
            return Ok(None);
        };
        Ok(Some(OverlayProfile {
            image: std::fs::read(path)?,
            x_percent: self.sig_x,
            y_percent: self.sig_y,
            width_points: self.sig_width,
            scope: self.sig_scope,
        }))
    }
}

/// Where the results go.
enum Destination {
    File(PathBuf),
    Directory(PathBuf),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(written) => {
            for path in written {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("folio: {}", human.message);
            eprintln!("  {}", human.suggestion);
            tracing::debug!(error = %err, "Conversion failed");
            ExitCode::FAILURE
        }
    }
}

/// Run one conversion and return the paths written.
async fn run(cli: Cli) -> Result<Vec<PathBuf>> {
    let config = match &cli.config {
        Some(path) => ConversionConfig::load(path)?,
        None => ConversionConfig::default(),
    };

    let (mode, inputs, destination, overlay, layout) = match cli.command {
        Commands::Merge { inputs, output, overlay } => {
            (ConversionMode::Merge, inputs, Destination::File(output), overlay, ImageLayout::default())
        }
        Commands::Images {
            inputs,
            output,
            scale,
            anchor,
            overlay,
        } => (
            ConversionMode::Images,
            inputs,
            Destination::File(output),
            overlay,
            ImageLayout { scale, anchor },
        ),
        Commands::ToDocx { inputs, output, overlay } => (
            ConversionMode::Reconstruct,
            inputs,
            Destination::Directory(output),
            overlay,
            ImageLayout::default(),
        ),
        Commands::ToPdf { inputs, output, overlay } => (
            ConversionMode::StructuredToPdf,
            inputs,
            Destination::Directory(output),
            overlay,
            ImageLayout::default(),
        ),
    };

    let mut session = ConversionSession::new(mode, config);
    for path in &inputs {
        session.add_item(load_item(path, layout)?)?;
    }
    if let Some(profile) = overlay.profile()? {
        session.set_overlay(profile)?;
    }
    info!(mode = ?mode, items = inputs.len(), "Conversion starting");

    let outputs = match mode {
        ConversionMode::Merge | ConversionMode::Images => vec![session.compose_async().await?],
        ConversionMode::Reconstruct => session.reconstruct_async().await?,
        ConversionMode::StructuredToPdf => session.structured_to_pdf_async().await?,
    };
    write_outputs(&destination, outputs)
}

/// Read a file and classify it by extension.
fn load_item(path: &Path, layout: ImageLayout) -> Result<SourceItem> {
    let name = path.display().to_string();
    let kind = kind_from_name(&name).ok_or_else(|| {
        FolioError::InputValidation(format!("{name}: expected a .pdf, .png, .jpg or .docx file"))
    })?;
    let bytes = std::fs::read(path)?;
    Ok(match kind {
        SourceKind::Existing => SourceItem::existing(name, bytes),
        SourceKind::Raster => SourceItem::raster(name, bytes, layout),
        SourceKind::Structured => SourceItem::structured(name, bytes),
    })
}

fn write_outputs(destination: &Destination, outputs: Vec<ConversionOutput>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(outputs.len());
    for output in outputs {
        let path = match destination {
            Destination::File(path) => path.clone(),
            Destination::Directory(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.join(&output.name)
            }
        };
        std::fs::write(&path, &output.bytes)?;
        info!(path = %path.display(), bytes = output.bytes.len(), "Output written");
        written.push(path);
    }
    Ok(written)
}
