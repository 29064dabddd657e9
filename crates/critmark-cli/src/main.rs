use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use critmark_core::{extract_path, FigureRegistry, OoxmlPackage, ReconcileSettings, Reconciler, Verdict};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "critmark")]
#[command(about = "Reconcile reviewer changes and comments from a DOCX back onto a markdown source", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct Cli {
    /// Settings JSON; omitted fields keep their defaults
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the text, comments, anchors and tables of a reviewed document as JSON
    Extract {
        docx: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile a reviewed document against its markdown source
    Import {
        /// Canonical markdown source
        #[arg(short, long)]
        source: PathBuf,

        /// Converter output for the reviewed document
        #[arg(short, long)]
        rendered: PathBuf,

        /// The reviewed document itself, for comments
        #[arg(short, long)]
        docx: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Figure registry written by `critmark registry`
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Also write the full import report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Build the figure registry of a markdown source
    Registry {
        source: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default settings as JSON
    Settings,
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<ReconcileSettings> {
    match path {
        Some(path) => {
            let json = read_text(path)?;
            ReconcileSettings::from_json(&json)
                .with_context(|| format!("invalid settings in {}", path.display()))
        }
        None => Ok(ReconcileSettings::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Extract { docx, output } => {
            let extraction = extract_path(&docx, &settings.extract)
                .with_context(|| format!("failed to extract {}", docx.display()))?;
            let json = serde_json::to_string_pretty(&extraction)?;
            write_or_print(output.as_deref(), &json)?;
        }
        Commands::Import {
            source,
            rendered,
            docx,
            output,
            registry,
            report,
        } => {
            let source_text = read_text(&source)?;
            let rendered_text = read_text(&rendered)?;
            let package = OoxmlPackage::open_path(&docx)
                .with_context(|| format!("failed to open {}", docx.display()))?;

            let mut reconciler = Reconciler::new(settings);
            if let Some(path) = registry {
                let json = read_text(&path)?;
                let registry = FigureRegistry::from_json(&json)
                    .with_context(|| format!("invalid registry {}", path.display()))?;
                reconciler = reconciler.with_registry(registry);
            }

            let result = reconciler.import_package(&source_text, &rendered_text, &package)?;
            fs::write(&output, &result.text)
                .with_context(|| format!("failed to write {}", output.display()))?;
            if let Some(path) = report {
                fs::write(&path, result.to_json())
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }

            println!("Wrote {}", output.display());
            println!(
                "  paragraphs: {} unchanged, {} modified, {} deleted, {} inserted",
                result.paragraphs_with(Verdict::Unchanged),
                result.paragraphs_with(Verdict::Modified),
                result.paragraphs_with(Verdict::Deleted),
                result.paragraphs_with(Verdict::Inserted)
            );
            println!(
                "  changes: {} insertions, {} deletions, {} substitutions",
                result.counts.insertions, result.counts.deletions, result.counts.substitutions
            );
            println!(
                "  comments: {} placed, {} unmatched, {} ambiguous",
                result.placed.len(),
                result.unmatched.len(),
                result.ambiguous
            );
            for warning in &result.warnings {
                eprintln!("warning: {warning}");
            }
        }
        Commands::Registry { source, output } => {
            let registry = FigureRegistry::from_source(&read_text(&source)?);
            log::info!("{} figure(s) and table(s) registered", registry.len());
            write_or_print(output.as_deref(), &registry.to_json()?)?;
        }
        Commands::Settings => {
            println!("{}", ReconcileSettings::default().to_json()?);
        }
    }
    Ok(())
}
