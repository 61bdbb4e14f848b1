use crate::config::GenConfig;
use crate::document::{load_document, resolve, Schema};
use crate::generator::{generate, web_pkg, Phases};
use crate::logging::LogFormat;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface for crudgen
#[derive(Parser, Debug)]
#[command(name = "crudgen", version)]
#[command(about = "Generate models, stores and HTTP handlers from a schema document", long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text, env = "CRUDGEN_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate sources from a document
    Generate {
        /// Path to the document (YAML, or JSON for `.json`)
        #[arg(short, long)]
        doc: PathBuf,

        /// Phase mask: 1 models, 2 stores, 4 web
        #[arg(short, long, default_value_t = 7)]
        phases: u8,

        /// Remove the fully generated files of the selected phases before generating
        #[arg(long, default_value_t = false)]
        drop: bool,

        /// Path to `crudgen.toml`
        /// If not provided, will auto-detect alongside the document
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project root, overrides `output_root` of the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not run rustfmt over generated files
        #[arg(long, default_value_t = false)]
        no_fmt: bool,
    },
    /// Load and resolve a document without writing files
    Check {
        /// Path to the document (YAML, or JSON for `.json`)
        #[arg(short, long)]
        doc: PathBuf,
    },
}

/// Execute the parsed command.
///
/// # Errors
///
/// Any load, resolution or generation error; the binary turns it into a non-zero exit.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            doc,
            phases,
            drop,
            config,
            output,
            no_fmt,
        } => {
            let phases = Phases::from_bits(phases)?;
            let mut gen_config = GenConfig::resolve(config.as_deref(), &doc)?;
            if let Some(root) = output {
                gen_config.output_root = root;
            }
            if no_fmt {
                gen_config.rustfmt = false;
            }
            let schema = load(&doc)?;
            let report = generate(&schema, &gen_config, phases, drop)
                .with_context(|| format!("generation of {} failed", doc.display()))?;
            for (path, reason) in &report.skipped {
                eprintln!("skipped {}: {reason}", path.display());
            }
            Ok(())
        }
        Commands::Check { doc } => {
            let schema = load(&doc)?;
            print!("{}", summary(&schema));
            Ok(())
        }
    }
}

fn load(doc: &std::path::Path) -> anyhow::Result<Schema> {
    let document =
        load_document(doc).with_context(|| format!("failed to load {}", doc.display()))?;
    resolve(document).with_context(|| format!("failed to resolve {}", doc.display()))
}

/// Human-readable outline of a resolved document.
pub(crate) fn summary(schema: &Schema) -> String {
    let doc = &schema.doc;
    let mut out = format!(
        "document {} (package {})\n  models: {}\n  enums: {}\n",
        schema.name(),
        doc.model_pkg,
        doc.models.len(),
        doc.enums.len()
    );
    for store in &schema.stores {
        out.push_str(&format!(
            "  store {} ({}): {} methods\n",
            store.name,
            store.iname,
            store.methods.len()
        ));
    }
    if !doc.webapi.uris.is_empty() || !doc.webapi.handles.is_empty() {
        out.push_str(&format!(
            "  web {}: {} uris, {} handles\n",
            web_pkg(schema),
            doc.webapi.uris.len(),
            doc.webapi.handles.len()
        ));
    }
    out
}
