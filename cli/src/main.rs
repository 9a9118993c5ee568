use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use tlgen::{decode_to_json, rust_options_from_json};
use tlgen_compiler::error::TlError;
use tlgen_compiler::{read_schema_from_file, write_tl_to_file, write_tl_to_multiple_files, Mode, RustWriter, RustWriterOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tlgen")]
#[command(about = "Generate Rust from binary TL schemas, or dump them as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single `.rs` file from a `.tlo` schema
    Generate {
        /// Input `.tlo` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.rs` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        writer: WriterArgs,
    },

    /// Generate one `.rs` file per class plus an umbrella `{prefix}.rs`
    Split {
        /// Input `.tlo` file
        #[arg(short, long)]
        input: PathBuf,

        /// Path prefix of the generated files, e.g. `src/tl/tl`
        #[arg(short, long)]
        prefix: String,

        #[command(flatten)]
        writer: WriterArgs,
    },

    /// Decode a `.tlo` file to JSON (printed to stdout)
    Dump {
        /// Input `.tlo` file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct WriterArgs {
    /// JSON file with writer options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Module the generated code imports its runtime from
    #[arg(long)]
    runtime: Option<String>,

    /// Which messages get parsers: all, client or server
    #[arg(long, value_parser = parse_mode)]
    parser_mode: Option<Mode>,

    /// Which messages get binary storers: all, client or server
    #[arg(long, value_parser = parse_mode)]
    storer_mode: Option<Mode>,

    /// Emit doc comments
    #[arg(long)]
    documentation: bool,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    match s {
        "all" => Ok(Mode::All),
        "client" => Ok(Mode::Client),
        "server" => Ok(Mode::Server),
        _ => Err(format!("unknown mode `{}`, expected all, client or server", s)),
    }
}

impl WriterArgs {
    /// Options file first, then command line overrides.
    fn to_writer(&self) -> Result<RustWriter, TlError> {
        let mut options = match &self.options {
            Some(path) => rust_options_from_json(&fs::read_to_string(path)?)?,
            None => RustWriterOptions::default(),
        };
        if let Some(runtime) = &self.runtime {
            options.runtime = runtime.clone();
        }
        if let Some(mode) = self.parser_mode {
            options.parser_mode = mode;
        }
        if let Some(mode) = self.storer_mode {
            options.storer_mode = mode;
        }
        options.documentation |= self.documentation;
        Ok(RustWriter::new(options))
    }
}

fn main() -> Result<(), TlError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { input, output, writer } => {
            let schema = read_schema_from_file(input)?;
            let w = writer.to_writer()?;
            match output {
                Some(out_path) => {
                    if !write_tl_to_file(&schema, out_path, &w)? {
                        info!("{} is up to date", out_path.display());
                    }
                }
                None => print!("{}", tlgen_compiler::generate(&schema, &w)?),
            }
            Ok(())
        }

        Commands::Split { input, prefix, writer } => {
            let schema = read_schema_from_file(input)?;
            let w = writer.to_writer()?;
            let written = write_tl_to_multiple_files(&schema, prefix, ".rs", &w)?;
            info!(written, "generated {} from {}", Path::new(prefix).display(), input.display());
            Ok(())
        }

        Commands::Dump { input } => {
            let data = fs::read(input)?;
            if data.is_empty() {
                return Err(TlError::EmptyInput(input.display().to_string()));
            }
            println!("{}", decode_to_json(&data)?);
            Ok(())
        }
    }
}
