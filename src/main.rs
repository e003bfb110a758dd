use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wave2midi::separation::PreSeparated;
use wave2midi::{validate_input, Config, WaveToMidi};

/// Wave-to-MIDI Conversion System
#[derive(Parser)]
#[command(name = "wave2midi")]
#[command(about = "Convert WAV files to MIDI by separating into stems")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a WAV file into per-stem MIDI files
    Convert {
        /// Input WAV file
        input: PathBuf,

        /// Output directory for MIDI files
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of stems the separation model produces (2, 4 or 5)
        #[arg(long)]
        stems: Option<usize>,

        /// Output tempo in BPM
        #[arg(long)]
        bpm: Option<f32>,

        /// Pre-separated stem as NAME=FILE, repeatable. Without this the
        /// whole mix is transcribed as a single stem.
        #[arg(long = "stem", value_name = "NAME=FILE")]
        stem_files: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            stems,
            bpm,
            stem_files,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }

            // Load configuration and apply command-line overrides
            let mut config = if let Some(config_path) = config {
                wave2midi::config::load_config(config_path)?
            } else {
                Config::default()
            };
            if let Some(stems) = stems {
                config.separation.stem_count = stems;
            }
            if let Some(bpm) = bpm {
                config.export.output_bpm = bpm;
            }
            wave2midi::config::validate_config(&config)?;

            // Validate input
            validate_input(&input, &config)?;

            // Create converter
            let converter = if stem_files.is_empty() {
                WaveToMidi::new(config)
            } else {
                let stems = parse_stem_args(&stem_files)?;
                WaveToMidi::with_separator(config, Box::new(PreSeparated::new(stems)?))
            };

            if !quiet {
                println!("Converting {} to MIDI...", input.display());
            }

            let written = converter.convert(&input, &output)?;

            if !quiet {
                println!("Conversion complete!");
                println!("Created {} MIDI files:", written.len());
                for path in &written {
                    println!("  {}", path.display());
                }
            }
        }
        Commands::ValidateConfig { config } => {
            let config = wave2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn parse_stem_args(args: &[String]) -> anyhow::Result<Vec<(String, PathBuf)>> {
    args.iter()
        .map(|arg| {
            let (name, path) = arg
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("--stem expects NAME=FILE, got '{}'", arg))?;
            Ok((name.to_string(), PathBuf::from(path)))
        })
        .collect()
}
