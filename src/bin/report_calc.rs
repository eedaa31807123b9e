//! Command line interface for Report Calc
//!
//! Runs a ruleset over input files and writes a JSON and/or HTML report.
//! The exit code tells the calling workflow to carry on (0), fail (1) or
//! retry the job (2).

use anyhow::{Context, Result};
use clap::Parser;
use report_calc::evaluator::DEFAULT_MAX_DEPTH;
use report_calc::{InputFile, RunConfig, create_standard_registry};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "report-calc")]
#[command(about = "Prefix-notation rule interpreter producing quality-control reports")]
#[command(version)]
struct Cli {
    /// Rule file (JSON). Without one an empty "processing" section is used
    #[arg(short, long = "rules", value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Rule sections to execute, comma separated. Default: every section not marked optional
    #[arg(short, long, value_delimiter = ',', value_name = "SECTIONS")]
    execute: Vec<String>,

    /// Input files as path:name:type, comma separated. May be repeated
    #[arg(short, long = "input", value_name = "FILES")]
    input: Vec<String>,

    /// JSON report file, or - for standard output
    #[arg(short = 'o', long = "output-json", value_name = "FILE")]
    output_json: Option<PathBuf>,

    /// HTML report file
    #[arg(short = 'H', long = "output-html", value_name = "FILE")]
    output_html: Option<PathBuf>,

    /// Folder writeFile() output goes to. Default: the working directory
    #[arg(short = 'f', long = "folder", value_name = "DIR")]
    folder: Option<PathBuf>,

    /// Custom rule overlay file (JSON)
    #[arg(short, long = "custom", value_name = "FILE")]
    custom: Option<PathBuf>,

    /// Save the ruleset, with custom rules applied, to a file
    #[arg(short, long = "save-rules", value_name = "FILE")]
    save_rules: Option<PathBuf>,

    /// Trace rule evaluation
    #[arg(short, long)]
    debug: bool,

    /// List every available function with its usage and exit
    #[arg(long)]
    functions: bool,

    /// Maximum nesting depth of function calls
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        let mut config = RunConfig::new()
            .with_execute(
                self.execute
                    .iter()
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty()),
            )
            .with_debug(self.debug)
            .with_max_depth(self.max_depth);

        for list in &self.input {
            for file in InputFile::parse_list(list).context("Invalid --input value")? {
                config = config.with_input_file(file);
            }
        }
        if let Some(path) = self.rules {
            config = config.with_rules_file(path);
        }
        if let Some(path) = self.output_json {
            config = config.with_output_json(path);
        }
        if let Some(path) = self.output_html {
            config = config.with_output_html(path);
        }
        let folder = match self.folder {
            Some(folder) => folder,
            None => std::env::current_dir().context("Unable to read the working directory")?,
        };
        config = config.with_output_folder(folder);
        if let Some(path) = self.custom {
            config = config.with_custom_rules(path);
        }
        if let Some(path) = self.save_rules {
            config = config.with_save_rules(path);
        }
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn print_functions() {
    let registry = create_standard_registry();
    for (usage, documentation) in registry.names() {
        println!("{usage}");
        if !documentation.is_empty() {
            println!("\t{documentation}");
        }
    }
}

fn main() -> Result<()> {
    // Setup human-panic for better error messages
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.functions {
        print_functions();
        return Ok(());
    }

    let config = cli.into_config()?;
    let outcome = report_calc::execute(config);
    if let Some(message) = &outcome.message {
        eprintln!("{message}");
    }
    process::exit(outcome.exit_code);
}
