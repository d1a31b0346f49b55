use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use exploview::config::Settings;
use exploview::flowchart::generate_flow_charts;
use exploview::graph::build_graph_view;
use exploview::ids::UuidIds;
use exploview::import::{deserialize_test_result, load_test_result};
use exploview::input_table::project_window_tables;
use exploview::model::TestResult;
use exploview::screen_def::{redefine_screens, ScreenDefFactory};
use exploview::sequence::build_sequence_view;
use exploview::sequence_diagram::generate_sequence_diagrams;
use exploview::serialize;

#[derive(Parser)]
#[command(name = "exploview")]
#[command(about = "Screen transition graphs and sequence diagrams from exploratory test results")]
struct Cli {
    /// Settings file (default: ~/.exploview/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Recompute screen names with the configured screen definition rules
    #[arg(long, global = true)]
    redefine_screens: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
    Mermaid,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the screen transition graph of a test result
    Graph {
        /// Test result JSON file, or '-' for stdin
        input: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Build the purpose-segmented sequence view of a test result
    Sequence {
        /// Test result JSON file, or '-' for stdin
        input: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print per-window input value tables as JSON
    Inputs {
        /// Test result JSON file, or '-' for stdin
        input: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Graph { input, format } => {
            info!(input = %input, "graph command");
            let result = read_result(&input, &settings, cli.redefine_screens)?;
            let view = build_graph_view(&result.graph_steps(), &result.coverage_sources, &mut UuidIds);
            info!(nodes = view.nodes.len(), screens = view.store.screens.len(), "graph view complete");
            let output = match format {
                Format::Json => serde_json::to_string_pretty(&view)?,
                Format::Text => serialize::graph_to_text(&view),
                Format::Mermaid => generate_flow_charts(&view, &settings.diagram)
                    .iter()
                    .map(|chart| format!("%% {}\n{}", chart.window_id, chart.graph_text))
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            println!("{output}");
        }
        Commands::Sequence { input, format } => {
            info!(input = %input, "sequence command");
            let result = read_result(&input, &settings, cli.redefine_screens)?;
            let view = build_sequence_view(&result.id, &result.test_steps, &mut UuidIds);
            info!(scenarios = view.scenarios.len(), "sequence view complete");
            let output = match format {
                Format::Json => serde_json::to_string_pretty(&view)?,
                Format::Text => serialize::sequence_to_text(&view),
                Format::Mermaid => generate_sequence_diagrams(&view, &settings.diagram)
                    .iter()
                    .map(|diagram| diagram.graph_text.clone())
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            println!("{output}");
        }
        Commands::Inputs { input } => {
            info!(input = %input, "inputs command");
            let result = read_result(&input, &settings, cli.redefine_screens)?;
            let view = build_graph_view(&result.graph_steps(), &result.coverage_sources, &mut UuidIds);
            let tables = project_window_tables(&view);
            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
    }
    Ok(())
}

fn read_result(input: &str, settings: &Settings, redefine: bool) -> Result<TestResult> {
    let result = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        deserialize_test_result(&buf).context("Failed to import test result from stdin")?
    } else {
        load_test_result(Path::new(input))?
    };
    debug!(id = %result.id, steps = result.test_steps.len(), "test result loaded");

    if redefine || settings.has_screen_rules() {
        let factory = ScreenDefFactory::new(&settings.screen_definition);
        return Ok(redefine_screens(&result, &factory));
    }
    Ok(result)
}
