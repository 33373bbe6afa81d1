//! shapeup CLI — run, validate and inspect constraint scenes.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shapeup")]
#[command(version, about = "shapeup — constraint-based geometry optimization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a scene and report the result.
    Solve {
        /// Path to the scene file (TOML).
        scene: String,

        /// Write the result as JSON to this path instead of stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Override the scene's iteration (static) or step (dynamic) count.
        #[arg(short, long)]
        iterations: Option<u32>,
    },

    /// Check that a scene loads, registers and factorizes.
    Validate {
        /// Path to the scene file (TOML).
        scene: String,
    },

    /// Print how many index sets each mesh pattern yields for a scene.
    Patterns {
        /// Path to the scene file (TOML).
        scene: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve {
            scene,
            output,
            iterations,
        } => commands::solve(&scene, output.as_deref(), iterations),
        Commands::Validate { scene } => commands::validate(&scene),
        Commands::Patterns { scene } => commands::patterns(&scene),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
