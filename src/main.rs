//! metamodel - Main Entry Point

use clap::Parser;
use metamodel::cli::{cmd_evaluate, cmd_info, cmd_search, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metamodel=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            data,
            target,
            space,
            n_iter,
            scoring,
            cv_folds,
            seed,
            n_jobs,
            no_refit,
            verbose,
            output,
        } => {
            cmd_search(
                &data,
                &target,
                space.as_deref(),
                n_iter,
                &scoring,
                cv_folds,
                seed,
                n_jobs,
                !no_refit,
                verbose,
                output.as_deref(),
            )?;
        }
        Commands::Evaluate { train, val, target, models, output } => {
            cmd_evaluate(&train, &val, &target, models.as_deref(), output.as_deref())?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
