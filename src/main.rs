//! phishguard entry point

use clap::Parser;
use phishguard::cli::{cmd_predict, cmd_train, cmd_validate, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phishguard=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            train,
            test,
            data,
            config,
        } => {
            cmd_train(
                train.as_deref(),
                test.as_deref(),
                data.as_deref(),
                config.as_deref(),
            )?;
        }
        Commands::Validate {
            train,
            test,
            schema,
        } => {
            cmd_validate(&train, &test, schema.as_deref())?;
        }
        Commands::Predict {
            model_dir,
            data,
            output,
        } => {
            cmd_predict(&model_dir, &data, &output)?;
        }
    }

    Ok(())
}
