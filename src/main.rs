use anyhow::{Context, Result};
use uuid::Uuid;

use panacea::{
    cli::invocation_from_args,
    commands::{CommandContext, execute},
    config::Config,
    logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = invocation_from_args()?;
    let config = Config::load_or_default(&invocation.config_path, invocation.config_explicit)
        .with_context(|| {
            format!(
                "failed to load config from {}",
                invocation.config_path.display()
            )
        })?;

    let run_id = Uuid::now_v7().to_string();
    let _logging_guard = init_tracing(&config.logging, &run_id)?;

    let ctx = CommandContext::new(config, run_id);
    let command_name = invocation.command.name();
    execute(&ctx, invocation.command)
        .await
        .with_context(|| format!("panacea {command_name} failed"))
}
