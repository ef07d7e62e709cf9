use anyhow::Result;
use clap::Parser;

use hivewire_client::config_manager::ConfigLoader;

use crate::commands::{Cli, Commands};
use crate::forward;
use crate::logging::setup_logging;

pub fn process_cli() -> Result<()> {
    let cli = Cli::parse();
    setup_logging()?;

    let mut config = ConfigLoader::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            if let Some(url) = args.url {
                config.url = url;
            }
            if let Some(sensor) = args.sensor {
                config.sensor = sensor;
            }
            config.validate()?;
            forward::run(config, &args.log_file)
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
