use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cdnproxy::cli::{Cli, Commands};
use cdnproxy::config::init_config;
use cdnproxy::runtime::modes::{cli, run_server};
use cdnproxy::system::init_logging;

#[actix_web::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    let config = init_config(args.config.as_deref());

    let result = match args.command.unwrap_or(Commands::Serve) {
        Commands::GenerateConfig { output_path, force } => {
            cli::generate_config(output_path.as_deref(), force)
        }
        Commands::AddDomain {
            host,
            target_url,
            owner,
        } => cli::add_domain(&host, &target_url, owner).await,
        Commands::Serve => {
            // guard 必须存活到进程结束，否则日志无法刷新
            let _guard = match init_logging(&config.logging) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("Failed to initialize logging: {:#}", e);
                    return ExitCode::FAILURE;
                }
            };
            run_server().await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
