//! One-shot commands that do not start the server

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::config::{StaticConfig, get_config};
use crate::proxy::parse_upstream;
use crate::runtime::lifetime::startup::install_crypto_provider;
use crate::storage::StorageFactory;

pub fn generate_config(output_path: Option<&str>, force: bool) -> Result<()> {
    let Some(path) = output_path else {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if Path::new(path).exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path);
    }

    StaticConfig::default().save_to_file(path)?;
    println!("{} Sample configuration written to {}", "✓".green(), path);
    Ok(())
}

pub async fn add_domain(host: &str, target_url: &str, owner: i64) -> Result<()> {
    parse_upstream(target_url)?;

    install_crypto_provider();
    let config = get_config();
    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to open storage")?;

    let domain = storage
        .insert_domain(&host.to_ascii_lowercase(), owner, target_url)
        .await
        .with_context(|| format!("Failed to add domain {}", host))?;
    if let Err(e) = storage.close().await {
        eprintln!("{}", e.format_colored());
    }

    println!(
        "{} Domain {} (id {}) -> {}",
        "✓".green(),
        domain.host_name.bold(),
        domain.id,
        domain.target_url
    );
    Ok(())
}
