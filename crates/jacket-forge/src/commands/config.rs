use crate::errors::CliError;
use crate::utils::config::{load_config, resolve_config_path, save_config};
use abk_batch::BatchConfig;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;

/// Print a path entry with an existence indicator.
fn print_path_config(name: &str, path: &Utf8Path) {
    let status = if path.exists() {
        "✓".bright_green()
    } else {
        "✗".bright_red()
    };
    println!("  {} {} {}", format!("{}:", name).bright_white(), path, status);
}

pub fn show_config(config_path: Option<Utf8PathBuf>) -> Result<()> {
    let (cfg, loaded_from) = load_config(config_path.as_deref())?;

    println!();
    match loaded_from {
        Some(path) => println!("  {} {}", "config_file:".bright_white(), path),
        None => println!(
            "  {} {}",
            "config_file:".bright_white(),
            "(not found, using defaults)".bright_yellow()
        ),
    }

    print_path_config("template_dir", &cfg.template_dir);
    println!(
        "  {} {}",
        "template_id:".bright_white(),
        cfg.template_id
    );
    print_path_config("inputs_dir", &cfg.inputs_dir);
    print_path_config("output_dir", &cfg.output_dir);
    print_path_config("id_table", &cfg.id_table);
    print_path_config("manifest", &cfg.manifest_path());
    println!("  {} {}", "id_floor:".bright_white(), cfg.id_floor);
    println!("  {} {}", "jobs:".bright_white(), cfg.worker_count());
    println!("  {} {}", "force:".bright_white(), cfg.force);
    println!();
    Ok(())
}

/// Write a `forge.toml` filled with the defaults.
pub fn init_config(config_path: Option<Utf8PathBuf>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path.as_deref());
    if path.exists() && !force {
        return Err(CliError::ConfigExists { path }.into());
    }

    save_config(&path, &BatchConfig::default()).map_err(CliError::from)?;
    println!(
        "{} {}",
        "✅ Wrote default configuration to".bright_green().bold(),
        path.as_str().bright_cyan()
    );
    Ok(())
}
