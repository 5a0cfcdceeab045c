use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use abk_bundle::JACKET_VARIANTS;
use abk_registry::extend_manifest;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

pub struct RegisterArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub ids: Vec<u32>,
    pub manifest: Option<Utf8PathBuf>,
}

/// Register both jacket variants of `ids` in the dependency manifest.
pub fn register_ids(args: RegisterArgs) -> Result<()> {
    let (config, _) = load_config(args.config_path.as_deref())?;
    let path = args.manifest.unwrap_or_else(|| config.manifest_path());

    let update = extend_manifest(&path, &args.ids, &JACKET_VARIANTS).map_err(CliError::from)?;

    println!(
        "{} {}",
        "🧾 Manifest:".bright_blue().bold(),
        path.as_str().bright_cyan()
    );
    if let Some(desync) = update.desync {
        println_pad!(
            "{} {}",
            "⚠".bright_yellow(),
            format!(
                "padded out-of-sync sequences ({} names, {} infos)",
                desync.names, desync.infos
            )
            .bright_yellow()
        );
    }
    println_pad!(
        "{} {} {}",
        "Appended:".bright_green(),
        update.appended.to_string().bright_white().bold(),
        format!("({} total)", update.total).dimmed()
    );
    for id in &args.ids {
        for variant in JACKET_VARIANTS {
            println_pad!("   {} {}", "•".bright_cyan(), variant.bundle_name(*id));
        }
    }

    Ok(())
}
