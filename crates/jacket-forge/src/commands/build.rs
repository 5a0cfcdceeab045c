use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use abk_batch::{BatchBuilder, BatchConfig, BatchStage};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

/// Command-line overrides; `None`/`false` keeps the configured value.
#[derive(Debug, Default)]
pub struct BuildArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub template_dir: Option<Utf8PathBuf>,
    pub template_id: Option<u32>,
    pub inputs_dir: Option<Utf8PathBuf>,
    pub output_dir: Option<Utf8PathBuf>,
    pub id_table: Option<Utf8PathBuf>,
    pub manifest: Option<Utf8PathBuf>,
    pub id_floor: Option<u32>,
    pub jobs: Option<usize>,
    pub force: bool,
    pub report: Option<Utf8PathBuf>,
}

impl BuildArgs {
    fn apply(&self, config: &mut BatchConfig) {
        if let Some(dir) = &self.template_dir {
            config.template_dir = dir.clone();
        }
        if let Some(id) = self.template_id {
            config.template_id = id;
        }
        if let Some(dir) = &self.inputs_dir {
            config.inputs_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.id_table {
            config.id_table = path.clone();
        }
        if let Some(path) = &self.manifest {
            config.manifest = Some(path.clone());
        }
        if let Some(floor) = self.id_floor {
            config.id_floor = floor;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = Some(jobs);
        }
        config.force |= self.force;
    }
}

pub fn build_jackets(args: BuildArgs) -> Result<()> {
    let (mut config, _) = load_config(args.config_path.as_deref())?;
    args.apply(&mut config);

    println!(
        "{} {}",
        "🖼️  Building jackets from:".bright_blue().bold(),
        config.inputs_dir.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {} {}",
        "Template:".bright_white(),
        config.template_dir,
        format!("(id {})", config.template_id).dimmed()
    );
    println_pad!("{} {}", "Output:".bright_white(), config.output_dir);
    println_pad!(
        "{} {}",
        "Workers:".bright_white(),
        config.worker_count()
    );
    println!();

    let report = BatchBuilder::new(config)
        .with_progress(|progress| {
            if progress.stage != BatchStage::BuildingItems {
                return;
            }
            if let Some(key) = progress.current_item {
                println_pad!(
                    "{} {}",
                    format!("[{}/{}]", progress.current, progress.total).bright_green(),
                    key
                );
            }
        })
        .run()
        .map_err(CliError::from)?;

    println!();
    println!("{}", "📋 Summary".bright_magenta().bold());
    println_pad!(
        "{} {}",
        "Built:".bright_green(),
        report.built.len().to_string().bright_white().bold()
    );
    println_pad!(
        "{} {}",
        "Skipped:".bright_yellow(),
        report.skipped.len().to_string().bright_white()
    );
    println_pad!(
        "{} {}",
        "Failed:".bright_red(),
        report.failed.len().to_string().bright_white()
    );
    if let Some(manifest) = &report.manifest {
        println_pad!(
            "{} {} {}",
            "Manifest:".bright_white(),
            manifest.path,
            format!("(+{} entries, {} total)", manifest.appended, manifest.total).dimmed()
        );
        if let Some((names, infos)) = manifest.padded_from {
            println_pad!(
                "{} {}",
                "⚠".bright_yellow(),
                format!("manifest was out of sync ({names} names, {infos} infos) and was padded")
                    .bright_yellow()
            );
        }
    }

    for failure in &report.failed {
        println_pad!(
            "   {} {} {}",
            "•".bright_red(),
            failure.key.bright_red().bold(),
            failure.error.dimmed()
        );
    }

    if let Some(path) = &args.report {
        report.save(path).map_err(CliError::from)?;
        println_pad!("{} {}", "Report:".bright_white(), path);
    }

    println!(
        "{} {}",
        "⏱️  Finished in".bright_blue(),
        format!("{} ms", report.duration_ms).bright_white()
    );

    if !report.is_success() {
        return Err(CliError::ItemsFailed {
            count: report.failed.len(),
        }
        .into());
    }

    println!("{}", "✅ All jackets built successfully!".bright_green().bold());
    Ok(())
}
