use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use abk_registry::IdTable;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

pub struct AllocateArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub keys: Vec<String>,
    pub id_table: Option<Utf8PathBuf>,
    pub id_floor: Option<u32>,
}

/// Resolve ids for `keys`, or list the table when no key is given.
pub fn allocate_ids(args: AllocateArgs) -> Result<()> {
    let (config, _) = load_config(args.config_path.as_deref())?;
    let path = args.id_table.unwrap_or(config.id_table);
    let floor = args.id_floor.unwrap_or(config.id_floor);

    let table = IdTable::open(path.clone(), floor).map_err(CliError::from)?;

    if args.keys.is_empty() {
        let records = table.records().map_err(CliError::from)?;
        println!(
            "{} {} {}",
            "🔢 Id table:".bright_blue().bold(),
            path.as_str().bright_cyan(),
            format!("({} records)", records.len()).dimmed()
        );
        for record in records {
            println_pad!(
                "{} {}",
                format!("{:>6}", record.id).bright_white().bold(),
                record.key
            );
        }
        return Ok(());
    }

    for key in &args.keys {
        let existed = table.get(key).map_err(CliError::from)?.is_some();
        let id = table.get_or_create(key).map_err(CliError::from)?;
        let status = if existed {
            "existing".dimmed()
        } else {
            "new".bright_green()
        };
        println_pad!(
            "{} {} {}",
            format!("{id:>6}").bright_white().bold(),
            key.bright_cyan(),
            status
        );
    }

    Ok(())
}
