use crate::errors::CliError;
use crate::println_pad;
use crate::utils::format_size;
use abk_bundle::texture::TextureInfo;
use abk_bundle::{Blob, ObjectClass, Package};
use abk_typetree::Node;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

pub struct InspectArgs {
    pub file_path: Utf8PathBuf,
    /// Also dump every object tree as JSON.
    pub trees: bool,
}

pub fn inspect_package(args: InspectArgs) -> Result<()> {
    if !args.file_path.is_file() {
        return Err(CliError::file_not_found(args.file_path).into());
    }
    let package = Package::load(&args.file_path).map_err(CliError::from)?;

    println_pad!(
        "{} {}",
        "📦 Package:".bright_blue().bold(),
        package.name.bright_cyan().bold()
    );

    println_pad!("\n{}", "🗂️  Container:".bright_magenta().bold());
    for (path, asset) in &package.container {
        println_pad!(
            "   {} {} {}",
            "•".bright_cyan(),
            path.bright_white(),
            format!("(file {}, path id {})", asset.file_id, asset.path_id).dimmed()
        );
    }

    println_pad!("\n{}", "🧱 Blobs:".bright_magenta().bold());
    for (key, blob) in &package.files {
        match blob {
            Blob::Serialized(file) => {
                println_pad!(
                    "   {} {} {}",
                    "•".bright_cyan(),
                    key.bright_cyan().bold(),
                    format!("({} objects)", file.objects.len()).dimmed()
                );
                for object in &file.objects {
                    let name = object
                        .tree
                        .get("m_Name")
                        .and_then(Node::as_str)
                        .unwrap_or("<unnamed>");
                    println_pad!(
                        "       {} {} {}",
                        object.class.to_string().bright_yellow(),
                        name,
                        format!("#{}", object.path_id).dimmed()
                    );
                    if object.class == ObjectClass::Texture2D {
                        print_texture(&object.tree);
                    }
                }
            }
            Blob::Resource(data) => println_pad!(
                "   {} {} {}",
                "•".bright_cyan(),
                key.bright_cyan().bold(),
                format!("(stream, {})", format_size(data.len() as u64)).dimmed()
            ),
        }
    }

    if args.trees {
        println_pad!("\n{}", "🧾 Object trees (JSON):".bright_magenta().bold());
        for (key, object) in package.objects() {
            println_pad!("{} #{}", key.bright_cyan(), object.path_id);
            println_pad!("{}", serde_json::to_string_pretty(&object.tree).into_diagnostic()?);
        }
    }

    Ok(())
}

fn print_texture(tree: &Node) {
    match TextureInfo::from_tree(tree) {
        Ok(info) => {
            let storage = match &info.stream {
                Some(stream) => format!(
                    "stream {} @ {} ({})",
                    stream.path,
                    stream.offset,
                    format_size(stream.size)
                ),
                None => "inline".to_string(),
            };
            println_pad!(
                "           {} {} {}",
                format!("{}x{}", info.width, info.height).bright_white(),
                format!("format {}", info.format).dimmed(),
                storage.dimmed()
            );
        }
        Err(error) => println_pad!("           {} {}", "⚠".bright_yellow(), error),
    }
}
