use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::layout::CONFIG_FILE;
use crate::io::store_io;

/// Infer a store name from a directory name: hyphens and underscores become
/// spaces, words are title-cased.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn cmd_init(args: InitArgs, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if root.join(CONFIG_FILE).is_file() && !args.force {
        return Err(format!(
            "a lister store already exists at {} (use --force to rewrite {})",
            root.display(),
            CONFIG_FILE
        )
        .into());
    }

    if let Some(parent) = root.parent()
        && let Ok(parent_root) = store_io::discover_store(parent)
    {
        eprintln!("Note: enclosing store found at {}", parent_root.display());
        eprintln!("Creating a separate store in {}", root.display());
    }

    let name = args.name.unwrap_or_else(|| {
        root.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    store_io::init_store(root, &name, args.force)?;
    println!("Initialized lister store: {}", name);
    Ok(())
}
