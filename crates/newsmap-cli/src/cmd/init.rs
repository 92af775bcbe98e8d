use anyhow::Context;
use newsmap_core::{config::Config, io, paths, source::SqliteContentSource};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>, language: Option<&str>) -> anyhow::Result<()> {
    println!("Initializing newsmap in: {}", root.display());

    let dir = paths::newsmap_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to read config.yaml")?
    } else {
        let publisher = name.map(str::to_string).unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "My News Site".to_string())
        });
        let mut cfg = Config::new(publisher);
        if let Some(lang) = language {
            cfg.publisher.language = lang.to_string();
        }
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        cfg
    };

    let db_path = config.database_path(root);
    let existed = db_path.exists();
    SqliteContentSource::create(&db_path)
        .with_context(|| format!("failed to prepare {}", db_path.display()))?;
    let shown = db_path.strip_prefix(root).unwrap_or(&db_path).display();
    if existed {
        println!("  exists:  {shown}");
    } else {
        println!("  created: {shown}");
    }

    println!(
        "\nPublisher: {} ({})",
        config.publisher.name, config.publisher.language
    );
    println!("Next: `newsmap article add` to add content, then `newsmap build` or `newsmap serve`.");
    Ok(())
}
