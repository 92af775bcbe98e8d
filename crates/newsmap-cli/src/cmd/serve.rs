use std::path::Path;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = super::load_checked_config(root)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    println!(
        "Serving {} for '{}' on {}:{}",
        config.server.sitemap_path, config.publisher.name, config.server.bind, config.server.port
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(newsmap_server::serve(config, root))
}
