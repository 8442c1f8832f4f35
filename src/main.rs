use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use finder_enhance::{config, logging, runtime};

#[derive(Parser)]
#[command(name = "finder-enhance")]
#[command(about = "Space-bar folder/archive preview and cut/paste for Finder", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.finder-enhance/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Write a config file with every default filled in, then exit
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let loaded = config::load_config_from(&config_path);

    if cli.print_config {
        let json = serde_json::to_string_pretty(&loaded.resolved())
            .context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(());
    }

    if cli.write_default_config {
        config::Config::default()
            .resolved()
            .save_to(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    logging::log(
        "APP",
        &format!(
            "Loaded config from {}: preview={}, cut={}, paste={}",
            config_path.display(),
            loaded.get_preview_hotkey().to_shortcut_string(),
            loaded.get_cut_hotkey().to_shortcut_string(),
            loaded.get_paste_hotkey().to_shortcut_string(),
        ),
    );

    runtime::run(loaded, config_path)
}
