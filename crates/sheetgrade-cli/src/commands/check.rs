//! The `sheetgrade check` command.

use std::path::Path;

use anyhow::Result;

use sheetgrade_services::config::load_config_from;
use sheetgrade_services::omr::OmrClient;
use sheetgrade_storage::FileStore;

pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = load_config_from(config_path)?;

    println!("Data directory: {}", config.data_dir.display());
    let store = FileStore::new(&config.data_dir);
    println!(
        "  {} stored key(s), {} stored result(s)",
        store.list_answer_keys().len(),
        store.list_results().len()
    );

    match config.choice_set() {
        Ok(set) => println!("Choices: {set}"),
        Err(e) => println!("Choices: INVALID ({e:#})"),
    }

    let omr = OmrClient::new(&config.omr.base_url);
    if omr.health().await {
        println!("OMR service: running at {}", config.omr.base_url);
    } else {
        println!("OMR service: not reachable at {}", config.omr.base_url);
    }

    if config.vision.api_key.is_empty() {
        println!("Vision: no API key configured");
    } else {
        println!("Vision: key configured, model {}", config.vision.model);
    }

    Ok(())
}
