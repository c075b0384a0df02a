//! The `sheetgrade keys` subcommands.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use sheetgrade_core::keyfile::{parse_answer_key, validate_answer_key};
use sheetgrade_services::config::load_config_from;
use sheetgrade_storage::FileStore;

use crate::KeysAction;

pub fn execute(config_path: Option<&Path>, action: KeysAction) -> Result<()> {
    let config = load_config_from(config_path)?;
    let store = FileStore::new(&config.data_dir);

    match action {
        KeysAction::List => list(&store),
        KeysAction::Add { file } => add(&store, &file),
        KeysAction::Show { id } => show(&store, &id),
        KeysAction::Delete { id } => delete(&store, &id),
    }
}

fn list(store: &FileStore) -> Result<()> {
    let keys = store.list_answer_keys();
    if keys.is_empty() {
        println!("No stored answer keys.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Questions", "Pass %", "Updated"]);
    for key in &keys {
        let updated = key
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            key.id.clone(),
            key.name.clone(),
            key.question_count().to_string(),
            format!("{:.0}", key.min_passing_score),
            updated,
        ]);
    }
    println!("{table}");
    println!("\n{} key(s)", keys.len());
    Ok(())
}

fn add(store: &FileStore, file: &Path) -> Result<()> {
    let key = parse_answer_key(file)?;

    let warnings = validate_answer_key(&key);
    for w in &warnings {
        let prefix = w
            .question
            .map(|q| format!("  [q{q}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if store.save_answer_key(&key) {
        println!(
            "Stored answer key '{}' ({} questions)",
            key.id,
            key.question_count()
        );
        Ok(())
    } else {
        anyhow::bail!("failed to store answer key '{}'", key.id)
    }
}

fn show(store: &FileStore, id: &str) -> Result<()> {
    let key = store
        .answer_key(id)
        .ok_or_else(|| anyhow::anyhow!("no stored key with id '{id}'"))?;

    println!("{} ({})", key.name, key.id);
    println!(
        "Questions: {}, total weight {:.1}, pass at {:.0}%",
        key.question_count(),
        key.total_weight(),
        key.min_passing_score
    );
    println!();

    let mut table = Table::new();
    table.set_header(vec!["#", "Answer", "Weight"]);
    for q in &key.questions {
        table.add_row(vec![
            q.number.to_string(),
            q.correct_answer.to_string(),
            format!("{:.1}", q.weight),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn delete(store: &FileStore, id: &str) -> Result<()> {
    // The store treats deleting an unknown id as success; the command is
    // stricter so typos are visible.
    anyhow::ensure!(
        store.answer_key(id).is_some(),
        "no stored key with id '{id}'"
    );
    if store.delete_answer_key(id) {
        println!("Deleted answer key '{id}'");
        Ok(())
    } else {
        anyhow::bail!("failed to delete answer key '{id}'")
    }
}
