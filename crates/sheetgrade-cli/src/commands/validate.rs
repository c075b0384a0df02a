//! The `sheetgrade validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(path: PathBuf) -> Result<()> {
    let keys = if path.is_dir() {
        sheetgrade_core::keyfile::load_key_directory(&path)?
    } else {
        vec![sheetgrade_core::keyfile::parse_answer_key(&path)?]
    };

    let mut total_warnings = 0;

    for key in &keys {
        println!(
            "Answer key: {} ({} questions)",
            key.name,
            key.question_count()
        );

        let warnings = sheetgrade_core::keyfile::validate_answer_key(key);
        for w in &warnings {
            let prefix = w
                .question
                .map(|q| format!("  [q{q}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All answer keys valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
