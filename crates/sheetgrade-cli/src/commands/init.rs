//! The `sheetgrade init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create sheetgrade.toml
    if std::path::Path::new("sheetgrade.toml").exists() {
        println!("sheetgrade.toml already exists, skipping.");
    } else {
        std::fs::write("sheetgrade.toml", SAMPLE_CONFIG)?;
        println!("Created sheetgrade.toml");
    }

    // Create example answer key
    std::fs::create_dir_all("answer-keys")?;
    let example_path = std::path::Path::new("answer-keys/example.toml");
    if example_path.exists() {
        println!("answer-keys/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_KEY)?;
        println!("Created answer-keys/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit sheetgrade.toml if you use the OMR service or AI vision");
    println!("  2. Run: sheetgrade keys add --file answer-keys/example.toml");
    println!("  3. Run: sheetgrade grade --key example-quiz --answers \"A,B,C,D,E\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# sheetgrade configuration

data_dir = "./sheetgrade-data"
choices = "ABCDE"

[omr]
base_url = "http://localhost:8000"
timeout_secs = 30

[vision]
api_key = "${GEMINI_API_KEY}"
model = "gemini-2.0-flash-lite"
"#;

const EXAMPLE_KEY: &str = r#"[answer_key]
id = "example-quiz"
name = "Example Quiz"
min_passing_score = 60.0

[[questions]]
number = 1
correct = "A"
weight = 10.0

[[questions]]
number = 2
correct = "B"
weight = 10.0

[[questions]]
number = 3
correct = "C"
weight = 10.0

[[questions]]
number = 4
correct = "D"
weight = 20.0

[[questions]]
number = 5
correct = "E"
"#;
