//! End-to-end flows driving the binary through init → keys → grade → results
//! inside a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sheetgrade(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("sheetgrade").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("SHEETGRADE_DATA_DIR")
        .env_remove("SHEETGRADE_OMR_URL")
        .env_remove("SHEETGRADE_VISION_KEY");
    cmd
}

#[test]
fn e2e_grade_and_results_flow() {
    let dir = TempDir::new().unwrap();

    sheetgrade(&dir).arg("init").assert().success();

    sheetgrade(&dir)
        .arg("keys")
        .arg("add")
        .arg("--file")
        .arg("answer-keys/example.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Stored answer key 'example-quiz' (5 questions)",
        ));

    // 1, 3 and 4 correct out of weights 10/10/10/20/10 -> 40/60.
    let assert = sheetgrade(&dir)
        .arg("grade")
        .arg("--key")
        .arg("example-quiz")
        .arg("--answers")
        .arg("A,X,C,D,")
        .arg("--save")
        .assert()
        .success()
        .stdout(predicate::str::contains("66.67"))
        .stdout(predicate::str::contains("Status: Passed"))
        .stderr(predicate::str::contains("Saved result "));

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    let record_id = stderr
        .lines()
        .find_map(|l| l.strip_prefix("Saved result "))
        .expect("save line present")
        .trim()
        .to_string();

    sheetgrade(&dir)
        .arg("results")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Quiz"))
        .stdout(predicate::str::contains("66.67%"))
        .stdout(predicate::str::contains("manual"))
        .stdout(predicate::str::contains("1 result(s), average 66.67%"));

    // Prefix lookup is enough to address the stored record.
    sheetgrade(&dir)
        .arg("results")
        .arg("show")
        .arg(&record_id[..8])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Quiz"))
        .stdout(predicate::str::contains("Status: Passed"));

    sheetgrade(&dir)
        .arg("results")
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared stored results."));

    sheetgrade(&dir)
        .arg("results")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored results."));
}

#[test]
fn e2e_text_extraction_feeds_grading() {
    let dir = TempDir::new().unwrap();

    sheetgrade(&dir).arg("init").assert().success();
    sheetgrade(&dir)
        .arg("keys")
        .arg("add")
        .arg("--file")
        .arg("answer-keys/example.toml")
        .assert()
        .success();

    // Question 2 carries a letter outside the sheet's alphabet and stays
    // unresolved, grading as a miss.
    std::fs::write(
        dir.path().join("sheet.txt"),
        "1. A\n2. X\n3) C\n4 - D\n5: E\n",
    )
    .unwrap();

    sheetgrade(&dir)
        .arg("grade")
        .arg("--key")
        .arg("example-quiz")
        .arg("--text")
        .arg("sheet.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains("83.33"))
        .stdout(predicate::str::contains("Correct: 4/5"))
        .stdout(predicate::str::contains("Status: Good - Passed"))
        .stderr(predicate::str::contains("Extracted 4/5 answers"));
}

#[test]
fn e2e_keys_lifecycle() {
    let dir = TempDir::new().unwrap();

    sheetgrade(&dir).arg("init").assert().success();

    sheetgrade(&dir)
        .arg("keys")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored answer keys."));

    sheetgrade(&dir)
        .arg("keys")
        .arg("add")
        .arg("--file")
        .arg("answer-keys/example.toml")
        .assert()
        .success();

    sheetgrade(&dir)
        .arg("keys")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Quiz"))
        .stdout(predicate::str::contains("1 key(s)"));

    sheetgrade(&dir)
        .arg("keys")
        .arg("show")
        .arg("example-quiz")
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Quiz (example-quiz)"))
        .stdout(predicate::str::contains("total weight 60.0"));

    sheetgrade(&dir)
        .arg("keys")
        .arg("delete")
        .arg("example-quiz")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted answer key 'example-quiz'"));

    sheetgrade(&dir)
        .arg("keys")
        .arg("delete")
        .arg("example-quiz")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no stored key"));
}
