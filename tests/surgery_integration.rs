//! End-to-end mutation tests
//!
//! Every test drives a real file in a temp directory through [`Surgeon`]
//! and checks both the file on disk and the backup directory.

use file_surgery::{
    MatchStrategy, OperationState, Surgeon, SurgeryConfig, SurgeryOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup(name: &str, content: &str) -> (TempDir, Surgeon, PathBuf) {
    let dir = TempDir::new().unwrap();
    let surgeon =
        Surgeon::new(SurgeryConfig::default().with_backup_dir(dir.path().join("backups")));
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    (dir, surgeon, path)
}

fn backup_count(surgeon: &Surgeon) -> usize {
    surgeon.snapshots().list_snapshots(None).unwrap().len()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn replace_single_occurrence() {
    let (_dir, surgeon, path) = setup("app.py", "def old_name():\n    pass");

    let result = surgeon.replace(&path, "old_name", "new_name", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "def new_name():\n    pass");
    assert_eq!(result.state, OperationState::Committed);
    assert_eq!(result.replacements, 1);
    assert!(result.warnings.is_empty());
    assert!(result.snapshot.is_some());
    assert_eq!(backup_count(&surgeon), 1);
}

#[test]
fn insert_after_anchor_line() {
    let (_dir, surgeon, path) = setup("letters.txt", "a\nb\nc");

    let result = surgeon.insert_after(&path, "b", "x", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "a\nb\nx\nc");
}

#[test]
fn insert_before_takes_anchor_indentation() {
    let (_dir, surgeon, path) = setup(
        "app.py",
        "def f():\n    x = 1\n    return x\n",
    );

    let result = surgeon.insert_before(&path, "return x", "print(x)", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(
        read(&path),
        "def f():\n    x = 1\n    print(x)\n    return x\n"
    );
    assert!(result.validated);
}

#[test]
fn ambiguous_pattern_uses_first_and_warns() {
    let text = "foo = 1\nfoo = 2\nprint(foo)\n";
    let (_dir, surgeon, path) = setup("names.txt", text);

    let result = surgeon.replace(&path, "foo", "bar", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "bar = 1\nfoo = 2\nprint(foo)\n");
    assert_eq!(result.locations, vec!["1:1", "2:1", "3:7"]);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("occurs 3 times")));
    assert!(!result.suggestions.is_empty());
}

#[test]
fn occurrence_selects_one_match() {
    let text = "foo = 1\nfoo = 2\nprint(foo)\n";
    let (_dir, surgeon, path) = setup("names.txt", text);

    let options = SurgeryOptions::default().occurrence(2);
    let result = surgeon.replace(&path, "foo", "bar", &options);

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "foo = 1\nbar = 2\nprint(foo)\n");
}

#[test]
fn occurrence_out_of_range_leaves_file_and_backups_alone() {
    let text = "foo foo\n";
    let (_dir, surgeon, path) = setup("names.txt", text);

    for n in [0, 3] {
        let options = SurgeryOptions::default().occurrence(n);
        let result = surgeon.replace(&path, "foo", "bar", &options);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some("occurrence_out_of_range"));
        assert_eq!(result.state, OperationState::Failed);
    }
    assert_eq!(read(&path), text);
    assert_eq!(backup_count(&surgeon), 0);
}

#[test]
fn missing_pattern_reports_nearby_lines() {
    let (_dir, surgeon, path) = setup("app.py", "def compute_total():\n    pass\n");

    let result = surgeon.replace(&path, "compute_totl", "x", &SurgeryOptions::default());

    assert!(!result.success);
    assert_eq!(result.error_kind, Some("pattern_not_found"));
    assert!(result.suggestions.iter().any(|s| s.starts_with("line 1:")));
    assert_eq!(read(&path), "def compute_total():\n    pass\n");
    assert_eq!(backup_count(&surgeon), 0);
}

#[test]
fn syntax_breaking_edit_is_rolled_back() {
    let text = "def f():\n    return 1\n";
    let (_dir, surgeon, path) = setup("app.py", text);

    let result = surgeon.replace(&path, "return 1", "return (", &SurgeryOptions::default());

    assert!(!result.success);
    assert_eq!(result.state, OperationState::RolledBack);
    assert_eq!(result.error_kind, Some("post_write_validation_failed"));
    assert_eq!(fs::read(&path).unwrap(), text.as_bytes());
    assert_eq!(result.content.as_deref(), Some(text));
}

#[test]
fn replacing_with_same_text_writes_nothing() {
    let text = "value = 42\n";
    let (_dir, surgeon, path) = setup("cfg.txt", text);

    let first = surgeon.replace(&path, "42", "42", &SurgeryOptions::default());
    let second = surgeon.replace(&path, "42", "42", &SurgeryOptions::default());

    for result in [first, second] {
        assert!(result.success, "{}", result.message);
        assert_eq!(result.state, OperationState::Committed);
        assert!(result.snapshot.is_none());
    }
    assert_eq!(read(&path), text);
    assert_eq!(backup_count(&surgeon), 0);
}

#[test]
fn multi_line_self_replace_in_indented_block_is_a_no_op() {
    for name in ["lib.rs", "notes.txt"] {
        let text = "fn f() {\n    let a = 1;\n    let b = 2;\n}\n";
        let (_dir, surgeon, path) = setup(name, text);
        let block = "let a = 1;\n    let b = 2;";

        let result = surgeon.replace(&path, block, block, &SurgeryOptions::default());

        assert!(result.success, "{name}: {}", result.message);
        assert_eq!(result.content.as_deref(), Some(text), "{name}");
        assert_eq!(fs::read(&path).unwrap(), text.as_bytes(), "{name}");
        assert!(result.snapshot.is_none());
        assert_eq!(backup_count(&surgeon), 0);
    }
}

#[test]
fn multi_line_replacement_keeps_absolute_indentation() {
    let text = "fn f() {\n    let a = 1;\n    let b = 2;\n}\n";
    let (_dir, surgeon, path) = setup("lib.rs", text);

    let result = surgeon.replace(
        &path,
        "let a = 1;\n    let b = 2;",
        "let a = 10;\n    let b = 20;",
        &SurgeryOptions::default(),
    );

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "fn f() {\n    let a = 10;\n    let b = 20;\n}\n");
}

#[test]
fn crlf_file_keeps_crlf() {
    let (_dir, surgeon, path) = setup("win.txt", "a\r\nb\r\nc\r\n");

    let result = surgeon.insert_after(&path, "b", "x\ny", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "a\r\nb\r\nx\r\ny\r\nc\r\n");
}

#[test]
fn append_keeps_trailing_newline() {
    let (_dir, surgeon, path) = setup("notes.txt", "one\n");

    let result = surgeon.append(&path, "two", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "one\ntwo\n");
    assert_eq!(
        surgeon
            .snapshots()
            .list_snapshots(Some("notes.txt"))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn create_makes_parent_directories() {
    let dir = TempDir::new().unwrap();
    let surgeon =
        Surgeon::new(SurgeryConfig::default().with_backup_dir(dir.path().join("backups")));
    let path = dir.path().join("nested/deeper/new.txt");

    let result = surgeon.create(&path, "hello\n", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "hello\n");
    assert!(result.snapshot.is_none());

    let again = surgeon.create(&path, "other\n", &SurgeryOptions::default());
    assert!(!again.success);
    assert_eq!(again.error_kind, Some("file_exists"));
    assert_eq!(read(&path), "hello\n");

    let overwritten = surgeon.create(&path, "other\n", &SurgeryOptions::default().overwrite());
    assert!(overwritten.success, "{}", overwritten.message);
    assert_eq!(read(&path), "other\n");
    assert_eq!(backup_count(&surgeon), 1);
}

#[test]
fn failed_create_removes_the_directories_it_made() {
    let dir = TempDir::new().unwrap();
    let surgeon =
        Surgeon::new(SurgeryConfig::default().with_backup_dir(dir.path().join("backups")));
    let path = dir.path().join("fresh/inner/main.rs");

    let result = surgeon.create(&path, "fn broken(\n", &SurgeryOptions::default());

    assert!(!result.success);
    assert_eq!(result.state, OperationState::RolledBack);
    assert!(!path.exists());
    assert!(!dir.path().join("fresh").exists());
}

#[test]
fn snapshot_failure_aborts_before_writing() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let surgeon = Surgeon::new(SurgeryConfig::default().with_backup_dir(blocker.join("backups")));
    let path = dir.path().join("app.txt");
    fs::write(&path, "keep me\n").unwrap();

    let result = surgeon.replace(&path, "keep", "lose", &SurgeryOptions::default());

    assert!(!result.success);
    assert_eq!(result.error_kind, Some("snapshot_creation_failed"));
    assert_eq!(result.state, OperationState::Failed);
    assert_eq!(read(&path), "keep me\n");
}

#[test]
fn occurrence_choice_is_stable_across_runs() {
    let text = "foo = 1\nfoo = 2\nprint(foo)\n";
    let (_dir, surgeon, path) = setup("names.txt", text);
    let options = SurgeryOptions::default().occurrence(2).dry_run();

    let outputs: Vec<_> = (0..3)
        .map(|_| surgeon.replace(&path, "foo", "bar", &options))
        .map(|result| {
            assert!(result.success, "{}", result.message);
            assert_eq!(result.locations, vec!["1:1", "2:1", "3:7"]);
            result.content
        })
        .collect();

    assert_eq!(outputs[0].as_deref(), Some("foo = 1\nbar = 2\nprint(foo)\n"));
    assert!(outputs.iter().all(|o| *o == outputs[0]));
    assert_eq!(read(&path), text);
}

#[test]
fn multi_line_insert_after_nests_under_anchor() {
    let (_dir, surgeon, path) = setup("app.py", "def f():\n    x = 1\n    return x\n");

    let result = surgeon.insert_after(&path, "x = 1", "if x:\n    y = 2", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert_eq!(
        read(&path),
        "def f():\n    x = 1\n    if x:\n        y = 2\n    return x\n"
    );
    assert!(result.validated);
}

#[test]
fn dry_run_touches_nothing() {
    let text = "alpha beta\n";
    let (_dir, surgeon, path) = setup("words.txt", text);

    let options = SurgeryOptions::default().dry_run();
    let result = surgeon.replace(&path, "beta", "gamma", &options);

    assert!(result.success, "{}", result.message);
    assert!(result.dry_run);
    assert_eq!(result.content.as_deref(), Some("alpha gamma\n"));
    assert_eq!(read(&path), text);
    assert_eq!(backup_count(&surgeon), 0);
}

#[test]
fn replace_all_respects_max() {
    let (_dir, surgeon, path) = setup("names.txt", "foo foo foo\n");

    let options = SurgeryOptions::default().replace_all(Some(2));
    let result = surgeon.replace(&path, "foo", "bar", &options);

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "bar bar foo\n");
    assert_eq!(result.replacements, 2);
    assert!(!result.warnings.is_empty());
}

#[test]
fn regex_replacement_expands_captures() {
    let (_dir, surgeon, path) = setup("ver.txt", "version = 1.2\n");

    let options = SurgeryOptions::default().regex();
    let result = surgeon.replace(&path, r"(\d+)\.(\d+)", "$1.$2.0", &options);

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "version = 1.2.0\n");
    assert_eq!(result.strategy, Some(MatchStrategy::Regex));
}

#[test]
fn flexible_match_ignores_whitespace() {
    let (_dir, surgeon, path) = setup("calc.txt", "total  =   a +  b\n");

    let options = SurgeryOptions::default().flexible();
    let result = surgeon.replace(&path, "total = a + b", "total = a + b + c", &options);

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "total = a + b + c\n");
    assert_eq!(result.strategy, Some(MatchStrategy::Fuzzy));
}

#[test]
fn structural_replace_in_rust() {
    let (_dir, surgeon, path) = setup(
        "main.rs",
        "fn main() {\n    let v = opt.unwrap();\n}\n",
    );

    let options = SurgeryOptions::default().structural();
    let result = surgeon.replace(&path, "$X.unwrap()", "$X.expect(\"present\")", &options);

    assert!(result.success, "{}", result.message);
    assert_eq!(
        read(&path),
        "fn main() {\n    let v = opt.expect(\"present\");\n}\n"
    );
    assert_eq!(result.engine.as_deref(), Some("ast-grep"));
    assert_eq!(result.strategy, Some(MatchStrategy::Structural));
    assert!(result.validated);
}

#[test]
fn structural_on_unknown_language_falls_back_to_literal() {
    let (_dir, surgeon, path) = setup("notes.txt", "hello world\n");

    let options = SurgeryOptions::default().structural();
    let result = surgeon.replace(&path, "hello", "goodbye", &options);

    assert!(result.success, "{}", result.message);
    assert_eq!(read(&path), "goodbye world\n");
    assert_eq!(result.engine.as_deref(), Some("literal"));
    assert!(result.warnings.iter().any(|w| w.contains("falling back")));
}

#[test]
fn missing_file_fails_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let surgeon =
        Surgeon::new(SurgeryConfig::default().with_backup_dir(dir.path().join("backups")));
    let path = dir.path().join("absent.txt");

    let result = surgeon.append(&path, "x", &SurgeryOptions::default());

    assert!(!result.success);
    assert!(!path.exists());
}

#[test]
fn disabled_backups_are_removed_after_commit() {
    let dir = TempDir::new().unwrap();
    let mut config = SurgeryConfig::default().with_backup_dir(dir.path().join("backups"));
    config.retention.keep_backups = false;
    let surgeon = Surgeon::new(config);
    let path = dir.path().join("a.txt");
    fs::write(&path, "one\n").unwrap();

    let result = surgeon.replace(&path, "one", "two", &SurgeryOptions::default());

    assert!(result.success, "{}", result.message);
    assert!(result.snapshot.is_none());
    assert_eq!(backup_count(&surgeon), 0);
}

#[test]
fn result_serializes_to_json() {
    let (_dir, surgeon, path) = setup("a.txt", "one\n");

    let result = surgeon.replace(&path, "one", "two", &SurgeryOptions::default());
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["operation"], "replace");
    assert_eq!(json["state"], "committed");
    assert!(json.get("original").is_none());
}
