//! CLI surface tests: parsing and the dry-run path.

use imaginar::cli::{parse_args, run_command};

#[test]
fn test_dry_run_validates_and_exits() {
    let cli = parse_args(["imaginar", "dream", "a red cube", "--dry-run", "--quiet"]).unwrap();
    assert!(run_command(cli).is_ok());
}

#[test]
fn test_dry_run_rejects_bad_lr() {
    let cli = parse_args(["imaginar", "dream", "fire", "--lr=-0.5", "--dry-run", "--quiet"]).unwrap();
    let err = run_command(cli).unwrap_err();
    assert!(err.contains("E002"));
    assert!(err.contains("lr"));
}

#[test]
fn test_empty_phrase_reports_prompt_error() {
    let cli = parse_args(["imaginar", "dream", " | ", "--dry-run", "--quiet"]).unwrap();
    let err = run_command(cli).unwrap_err();
    assert!(err.contains("E001"));
}

#[test]
fn test_unknown_flag_rejected() {
    assert!(parse_args(["imaginar", "dream", "fire", "--banana"]).is_err());
}
