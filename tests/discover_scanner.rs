// tests/discover_scanner.rs
mod common;
use crate::common::init_tracing;

use std::fs;

use testdag::discover::{Scanner, unresolved_references};
use testdag::types::TestKey;

fn scanner() -> Scanner {
    Scanner::new(
        &["**/*.spec.*".to_string(), "**/*.test.*".to_string()],
        &["**/node_modules/**".to_string()],
    )
    .unwrap()
}

#[test]
fn annotations_attach_to_the_next_declaration() {
    init_tracing();

    let source = r#"
// @depends(create user)
test('update user', async () => {});

it("delete user", () => {});
"#;
    let tests = scanner().scan_source("users.spec.ts", source);

    assert_eq!(tests.len(), 2);
    assert_eq!(tests[0].key, TestKey::in_file("users.spec.ts", "update user"));
    assert_eq!(tests[0].deps.len(), 1);
    assert_eq!(tests[0].deps[0].raw, "create user");
    assert_eq!(tests[0].line, 3);

    assert_eq!(tests[1].key, TestKey::in_file("users.spec.ts", "delete user"));
    assert!(tests[1].deps.is_empty());
    assert_eq!(tests[1].line, 5);
}

#[test]
fn one_annotation_may_carry_several_references() {
    let source = r#"
// @depends(setup.spec.ts > create user, 'auth.spec.ts > login', "seed data")
test('edit profile', async () => {});
"#;
    let tests = scanner().scan_source("profile.spec.ts", source);

    assert_eq!(tests.len(), 1);
    let raws: Vec<&str> = tests[0].deps.iter().map(|d| d.raw.as_str()).collect();
    assert_eq!(
        raws,
        vec!["setup.spec.ts > create user", "auth.spec.ts > login", "seed data"]
    );
    assert_eq!(tests[0].deps[0].file.as_deref(), Some("setup.spec.ts"));
    assert_eq!(tests[0].deps[0].title, "create user");
}

#[test]
fn annotations_accumulate_across_lines() {
    let source = r#"
/* @depends(first) */
/* @depends(second) */
test('combined', () => {});
"#;
    let tests = scanner().scan_source("a.spec.ts", source);
    assert_eq!(tests.len(), 1);
    let raws: Vec<&str> = tests[0].deps.iter().map(|d| d.raw.as_str()).collect();
    assert_eq!(raws, vec!["first", "second"]);
}

#[test]
fn dangling_annotations_are_dropped() {
    init_tracing();

    let source = r#"
test('plain', () => {});
// @depends(orphaned)
"#;
    let tests = scanner().scan_source("a.spec.ts", source);
    assert_eq!(tests.len(), 1);
    assert!(tests[0].deps.is_empty());
}

#[test]
fn scan_dir_honors_include_and_exclude_globs() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::create_dir_all(root.join("specs")).unwrap();

    fs::write(
        root.join("specs/auth.spec.ts"),
        "// @depends(create user)\ntest('login', () => {});\n",
    )
    .unwrap();
    fs::write(
        root.join("specs/users.test.ts"),
        "test('create user', () => {});\n",
    )
    .unwrap();
    fs::write(root.join("specs/helpers.ts"), "test('not scanned', () => {});\n").unwrap();
    fs::write(
        root.join("node_modules/pkg/dep.spec.ts"),
        "test('vendored', () => {});\n",
    )
    .unwrap();

    let tests = scanner().scan_dir(root).unwrap();
    let keys: Vec<String> = tests.iter().map(|t| t.key.to_string()).collect();

    assert!(keys.contains(&"auth.spec.ts > login".to_string()));
    assert!(keys.contains(&"users.test.ts > create user".to_string()));
    assert!(!keys.iter().any(|k| k.contains("not scanned")));
    assert!(!keys.iter().any(|k| k.contains("vendored")));
}

#[test]
fn unresolved_references_reports_only_unknown_targets() {
    let source_setup = "test('create user', () => {});\n";
    let source_auth = r#"
// @depends(setup.spec.ts > create user)
test('login', () => {});
// @depends(login)
// @depends(ghost.spec.ts > missing)
test('logout', () => {});
"#;

    let scanner = scanner();
    let mut tests = scanner.scan_source("setup.spec.ts", source_setup);
    tests.extend(scanner.scan_source("auth.spec.ts", source_auth));

    let unresolved = unresolved_references(&tests);
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].contains("ghost.spec.ts > missing"));
    assert!(unresolved[0].contains("auth.spec.ts > logout"));
}
