//! CLI integration tests for jsonapi-transformer binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("jsonapi-transformer"))
}

// Helper to create a temp input file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const REGISTRY: &str = r#"{
    "routes": { "articles.show": "/articles/{article}" },
    "resources": {
        "articles": {
            "hide_properties": ["secret"],
            "id_properties": ["id"],
            "url_templates": [
                { "name": "self", "route": "articles.show", "params": { "article": "id" } }
            ],
            "relationships": { "author": { "resource": "people" } }
        },
        "people": {}
    }
}"#;

fn registry(dir: &TempDir) -> String {
    write_temp_file(dir, "registry.json", REGISTRY)
        .to_str()
        .unwrap()
        .to_string()
}

mod compile_command {
    use super::*;

    #[test]
    fn basic_compile() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(
            &dir,
            "article.json",
            r#"{ "id": 1, "title": "Hi", "secret": "x" }"#,
        );

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""jsonapi":"1.0""#))
            .stdout(predicate::str::contains(
                r#""data":{"type":"articles","id":1,"attributes":{"title":"Hi"}"#,
            ))
            .stdout(predicate::str::contains(r#""self":"/articles/1""#))
            .stdout(predicate::str::contains("secret").not());
    }

    #[test]
    fn compile_array_input() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(&dir, "articles.json", r#"[{ "id": 1 }, { "id": 2 }]"#);

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "-r",
                &registry,
                "-t",
                "articles",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""data":[{"type":"articles","id":1"#));
    }

    #[test]
    fn compile_with_pretty() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(&dir, "article.json", r#"{ "id": 1, "title": "Hi" }"#);

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
                "--pretty",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\n  \"data\": {"));
    }

    #[test]
    fn compile_to_output_file() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(&dir, "article.json", r#"{ "id": 1, "title": "Hi" }"#);
        let output = dir.path().join("out.json");

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["data"]["attributes"]["title"], "Hi");
    }

    #[test]
    fn compile_with_includes() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(
            &dir,
            "article.json",
            r#"{
                "attributes": { "id": 1, "title": "Hi" },
                "relations": { "author": { "attributes": { "id": 9, "name": "Ann" } } }
            }"#,
        );

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
                "--query",
                "includes=author",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""relationships":{"author":{"data":{"type":"people","id":9}}}"#,
            ))
            .stdout(predicate::str::contains(
                r#""included":[{"type":"people","id":9,"attributes":{"name":"Ann"}}]"#,
            ));
    }

    #[test]
    fn compile_with_sparse_fieldset() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(
            &dir,
            "article.json",
            r#"{ "id": 1, "title": "Hi", "body": "long" }"#,
        );

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
                "--query",
                "filter[articles]=title",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""attributes":{"title":"Hi"}"#));
    }

    #[test]
    fn compile_paginated() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let articles: Vec<String> = (1..=25).map(|i| format!(r#"{{ "id": {} }}"#, i)).collect();
        let input = write_temp_file(&dir, "articles.json", &format!("[{}]", articles.join(",")));

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
                "--paginate",
                "--base-url",
                "/articles",
                "--query",
                "page[number]=2&page[size]=10",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""prev":"/articles?page[number]=1&page[size]=10""#,
            ))
            .stdout(predicate::str::contains(
                r#""next":"/articles?page[number]=3&page[size]=10""#,
            ))
            .stdout(predicate::str::contains(
                r#""meta":{"total-pages":3,"page-size":10,"currentPage":2}"#,
            ));
    }

    #[test]
    fn compile_camelized_with_debug_timings() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(&dir, "article.json", r#"{ "id": 1, "view_count": 3 }"#);

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
                "--camelize",
                "--debug-timings",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""viewCount":3"#))
            .stdout(predicate::str::contains(r#""fullTransform":"#));
    }

    #[test]
    fn unknown_resource_type() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(&dir, "article.json", r#"{ "id": 1 }"#);

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "ghosts",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown resource type 'ghosts'"));
    }

    #[test]
    fn input_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        cmd()
            .args([
                "compile",
                "/nonexistent/article.json",
                "--registry",
                &registry,
                "--type",
                "articles",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_model_input() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let input = write_temp_file(&dir, "articles.json", "[1, 2]");

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                &registry,
                "--type",
                "articles",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Error"));
    }

    #[test]
    fn invalid_registry() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", r#"{ "resources": 5 }"#);
        let input = write_temp_file(&dir, "article.json", r#"{ "id": 1 }"#);

        cmd()
            .args([
                "compile",
                input.to_str().unwrap(),
                "--registry",
                registry.to_str().unwrap(),
                "--type",
                "articles",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Error loading registry"));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn check_valid_registry() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        cmd()
            .args(["check", &registry])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files checked, all passed"));
    }

    #[test]
    fn check_unknown_relationship_fails() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(
            &dir,
            "registry.json",
            r#"{ "resources": { "articles": {
                "relationships": { "author": { "resource": "ghosts" } }
            } } }"#,
        );

        cmd()
            .args(["check", registry.to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E002"));
    }

    #[test]
    fn check_json_format() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        cmd()
            .args(["check", &registry, "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""files_checked": 1"#));
    }

    #[test]
    fn check_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "a.json", REGISTRY);
        write_temp_file(&dir, "b.json", REGISTRY);

        cmd()
            .args(["check", dir.path().to_str().unwrap(), "--quiet"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 files checked, all passed"));
    }

    #[test]
    fn check_strict_fails_on_warnings() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(
            &dir,
            "registry.json",
            r#"{ "resources": {
                "articles": {},
                "posts": { "alias": "articles" }
            } }"#,
        );

        cmd()
            .args(["check", registry.to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["check", registry.to_str().unwrap(), "--strict"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("W003"));
    }

    #[test]
    fn check_missing_path() {
        cmd()
            .args(["check", "/nonexistent/registry.json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}
