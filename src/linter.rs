//! Registry checking - static analysis of descriptor registry files.
//!
//! Checks registry files for:
//! - JSON syntax errors and schema violations (E001)
//! - Relationships naming unknown descriptors (E002)
//! - Link templates naming undeclared routes (E003)
//! - Aliased properties that are also hidden (W001)
//! - Link bindings reading hidden attributes (W002)
//! - Descriptors sharing one alias (W003)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::loader::{load_json, registry_from_value, RegistryFile};
use crate::validator::registry_issues;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from checking.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/resources/articles/alias")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, file: &Path, path: String, message: String) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            file: file.to_path_buf(),
            path,
            message,
        }
    }

    fn warning(code: &str, file: &Path, path: String, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, file, path, message)
        }
    }
}

/// Result of checking a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a checked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of checking a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl CheckResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Check a registry file or a directory of them.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
pub fn check(path: &Path, strict: bool) -> CheckResult {
    let files = collect_registry_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| check_file(file, path)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    CheckResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Check a single registry file.
pub fn check_file(file: &Path, base_path: &Path) -> FileResult {
    let diagnostics = file_diagnostics(file);

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Warning
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

fn file_diagnostics(file: &Path) -> Vec<Diagnostic> {
    let syntax_error =
        |message: String| vec![Diagnostic::error("E001", file, "/".to_string(), message)];

    let value = match load_json(file) {
        Ok(value) => value,
        Err(e) => return syntax_error(format!("syntax error: {}", e)),
    };

    match registry_issues(&value) {
        Ok(issues) if !issues.is_empty() => {
            return issues
                .into_iter()
                .map(|issue| Diagnostic::error("E001", file, issue.path, issue.message))
                .collect();
        }
        Ok(_) => {}
        Err(e) => return syntax_error(e.to_string()),
    }

    match registry_from_value(value) {
        Ok(loaded) => check_registry(&loaded, file),
        Err(e) => syntax_error(e.to_string()),
    }
}

/// Cross-reference checks over a loaded registry.
pub fn check_registry(loaded: &RegistryFile, file: &Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let registry = &loaded.registry;
    let mut aliases: HashMap<&str, &str> = HashMap::new();

    for name in registry.names() {
        let Some(descriptor) = registry.get(name) else {
            continue;
        };

        for (relation, def) in &descriptor.relationships {
            if !registry.contains(def.resource.name()) {
                diagnostics.push(Diagnostic::error(
                    "E002",
                    file,
                    pointer(&[
                        "resources",
                        name,
                        "relationships",
                        relation.as_str(),
                        "resource",
                    ]),
                    format!("unknown descriptor \"{}\"", def.resource.name()),
                ));
            }
        }

        for (i, template) in descriptor.url_templates.iter().enumerate() {
            let index = i.to_string();
            let index = index.as_str();
            if !loaded.routes.is_empty() && !loaded.routes.contains(&template.route) {
                diagnostics.push(Diagnostic::error(
                    "E003",
                    file,
                    pointer(&["resources", name, "url_templates", index, "route"]),
                    format!("unknown route \"{}\"", template.route),
                ));
            }
            for (param, attribute) in &template.params {
                if descriptor.is_hidden(attribute) {
                    diagnostics.push(Diagnostic::warning(
                        "W002",
                        file,
                        pointer(&[
                            "resources",
                            name,
                            "url_templates",
                            index,
                            "params",
                            param.as_str(),
                        ]),
                        format!("link binding reads hidden attribute \"{}\"", attribute),
                    ));
                }
            }
        }

        for source in descriptor.aliased_properties.keys() {
            if descriptor.is_hidden(source) {
                diagnostics.push(Diagnostic::warning(
                    "W001",
                    file,
                    pointer(&["resources", name, "aliased_properties", source.as_str()]),
                    format!("aliased property \"{}\" is also hidden", source),
                ));
            }
        }

        match aliases.get(descriptor.alias.as_str()) {
            Some(first) => diagnostics.push(Diagnostic::warning(
                "W003",
                file,
                pointer(&["resources", name, "alias"]),
                format!(
                    "alias \"{}\" is already used by \"{}\"",
                    descriptor.alias, first
                ),
            )),
            None => {
                aliases.insert(descriptor.alias.as_str(), name);
            }
        }
    }

    diagnostics
}

/// JSON Pointer (RFC 6901) from unescaped segments.
fn pointer(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Collect all .json files in a path (file or directory).
fn collect_registry_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
