//! Code-graph extractor (spec.md §4.10): clone a repository, parse its
//! source files with `tree-sitter`, and write the resulting symbols to the
//! property graph as upserts keyed by `full_name`.

use ragsmith_common::{AttributeDef, ClassDef, EngineError, FunctionDef, MethodDef, ParseStats, RepoFile, Result};
use ragsmith_storage::GraphStore;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tree_sitter::{Language, Node, Parser};

const SKIPPED_DIR_NAMES: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "vendor",
    "venv",
    ".venv",
    "__pycache__",
    "dist",
    "build",
];

/// Contract for a per-language front end (spec.md §9 "duck-typed strategy
/// base" redesign note): a registry of these, matched by file extension.
pub trait SourceParser: Send + Sync {
    fn handles_extension(&self, ext: &str) -> bool;
    fn parse(&self, file_path: &str, source: &str) -> ParsedSymbols;
}

#[derive(Debug, Default, Clone)]
pub struct ParsedSymbols {
    pub imports: Vec<String>,
    pub classes: Vec<ClassDef>,
    pub functions: Vec<FunctionDef>,
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn child_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

fn parse_tree(language: Language, source: &str) -> Option<tree_sitter::Tree> {
    let mut parser = Parser::new();
    parser.set_language(&language).ok()?;
    parser.parse(source, None)
}

fn params_list(params_node: Option<Node>, source: &str) -> Vec<String> {
    let Some(params_node) = params_node else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params_node.walk();
    for child in params_node.named_children(&mut cursor) {
        out.push(node_text(child, source).to_string());
    }
    out
}

// -- Rust ---------------------------------------------------------------

pub struct RustParser;

impl SourceParser for RustParser {
    fn handles_extension(&self, ext: &str) -> bool {
        ext == "rs"
    }

    fn parse(&self, file_path: &str, source: &str) -> ParsedSymbols {
        let mut out = ParsedSymbols::default();
        let Some(tree) = parse_tree(tree_sitter_rust::LANGUAGE.into(), source) else {
            return out;
        };
        let root = tree.root_node();
        let mut cursor = root.walk();

        // First pass: struct_item defines classes and their attributes.
        for child in root.children(&mut cursor) {
            if child.kind() == "struct_item" {
                let Some(name) = child_text(child, "name", source) else { continue };
                let full_name = format!("{file_path}::{name}");
                let mut attributes = Vec::new();
                if let Some(body) = child.child_by_field_name("body") {
                    let mut field_cursor = body.walk();
                    for field in body.children(&mut field_cursor) {
                        if field.kind() == "field_declaration" {
                            if let Some(fname) = child_text(field, "name", source) {
                                attributes.push(AttributeDef {
                                    name: fname.to_string(),
                                    full_name: format!("{full_name}.{fname}"),
                                    attr_type: child_text(field, "type", source).map(str::to_string),
                                });
                            }
                        }
                    }
                }
                out.classes.push(ClassDef {
                    name: name.to_string(),
                    full_name,
                    methods: Vec::new(),
                    attributes,
                });
            }
        }

        // Second pass: impl_item attaches methods to the matching struct by
        // its Self type's leading identifier.
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() != "impl_item" {
                continue;
            }
            let Some(type_text) = child_text(child, "type", source) else { continue };
            let type_name = type_text.split(['<', ' ']).next().unwrap_or(type_text);
            let Some(class) = out.classes.iter_mut().find(|c| c.name == type_name) else { continue };
            let Some(body) = child.child_by_field_name("body") else { continue };
            let mut body_cursor = body.walk();
            for item in body.children(&mut body_cursor) {
                if item.kind() != "function_item" {
                    continue;
                }
                let Some(mname) = child_text(item, "name", source) else { continue };
                class.methods.push(MethodDef {
                    name: mname.to_string(),
                    full_name: format!("{}.{mname}", class.full_name),
                    params_list: params_list(item.child_by_field_name("parameters"), source),
                    return_type: child_text(item, "return_type", source).map(str::to_string),
                });
            }
        }

        // Third pass: top-level use declarations and free functions.
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "use_declaration" => out.imports.push(node_text(child, source).trim_end_matches(';').to_string()),
                "function_item" => {
                    let Some(name) = child_text(child, "name", source) else { continue };
                    out.functions.push(FunctionDef {
                        name: name.to_string(),
                        full_name: format!("{file_path}::{name}"),
                        params_list: params_list(child.child_by_field_name("parameters"), source),
                        return_type: child_text(child, "return_type", source).map(str::to_string),
                    });
                }
                _ => {}
            }
        }

        out
    }
}

// -- Python ---------------------------------------------------------------

pub struct PythonParser;

impl SourceParser for PythonParser {
    fn handles_extension(&self, ext: &str) -> bool {
        ext == "py"
    }

    fn parse(&self, file_path: &str, source: &str) -> ParsedSymbols {
        let mut out = ParsedSymbols::default();
        let Some(tree) = parse_tree(tree_sitter_python::LANGUAGE.into(), source) else {
            return out;
        };
        let root = tree.root_node();
        let mut cursor = root.walk();

        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_statement" | "import_from_statement" => {
                    out.imports.push(node_text(child, source).to_string())
                }
                "class_definition" => {
                    let Some(name) = child_text(child, "name", source) else { continue };
                    let full_name = format!("{file_path}::{name}");
                    let mut methods = Vec::new();
                    let mut attributes: Vec<AttributeDef> = Vec::new();
                    if let Some(body) = child.child_by_field_name("body") {
                        collect_python_methods(body, &full_name, source, &mut methods, &mut attributes);
                    }
                    out.classes.push(ClassDef {
                        name: name.to_string(),
                        full_name,
                        methods,
                        attributes,
                    });
                }
                _ => {}
            }
        }

        out
    }
}

fn collect_python_methods(
    body: Node,
    class_full_name: &str,
    source: &str,
    methods: &mut Vec<MethodDef>,
    attributes: &mut Vec<AttributeDef>,
) {
    let mut cursor = body.walk();
    for stmt in body.children(&mut cursor) {
        if stmt.kind() != "function_definition" {
            continue;
        }
        let Some(mname) = child_text(stmt, "name", source) else { continue };
        methods.push(MethodDef {
            name: mname.to_string(),
            full_name: format!("{class_full_name}.{mname}"),
            params_list: params_list(stmt.child_by_field_name("parameters"), source),
            return_type: child_text(stmt, "return_type", source).map(str::to_string),
        });
        if let Some(fn_body) = stmt.child_by_field_name("body") {
            scan_self_attributes(fn_body, class_full_name, source, attributes);
        }
    }
}

/// Best-effort scan for `self.<name> = ...` assignments inside a method
/// body, the closest Python equivalent to a typed field declaration.
fn scan_self_attributes(node: Node, class_full_name: &str, source: &str, attributes: &mut Vec<AttributeDef>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "assignment" {
            if let Some(lhs) = child.child_by_field_name("left") {
                if lhs.kind() == "attribute" {
                    let object = child_text(lhs, "object", source);
                    let attr = child_text(lhs, "attribute", source);
                    if object == Some("self") {
                        if let Some(attr) = attr {
                            let full_name = format!("{class_full_name}.{attr}");
                            if !attributes.iter().any(|a| a.full_name == full_name) {
                                attributes.push(AttributeDef {
                                    name: attr.to_string(),
                                    full_name,
                                    attr_type: None,
                                });
                            }
                        }
                    }
                }
            }
        }
        scan_self_attributes(child, class_full_name, source, attributes);
    }
}

// -- JavaScript / TypeScript ------------------------------------------------

pub struct JsParser {
    language: Language,
    extensions: &'static [&'static str],
}

impl JsParser {
    pub fn javascript() -> Self {
        JsParser {
            language: tree_sitter_javascript::LANGUAGE.into(),
            extensions: &["js", "jsx", "mjs"],
        }
    }

    pub fn typescript() -> Self {
        JsParser {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            extensions: &["ts"],
        }
    }

    pub fn tsx() -> Self {
        JsParser {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            extensions: &["tsx"],
        }
    }
}

impl SourceParser for JsParser {
    fn handles_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext)
    }

    fn parse(&self, file_path: &str, source: &str) -> ParsedSymbols {
        let mut out = ParsedSymbols::default();
        let Some(tree) = parse_tree(self.language.clone(), source) else {
            return out;
        };
        let root = tree.root_node();
        let mut cursor = root.walk();

        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_statement" => out.imports.push(node_text(child, source).to_string()),
                "function_declaration" => {
                    let Some(name) = child_text(child, "name", source) else { continue };
                    out.functions.push(FunctionDef {
                        name: name.to_string(),
                        full_name: format!("{file_path}::{name}"),
                        params_list: params_list(child.child_by_field_name("parameters"), source),
                        return_type: child_text(child, "return_type", source).map(str::to_string),
                    });
                }
                "class_declaration" => {
                    let Some(name) = child_text(child, "name", source) else { continue };
                    let full_name = format!("{file_path}::{name}");
                    let mut methods = Vec::new();
                    if let Some(body) = child.child_by_field_name("body") {
                        let mut body_cursor = body.walk();
                        for item in body.children(&mut body_cursor) {
                            if item.kind() != "method_definition" {
                                continue;
                            }
                            let Some(mname) = child_text(item, "name", source) else { continue };
                            methods.push(MethodDef {
                                name: mname.to_string(),
                                full_name: format!("{full_name}.{mname}"),
                                params_list: params_list(item.child_by_field_name("parameters"), source),
                                return_type: child_text(item, "return_type", source).map(str::to_string),
                            });
                        }
                    }
                    out.classes.push(ClassDef {
                        name: name.to_string(),
                        full_name,
                        methods,
                        attributes: Vec::new(),
                    });
                }
                _ => {}
            }
        }

        out
    }
}

// -- Repository acquisition + directory walk --------------------------------

/// Shallow-clones `repo_url` into a fresh tempdir (spec.md §4.10 step 1).
pub fn acquire_repository(repo_url: &str) -> Result<TempDir> {
    let dir = tempfile::tempdir().map_err(EngineError::Io)?;
    let mut fetch_opts = git2::FetchOptions::new();
    fetch_opts.depth(1);
    git2::build::RepoBuilder::new()
        .fetch_options(fetch_opts)
        .clone(repo_url, dir.path())
        .map_err(|e| EngineError::fetch(repo_url, e.to_string()))?;
    Ok(dir)
}

pub fn discover_source_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk_dir(root, &mut out);
    out
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let is_skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| SKIPPED_DIR_NAMES.contains(&n))
                .unwrap_or(false);
            if !is_skipped {
                walk_dir(&path, out);
            }
        } else {
            out.push(path);
        }
    }
}

pub fn parsers() -> Vec<Box<dyn SourceParser>> {
    vec![
        Box::new(RustParser),
        Box::new(PythonParser),
        Box::new(JsParser::javascript()),
        Box::new(JsParser::typescript()),
        Box::new(JsParser::tsx()),
    ]
}

fn parser_for<'a>(parsers: &'a [Box<dyn SourceParser>], path: &Path) -> Option<&'a dyn SourceParser> {
    let ext = path.extension()?.to_str()?;
    parsers.iter().map(|p| p.as_ref()).find(|p| p.handles_extension(ext))
}

/// Parse every source file under `repo_root` and write it to the graph in
/// per-file batches, upserting by `full_name` (spec.md §4.10 steps 2-4).
pub async fn extract_repository(
    graph: &GraphStore,
    repo_name: &str,
    repo_root: &Path,
    max_retries: u32,
) -> Result<ParseStats> {
    let parsers = parsers();
    let files = discover_source_files(repo_root);
    let mut stats = ParseStats::default();

    for path in files {
        let Some(parser) = parser_for(&parsers, &path) else { continue };
        let Ok(source) = std::fs::read_to_string(&path) else { continue };
        let rel_path = path
            .strip_prefix(repo_root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        let symbols = parser.parse(&rel_path, &source);

        let repo_file = RepoFile {
            path: rel_path,
            repo_name: repo_name.to_string(),
            imports: symbols.imports,
            classes: symbols.classes,
            functions: symbols.functions,
        };

        stats += write_with_retry(graph, &repo_file, max_retries).await?;
    }

    Ok(stats)
}

async fn write_with_retry(graph: &GraphStore, file: &RepoFile, max_retries: u32) -> Result<ParseStats> {
    let mut attempt = 0u32;
    loop {
        match graph.write_repo_file(file).await {
            Ok(stats) => return Ok(stats),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(path = %file.path, attempt, error = %e, "graph write failed, retrying");
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_parser_extracts_struct_impl_and_free_function() {
        let source = r#"
use std::collections::HashMap;

struct Agent {
    name: String,
}

impl Agent {
    fn run(&self) -> bool {
        true
    }
}

fn helper(x: i32) -> i32 {
    x
}
"#;
        let parsed = RustParser.parse("agent.rs", source);
        assert_eq!(parsed.imports.len(), 1);
        assert_eq!(parsed.classes.len(), 1);
        assert_eq!(parsed.classes[0].name, "Agent");
        assert_eq!(parsed.classes[0].methods.len(), 1);
        assert_eq!(parsed.classes[0].methods[0].name, "run");
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.functions[0].name, "helper");
    }

    #[test]
    fn python_parser_extracts_class_with_method_and_self_attribute() {
        let source = r#"
import os

class Agent:
    def __init__(self):
        self.name = "a"

    def run(self):
        return True
"#;
        let parsed = PythonParser.parse("agent.py", source);
        assert_eq!(parsed.imports.len(), 1);
        assert_eq!(parsed.classes.len(), 1);
        let class = &parsed.classes[0];
        assert_eq!(class.methods.len(), 2);
        assert!(class.attributes.iter().any(|a| a.name == "name"));
    }

    #[test]
    fn discover_source_files_skips_vendored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/lib.js"), "").unwrap();
        std::fs::write(dir.path().join("main.js"), "").unwrap();
        let files = discover_source_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.js"));
    }
}
