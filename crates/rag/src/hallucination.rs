//! Hallucination validator (spec.md §4.11): parses a Python script, collects
//! every symbol use, and checks each against the property graph produced by
//! the code-graph extractor.

use ragsmith_common::{Result, SymbolUseKind, SymbolUseReport, UseValidity};
use ragsmith_storage::GraphStore;
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone)]
struct RawUse {
    kind: SymbolUseKind,
    symbol: String,
    context: String,
    class_hint: Option<String>,
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn is_uppercase_start(s: &str) -> bool {
    s.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

fn parse(source: &str) -> Option<tree_sitter::Tree> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_python::LANGUAGE.into()).ok()?;
    parser.parse(source, None)
}

/// Pass 1: track `identifier = ClassName(...)` assignments so later method
/// and attribute accesses can be attributed to a class.
fn collect_class_bindings(node: Node, source: &str, bindings: &mut HashMap<String, String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "assignment" {
            if let (Some(left), Some(right)) = (child.child_by_field_name("left"), child.child_by_field_name("right")) {
                if left.kind() == "identifier" && right.kind() == "call" {
                    if let Some(func) = right.child_by_field_name("function") {
                        if func.kind() == "identifier" {
                            let class_name = node_text(func, source);
                            if is_uppercase_start(class_name) {
                                bindings.insert(node_text(left, source).to_string(), class_name.to_string());
                            }
                        }
                    }
                }
            }
        }
        collect_class_bindings(child, source, bindings);
    }
}

/// Pass 2: collect every import, instantiation, call, and attribute access.
fn collect_uses(node: Node, source: &str, bindings: &HashMap<String, String>, out: &mut Vec<RawUse>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_statement" | "import_from_statement" => out.push(RawUse {
                kind: SymbolUseKind::Import,
                symbol: node_text(child, source).to_string(),
                context: node_text(child, source).to_string(),
                class_hint: None,
            }),
            "call" => {
                if let Some(func) = child.child_by_field_name("function") {
                    match func.kind() {
                        "attribute" => {
                            let object = func.child_by_field_name("object");
                            let attr = func.child_by_field_name("attribute");
                            if let (Some(object), Some(attr)) = (object, attr) {
                                let object_text = node_text(object, source);
                                let attr_text = node_text(attr, source);
                                let class_hint = if object.kind() == "call" {
                                    object
                                        .child_by_field_name("function")
                                        .map(|f| node_text(f, source).to_string())
                                        .filter(|n| is_uppercase_start(n))
                                } else {
                                    bindings.get(object_text).cloned()
                                };
                                out.push(RawUse {
                                    kind: SymbolUseKind::MethodCall,
                                    symbol: format!("{object_text}.{attr_text}"),
                                    context: node_text(child, source).to_string(),
                                    class_hint,
                                });
                            }
                        }
                        "identifier" => {
                            let name = node_text(func, source);
                            if is_uppercase_start(name) {
                                out.push(RawUse {
                                    kind: SymbolUseKind::ClassInstantiation,
                                    symbol: name.to_string(),
                                    context: node_text(child, source).to_string(),
                                    class_hint: Some(name.to_string()),
                                });
                            } else {
                                out.push(RawUse {
                                    kind: SymbolUseKind::FunctionCall,
                                    symbol: name.to_string(),
                                    context: node_text(child, source).to_string(),
                                    class_hint: None,
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
            "attribute" => {
                let is_call_target = child
                    .parent()
                    .map(|p| p.kind() == "call" && p.child_by_field_name("function") == Some(child))
                    .unwrap_or(false);
                if !is_call_target {
                    if let (Some(object), Some(attr)) =
                        (child.child_by_field_name("object"), child.child_by_field_name("attribute"))
                    {
                        let object_text = node_text(object, source);
                        if let Some(class_hint) = bindings.get(object_text) {
                            out.push(RawUse {
                                kind: SymbolUseKind::AttributeAccess,
                                symbol: format!("{object_text}.{}", node_text(attr, source)),
                                context: node_text(child, source).to_string(),
                                class_hint: Some(class_hint.clone()),
                            });
                        }
                    }
                }
            }
            _ => {}
        }
        collect_uses(child, source, bindings, out);
    }
}

async fn classify(graph: &GraphStore, raw: &RawUse) -> Result<(UseValidity, String)> {
    match raw.kind {
        SymbolUseKind::Import => Ok((
            UseValidity::Uncertain,
            "import targets are not resolved against the parsed-repository graph".to_string(),
        )),
        SymbolUseKind::ClassInstantiation => {
            if graph.class_exists(&raw.symbol).await? {
                Ok((UseValidity::Valid, "class found in graph".to_string()))
            } else {
                Ok((
                    UseValidity::Invalid,
                    "no such class in the parsed repository graph".to_string(),
                ))
            }
        }
        SymbolUseKind::FunctionCall => {
            if graph.function_exists(&raw.symbol).await? {
                Ok((UseValidity::Valid, "function found in graph".to_string()))
            } else {
                Ok((
                    UseValidity::Invalid,
                    "no such function in the parsed repository graph".to_string(),
                ))
            }
        }
        SymbolUseKind::MethodCall => {
            let Some(class_name) = &raw.class_hint else {
                return Ok((
                    UseValidity::Uncertain,
                    "target object's class could not be determined statically".to_string(),
                ));
            };
            let method_name = raw.symbol.rsplit('.').next().unwrap_or(&raw.symbol);
            if graph.find_method(class_name, method_name).await?.is_some() {
                Ok((UseValidity::Valid, "method found on class".to_string()))
            } else if graph.class_exists(class_name).await? {
                Ok((UseValidity::Invalid, format!("no method `{method_name}` on class `{class_name}`")))
            } else {
                Ok((
                    UseValidity::Uncertain,
                    format!("class `{class_name}` not found in graph"),
                ))
            }
        }
        SymbolUseKind::AttributeAccess => {
            let Some(class_name) = &raw.class_hint else {
                return Ok((
                    UseValidity::Uncertain,
                    "target object's class could not be determined statically".to_string(),
                ));
            };
            let attr_name = raw.symbol.rsplit('.').next().unwrap_or(&raw.symbol);
            if graph.find_attribute(class_name, attr_name).await?.is_some() {
                Ok((UseValidity::Valid, "attribute found on class".to_string()))
            } else if graph.class_exists(class_name).await? {
                Ok((
                    UseValidity::Invalid,
                    format!("no attribute `{attr_name}` on class `{class_name}`"),
                ))
            } else {
                Ok((
                    UseValidity::Uncertain,
                    format!("class `{class_name}` not found in graph"),
                ))
            }
        }
    }
}

pub async fn validate_script(graph: &GraphStore, script_path: &Path) -> Result<ragsmith_common::HallucinationReport> {
    let source = std::fs::read_to_string(script_path).map_err(ragsmith_common::EngineError::Io)?;
    let raw_uses = collect_raw_uses(&source);

    let mut reports = Vec::with_capacity(raw_uses.len());
    for raw in raw_uses {
        let (validity, reason) = classify(graph, &raw).await?;
        reports.push(SymbolUseReport {
            kind: raw.kind,
            symbol: raw.symbol,
            context: raw.context,
            validity,
            reason,
        });
    }
    Ok(ragsmith_common::HallucinationReport::from_uses(reports))
}

fn collect_raw_uses(source: &str) -> Vec<RawUse> {
    let Some(tree) = parse(source) else { return Vec::new() };
    let root = tree.root_node();
    let mut bindings = HashMap::new();
    collect_class_bindings(root, source, &mut bindings);
    let mut uses = Vec::new();
    collect_uses(root, source, &bindings, &mut uses);
    uses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_instantiation_and_method_call_with_resolved_class() {
        let source = "agent = Agent()\nagent.run()\nagent.nonexistent()\n";
        let uses = collect_raw_uses(source);
        assert!(uses.iter().any(|u| u.kind == SymbolUseKind::ClassInstantiation && u.symbol == "Agent"));
        let method_calls: Vec<&RawUse> = uses.iter().filter(|u| u.kind == SymbolUseKind::MethodCall).collect();
        assert_eq!(method_calls.len(), 2);
        assert!(method_calls.iter().all(|u| u.class_hint.as_deref() == Some("Agent")));
    }

    #[test]
    fn method_call_on_unresolved_object_has_no_class_hint() {
        let source = "result = external_factory()\nresult.process()\n";
        let uses = collect_raw_uses(source);
        let call = uses.iter().find(|u| u.kind == SymbolUseKind::MethodCall).unwrap();
        assert!(call.class_hint.is_none());
    }

    #[test]
    fn plain_lowercase_call_is_a_function_call() {
        let source = "helper(1, 2)\n";
        let uses = collect_raw_uses(source);
        assert!(uses.iter().any(|u| u.kind == SymbolUseKind::FunctionCall && u.symbol == "helper"));
    }
}
