//! Repository and knowledge-graph operations (spec.md §6):
//! `parse_github_repository`, `parse_github_repositories_batch`,
//! `check_ai_script_hallucinations`, `query_knowledge_graph`.

use crate::deps::Deps;
use ragsmith_common::{ClassDef, EngineError, HallucinationReport, MethodDef, ParseStats, Result};
use ragsmith_rag::codegraph::{acquire_repository, extract_repository};
use ragsmith_rag::hallucination::validate_script;
use ragsmith_storage::GraphStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

fn require_graph(deps: &Deps) -> Result<&Arc<GraphStore>> {
    deps.graph_store
        .as_ref()
        .ok_or_else(|| EngineError::GraphUnavailable("no property graph is configured".to_string()))
}

fn repo_name_from_url(repo_url: &str) -> String {
    repo_url
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or(repo_url)
        .to_string()
}

#[derive(Debug, Deserialize)]
pub struct ParseGithubRepositoryInput {
    pub repo_url: String,
}

/// `parse_github_repository`: shallow-clone, parse every source file with
/// `tree-sitter`, write symbols to the property graph (spec.md §4.10).
pub async fn parse_github_repository(deps: &Deps, input: ParseGithubRepositoryInput) -> Result<ParseStats> {
    let graph = require_graph(deps)?;
    let repo_name = repo_name_from_url(&input.repo_url);
    let dir = acquire_repository(&input.repo_url)?;
    let stats = extract_repository(graph, &repo_name, dir.path(), deps.config.tunables.max_retries).await?;
    Ok(stats)
}

#[derive(Debug, Deserialize)]
pub struct ParseGithubRepositoriesBatchInput {
    pub repo_urls: Vec<String>,
    pub max_concurrent: Option<usize>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PerRepoResult {
    pub repo_url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ParseStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParseGithubRepositoriesBatchOutput {
    pub results: Vec<PerRepoResult>,
    pub aggregate: ParseStats,
}

/// `parse_github_repositories_batch`: the same parse as
/// `parse_github_repository`, fanned out across repos under a concurrency
/// cap. A single repo failing does not abort the batch.
pub async fn parse_github_repositories_batch(
    deps: &Deps,
    input: ParseGithubRepositoriesBatchInput,
) -> Result<ParseGithubRepositoriesBatchOutput> {
    let graph = require_graph(deps)?.clone();
    let max_retries = input.max_retries.unwrap_or(deps.config.tunables.max_retries);
    let semaphore = Arc::new(Semaphore::new(input.max_concurrent.unwrap_or(deps.config.tunables.max_concurrent_crawls).max(1)));

    let tasks: Vec<_> = input
        .repo_urls
        .into_iter()
        .map(|repo_url| {
            let graph = graph.clone();
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let repo_name = repo_name_from_url(&repo_url);
                let outcome = async {
                    let dir = acquire_repository(&repo_url)?;
                    extract_repository(&graph, &repo_name, dir.path(), max_retries).await
                }
                .await;
                (repo_url, outcome)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(tasks.len());
    let mut aggregate = ParseStats::default();
    for task in tasks {
        let (repo_url, outcome) = task
            .await
            .map_err(|e| EngineError::Unknown(format!("repo parse task panicked: {e}")))?;
        match outcome {
            Ok(stats) => {
                aggregate += stats;
                results.push(PerRepoResult {
                    repo_url,
                    success: true,
                    stats: Some(stats),
                    error: None,
                });
            }
            Err(e) => results.push(PerRepoResult {
                repo_url,
                success: false,
                stats: None,
                error: Some(e.to_string()),
            }),
        }
    }

    Ok(ParseGithubRepositoriesBatchOutput { results, aggregate })
}

#[derive(Debug, Deserialize)]
pub struct CheckAiScriptHallucinationsInput {
    pub script_path: String,
}

/// `check_ai_script_hallucinations`: validate a Python script's symbol uses
/// against the property graph (spec.md §4.11).
pub async fn check_ai_script_hallucinations(deps: &Deps, input: CheckAiScriptHallucinationsInput) -> Result<HallucinationReport> {
    let graph = require_graph(deps)?;
    validate_script(graph, Path::new(&input.script_path)).await
}

#[derive(Debug, Deserialize)]
pub struct QueryKnowledgeGraphInput {
    pub command: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryKnowledgeGraphOutput {
    Repos { repositories: Vec<String> },
    Classes { classes: Vec<String> },
    Class { class: Option<ClassDef> },
    Methods { matches: Vec<MethodMatch> },
}

#[derive(Debug, Serialize)]
pub struct MethodMatch {
    pub class_name: String,
    pub method: MethodDef,
}

/// `query_knowledge_graph`: a tiny command language over the property graph
/// (spec.md §6) — `repos`, `explore <name>`, `classes <repo>`,
/// `method <name>`.
pub async fn query_knowledge_graph(deps: &Deps, input: QueryKnowledgeGraphInput) -> Result<QueryKnowledgeGraphOutput> {
    let graph = require_graph(deps)?;
    let mut parts = input.command.splitn(2, ' ');
    let verb = parts.next().unwrap_or("").trim();
    let arg = parts.next().unwrap_or("").trim();

    match verb {
        "repos" => Ok(QueryKnowledgeGraphOutput::Repos {
            repositories: graph.list_repositories().await?,
        }),
        "explore" => {
            if arg.is_empty() {
                return Err(EngineError::Validation("`explore` requires a class name".to_string()));
            }
            Ok(QueryKnowledgeGraphOutput::Class {
                class: graph.class_detail(arg).await?,
            })
        }
        "classes" => {
            if arg.is_empty() {
                return Err(EngineError::Validation("`classes` requires a repository name".to_string()));
            }
            Ok(QueryKnowledgeGraphOutput::Classes {
                classes: graph.list_classes(arg).await?,
            })
        }
        "method" => {
            if arg.is_empty() {
                return Err(EngineError::Validation("`method` requires a method name".to_string()));
            }
            let matches = graph
                .find_methods_by_name(arg)
                .await?
                .into_iter()
                .map(|(class_name, method)| MethodMatch { class_name, method })
                .collect();
            Ok(QueryKnowledgeGraphOutput::Methods { matches })
        }
        other => Err(EngineError::Validation(format!("unknown query_knowledge_graph command `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_name_strips_dot_git_suffix() {
        assert_eq!(repo_name_from_url("https://github.com/acme/widgets.git"), "widgets");
    }

    #[test]
    fn repo_name_handles_trailing_slash() {
        assert_eq!(repo_name_from_url("https://github.com/acme/widgets/"), "widgets");
    }
}
