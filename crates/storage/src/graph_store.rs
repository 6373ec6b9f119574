//! Property-graph store (spec.md §3, §4.10, §4.12): Neo4j via the Bolt
//! protocol. Every write here is an upsert keyed by `full_name` or
//! `(name, type)`, per spec.md §3's "Lifecycle" rules.

use neo4rs::{query, Graph};
use ragsmith_common::{
    AttributeDef, ClassDef, Entity, EntityNeighbor, EntityType, FunctionDef, MethodDef, ParseStats, RepoFile,
};
use ragsmith_common::{EngineError, Result};

pub struct GraphStore {
    graph: Graph,
}

impl GraphStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| EngineError::GraphUnavailable(e.to_string()))?;
        Ok(GraphStore { graph })
    }

    async fn run(&self, q: neo4rs::Query) -> Result<()> {
        self.graph
            .run(q)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    // -- code graph --------------------------------------------------------

    /// Write one file's parsed symbols (imports, classes, functions) to the
    /// graph as a single batch, upserting every node by its key. Returns the
    /// counts created for this file (spec.md §4.10 step 5).
    pub async fn write_repo_file(&self, file: &RepoFile) -> Result<ParseStats> {
        self.run(
            query("MERGE (r:Repository {name: $repo}) MERGE (f:File {path: $path, repo_name: $repo})")
                .param("repo", file.repo_name.clone())
                .param("path", file.path.clone()),
        )
        .await?;

        for import in &file.imports {
            self.run(
                query(
                    "MATCH (f:File {path: $path, repo_name: $repo}) \
                     MERGE (f)-[:IMPORTS]->(:Import {name: $name})",
                )
                .param("path", file.path.clone())
                .param("repo", file.repo_name.clone())
                .param("name", import.clone()),
            )
            .await?;
        }

        let mut stats = ParseStats {
            files_processed: 1,
            ..Default::default()
        };

        for class in &file.classes {
            self.upsert_class(&file.path, &file.repo_name, class).await?;
            stats.classes_created += 1;
            stats.methods_created += class.methods.len();
            stats.attributes_created += class.attributes.len();
        }
        for func in &file.functions {
            self.upsert_function(&file.path, &file.repo_name, func).await?;
            stats.functions_created += 1;
        }

        Ok(stats)
    }

    async fn upsert_class(&self, file_path: &str, repo_name: &str, class: &ClassDef) -> Result<()> {
        self.run(
            query(
                "MATCH (f:File {path: $path, repo_name: $repo}) \
                 MERGE (c:Class {full_name: $full_name}) SET c.name = $name \
                 MERGE (f)-[:DEFINES]->(c)",
            )
            .param("path", file_path.to_string())
            .param("repo", repo_name.to_string())
            .param("full_name", class.full_name.clone())
            .param("name", class.name.clone()),
        )
        .await?;

        for method in &class.methods {
            self.run(
                query(
                    "MATCH (c:Class {full_name: $class_full_name}) \
                     MERGE (m:Method {full_name: $full_name}) \
                     SET m.name = $name, m.params_list = $params, m.return_type = $return_type \
                     MERGE (c)-[:HAS_METHOD]->(m)",
                )
                .param("class_full_name", class.full_name.clone())
                .param("full_name", method.full_name.clone())
                .param("name", method.name.clone())
                .param("params", method.params_list.clone())
                .param("return_type", method.return_type.clone().unwrap_or_default()),
            )
            .await?;
        }

        for attr in &class.attributes {
            self.run(
                query(
                    "MATCH (c:Class {full_name: $class_full_name}) \
                     MERGE (a:Attribute {full_name: $full_name}) \
                     SET a.name = $name, a.attr_type = $attr_type \
                     MERGE (c)-[:HAS_ATTRIBUTE]->(a)",
                )
                .param("class_full_name", class.full_name.clone())
                .param("full_name", attr.full_name.clone())
                .param("name", attr.name.clone())
                .param("attr_type", attr.attr_type.clone().unwrap_or_default()),
            )
            .await?;
        }

        Ok(())
    }

    async fn upsert_function(&self, file_path: &str, repo_name: &str, func: &FunctionDef) -> Result<()> {
        self.run(
            query(
                "MATCH (f:File {path: $path, repo_name: $repo}) \
                 MERGE (fn:Function {full_name: $full_name}) \
                 SET fn.name = $name, fn.params_list = $params, fn.return_type = $return_type \
                 MERGE (f)-[:DEFINES]->(fn)",
            )
            .param("path", file_path.to_string())
            .param("repo", repo_name.to_string())
            .param("full_name", func.full_name.clone())
            .param("name", func.name.clone())
            .param("params", func.params_list.clone())
            .param("return_type", func.return_type.clone().unwrap_or_default()),
        )
        .await
    }

    pub async fn list_repositories(&self) -> Result<Vec<String>> {
        let mut rows = self
            .graph
            .execute(query("MATCH (r:Repository) RETURN r.name AS name ORDER BY name"))
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let mut names = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            if let Ok(name) = row.get::<String>("name") {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub async fn find_method(&self, class_name: &str, method_name: &str) -> Result<Option<MethodDef>> {
        let mut rows = self
            .graph
            .execute(
                query(
                    "MATCH (c:Class)-[:HAS_METHOD]->(m:Method) \
                     WHERE c.name = $class_name AND m.name = $method_name \
                     RETURN m.name AS name, m.full_name AS full_name, m.params_list AS params, m.return_type AS return_type \
                     LIMIT 1",
                )
                .param("class_name", class_name.to_string())
                .param("method_name", method_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        if let Ok(Some(row)) = rows.next().await {
            Ok(Some(MethodDef {
                name: row.get("name").unwrap_or_default(),
                full_name: row.get("full_name").unwrap_or_default(),
                params_list: row.get("params").unwrap_or_default(),
                return_type: row.get::<String>("return_type").ok().filter(|s| !s.is_empty()),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn find_attribute(&self, class_name: &str, attr_name: &str) -> Result<Option<AttributeDef>> {
        let mut rows = self
            .graph
            .execute(
                query(
                    "MATCH (c:Class)-[:HAS_ATTRIBUTE]->(a:Attribute) \
                     WHERE c.name = $class_name AND a.name = $attr_name \
                     RETURN a.name AS name, a.full_name AS full_name, a.attr_type AS attr_type LIMIT 1",
                )
                .param("class_name", class_name.to_string())
                .param("attr_name", attr_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        if let Ok(Some(row)) = rows.next().await {
            Ok(Some(AttributeDef {
                name: row.get("name").unwrap_or_default(),
                full_name: row.get("full_name").unwrap_or_default(),
                attr_type: row.get::<String>("attr_type").ok().filter(|s| !s.is_empty()),
            }))
        } else {
            Ok(None)
        }
    }

    /// Full names of every class defined anywhere in `repo_name` (the
    /// `query_knowledge_graph "classes <repo>"` command).
    pub async fn list_classes(&self, repo_name: &str) -> Result<Vec<String>> {
        let mut rows = self
            .graph
            .execute(
                query(
                    "MATCH (f:File {repo_name: $repo})-[:DEFINES]->(c:Class) \
                     RETURN c.full_name AS full_name ORDER BY full_name",
                )
                .param("repo", repo_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let mut out = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            if let Ok(full_name) = row.get::<String>("full_name") {
                out.push(full_name);
            }
        }
        Ok(out)
    }

    /// Full detail for one class by name, including its methods and
    /// attributes (the `query_knowledge_graph "explore <name>"` command).
    pub async fn class_detail(&self, class_name: &str) -> Result<Option<ClassDef>> {
        let mut rows = self
            .graph
            .execute(
                query("MATCH (c:Class {name: $name}) RETURN c.name AS name, c.full_name AS full_name LIMIT 1")
                    .param("name", class_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let Ok(Some(row)) = rows.next().await else {
            return Ok(None);
        };
        let name: String = row.get("name").unwrap_or_default();
        let full_name: String = row.get("full_name").unwrap_or_default();

        let mut method_rows = self
            .graph
            .execute(
                query(
                    "MATCH (c:Class {name: $name})-[:HAS_METHOD]->(m:Method) \
                     RETURN m.name AS name, m.full_name AS full_name, m.params_list AS params, m.return_type AS return_type",
                )
                .param("name", class_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let mut methods = Vec::new();
        while let Ok(Some(row)) = method_rows.next().await {
            methods.push(MethodDef {
                name: row.get("name").unwrap_or_default(),
                full_name: row.get("full_name").unwrap_or_default(),
                params_list: row.get("params").unwrap_or_default(),
                return_type: row.get::<String>("return_type").ok().filter(|s| !s.is_empty()),
            });
        }

        let mut attr_rows = self
            .graph
            .execute(
                query(
                    "MATCH (c:Class {name: $name})-[:HAS_ATTRIBUTE]->(a:Attribute) \
                     RETURN a.name AS name, a.full_name AS full_name, a.attr_type AS attr_type",
                )
                .param("name", class_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let mut attributes = Vec::new();
        while let Ok(Some(row)) = attr_rows.next().await {
            attributes.push(AttributeDef {
                name: row.get("name").unwrap_or_default(),
                full_name: row.get("full_name").unwrap_or_default(),
                attr_type: row.get::<String>("attr_type").ok().filter(|s| !s.is_empty()),
            });
        }

        Ok(Some(ClassDef {
            name,
            full_name,
            methods,
            attributes,
        }))
    }

    /// Every `(class_name, method)` pair across the whole graph whose method
    /// name matches (the `query_knowledge_graph "method <name>"` command).
    pub async fn find_methods_by_name(&self, method_name: &str) -> Result<Vec<(String, MethodDef)>> {
        let mut rows = self
            .graph
            .execute(
                query(
                    "MATCH (c:Class)-[:HAS_METHOD]->(m:Method {name: $method_name}) \
                     RETURN c.name AS class_name, m.name AS name, m.full_name AS full_name, \
                     m.params_list AS params, m.return_type AS return_type",
                )
                .param("method_name", method_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let mut out = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Ok(class_name) = row.get::<String>("class_name") else { continue };
            out.push((
                class_name,
                MethodDef {
                    name: row.get("name").unwrap_or_default(),
                    full_name: row.get("full_name").unwrap_or_default(),
                    params_list: row.get("params").unwrap_or_default(),
                    return_type: row.get::<String>("return_type").ok().filter(|s| !s.is_empty()),
                },
            ));
        }
        Ok(out)
    }

    pub async fn class_exists(&self, class_name: &str) -> Result<bool> {
        let mut rows = self
            .graph
            .execute(
                query("MATCH (c:Class {name: $name}) RETURN count(c) AS n")
                    .param("name", class_name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        if let Ok(Some(row)) = rows.next().await {
            return Ok(row.get::<i64>("n").unwrap_or(0) > 0);
        }
        Ok(false)
    }

    pub async fn function_exists(&self, name: &str) -> Result<bool> {
        let mut rows = self
            .graph
            .execute(
                query("MATCH (f:Function {name: $name}) RETURN count(f) AS n").param("name", name.to_string()),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        if let Ok(Some(row)) = rows.next().await {
            return Ok(row.get::<i64>("n").unwrap_or(0) > 0);
        }
        Ok(false)
    }

    // -- GraphRAG ------------------------------------------------------------

    pub async fn upsert_entity(&self, entity: &Entity) -> Result<()> {
        self.run(
            query("MERGE (e:Entity {name: $name, type: $etype})")
                .param("name", entity.name.clone())
                .param("etype", entity_type_str(entity.entity_type)),
        )
        .await
    }

    pub async fn upsert_relation(&self, from: &str, to: &str, relation_type: &str, confidence: f32) -> Result<()> {
        self.run(
            query(
                "MATCH (a:Entity {name: $from}), (b:Entity {name: $to}) \
                 MERGE (a)-[r:RELATES_TO {type: $rtype}]->(b) SET r.confidence = $confidence",
            )
            .param("from", from.to_string())
            .param("to", to.to_string())
            .param("rtype", relation_type.to_string())
            .param("confidence", confidence as f64),
        )
        .await
    }

    /// Merge `(:Document {url})-[:MENTIONS {count}]->(:Entity)`, setting
    /// `count` to the total occurrences in this ingest (not incremented).
    pub async fn mention(&self, document_url: &str, entity: &Entity, count: i64) -> Result<()> {
        self.run(
            query(
                "MERGE (d:Document {url: $url}) \
                 MERGE (e:Entity {name: $name, type: $etype}) \
                 MERGE (d)-[m:MENTIONS]->(e) SET m.count = $count",
            )
            .param("url", document_url.to_string())
            .param("name", entity.name.clone())
            .param("etype", entity_type_str(entity.entity_type))
            .param("count", count),
        )
        .await
    }

    /// Up to `limit` entities mentioned by a document, ordered by mention
    /// count descending (spec.md §4.9 step 5).
    pub async fn document_entities(&self, document_url: &str, limit: usize) -> Result<Vec<Entity>> {
        let mut rows = self
            .graph
            .execute(
                query(
                    "MATCH (d:Document {url: $url})-[m:MENTIONS]->(e:Entity) \
                     RETURN e.name AS name, e.type AS etype ORDER BY m.count DESC LIMIT $limit",
                )
                .param("url", document_url.to_string())
                .param("limit", limit as i64),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        let mut out = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Ok(name) = row.get::<String>("name") else { continue };
            let etype = row.get::<String>("etype").unwrap_or_default();
            out.push(Entity {
                name,
                entity_type: entity_type_from_str(&etype),
            });
        }
        Ok(out)
    }

    /// Up to `limit` neighbors of an entity via `RELATES_TO` in either
    /// direction, for retrieval-time graph enrichment (spec.md §4.9 step 5).
    pub async fn entity_neighbors(&self, name: &str, limit: usize) -> Result<Vec<EntityNeighbor>> {
        let mut rows = self
            .graph
            .execute(
                query(
                    "MATCH (e:Entity {name: $name})-[r:RELATES_TO]-(n:Entity) \
                     RETURN n.name AS name, n.type AS etype, r.type AS rtype LIMIT $limit",
                )
                .param("name", name.to_string())
                .param("limit", limit as i64),
            )
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        let mut out = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Ok(name) = row.get::<String>("name") else { continue };
            let etype = row.get::<String>("etype").unwrap_or_default();
            let rtype = row.get::<String>("rtype").unwrap_or_default();
            out.push(EntityNeighbor {
                name,
                entity_type: entity_type_from_str(&etype),
                relation_type: rtype,
            });
        }
        Ok(out)
    }
}

fn entity_type_str(t: EntityType) -> &'static str {
    match t {
        EntityType::Person => "PERSON",
        EntityType::Org => "ORG",
        EntityType::Technology => "TECHNOLOGY",
        EntityType::Concept => "CONCEPT",
        EntityType::Location => "LOCATION",
        EntityType::Event => "EVENT",
        EntityType::Product => "PRODUCT",
        EntityType::Other => "OTHER",
    }
}

fn entity_type_from_str(s: &str) -> EntityType {
    match s {
        "PERSON" => EntityType::Person,
        "ORG" => EntityType::Org,
        "TECHNOLOGY" => EntityType::Technology,
        "CONCEPT" => EntityType::Concept,
        "LOCATION" => EntityType::Location,
        "EVENT" => EntityType::Event,
        "PRODUCT" => EntityType::Product,
        _ => EntityType::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trips_through_its_string_form() {
        for t in [
            EntityType::Person,
            EntityType::Org,
            EntityType::Technology,
            EntityType::Concept,
            EntityType::Location,
            EntityType::Event,
            EntityType::Product,
            EntityType::Other,
        ] {
            assert_eq!(entity_type_from_str(entity_type_str(t)), t);
        }
    }

    #[test]
    fn unknown_type_string_maps_to_other() {
        assert_eq!(entity_type_from_str("SOMETHING_NEW"), EntityType::Other);
    }
}
