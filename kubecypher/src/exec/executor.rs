// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query executor
//!
//! Execution runs in fixed stages: resolve every pattern node to a resource
//! kind, turn node properties and WHERE filters into selectors, fetch each
//! node's documents through the dispatcher, narrow the sets along the
//! pattern's edges, then project (MATCH) or mutate (CREATE, SET, DELETE).
//! The first error aborts the query; mutations already sent stay applied.

use crate::ast::pretty_printer::render_query;
use crate::ast::{Clause, Filter, FilterOperator, Literal, Property, Query};
use crate::catalog::{ResolvedKind, ResourceResolver};
use crate::exec::config::ExecutorConfig;
use crate::exec::context::ExecutionContext;
use crate::exec::dispatcher::Dispatcher;
use crate::exec::error::{ExecutionError, ExecutionResult};
use crate::exec::field_path::{FieldPath, PathSegment};
use crate::exec::projection::{deep_merge, project};
use crate::exec::relationship::{RelationshipRule, RelationshipRules};
use crate::exec::result::QueryResult;
use crate::exec::selector::{SelectorError, SelectorOperator};
use crate::gateway::{ApiGateway, GatewayError, ListParams};
use crate::graph::{Graph, Node};
use log::{log, Level};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

const LABEL_PREFIX: &str = "metadata.labels.";
const DEFAULT_NAMESPACE: &str = "default";

/// Where a property key lands when turned into a selector
enum SelectorTarget<'a> {
    Label(Cow<'a, str>),
    Field(&'a str),
}

/// `metadata.labels.K` and keys with a `/` prefix are labels, other dotted
/// keys are field paths, plain keys are labels
fn selector_target(key: &str) -> SelectorTarget<'_> {
    if let Some(label) = key.strip_prefix(LABEL_PREFIX) {
        SelectorTarget::Label(Cow::Borrowed(label))
    } else if key.contains('/') || !key.contains('.') {
        SelectorTarget::Label(Cow::Borrowed(key))
    } else {
        SelectorTarget::Field(key)
    }
}

/// Binding-relative WHERE paths the platform can evaluate server side. An
/// unquoted prefixed label key such as `metadata.labels.app.kubernetes.io/name`
/// splits into several segments that are joined back into one key.
fn pushdown(path: &FieldPath) -> Option<SelectorTarget<'_>> {
    use PathSegment::Field;
    match path.segments() {
        [Field(m), Field(l), key @ ..] if m == "metadata" && l == "labels" && !key.is_empty() => {
            let parts = key
                .iter()
                .map(|segment| match segment {
                    Field(part) => Some(part.as_str()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            Some(SelectorTarget::Label(Cow::Owned(parts.join("."))))
        }
        [Field(m), Field(f)] if m == "metadata" && f == "name" => {
            Some(SelectorTarget::Field("metadata.name"))
        }
        [Field(m), Field(f)] if m == "metadata" && f == "namespace" => {
            Some(SelectorTarget::Field("metadata.namespace"))
        }
        _ => None,
    }
}

fn selector_operator(operator: FilterOperator) -> SelectorOperator {
    match operator {
        FilterOperator::Equal => SelectorOperator::Equal,
        FilterOperator::NotEqual => SelectorOperator::NotEqual,
    }
}

/// WHERE condition checked against fetched documents
struct Predicate {
    path: FieldPath,
    operator: FilterOperator,
    value: Literal,
}

impl Predicate {
    fn accepts(&self, document: &Value) -> bool {
        let found = self
            .path
            .resolve(document)
            .into_iter()
            .any(|v| self.value.matches_json(v));
        match self.operator {
            FilterOperator::Equal => found,
            FilterOperator::NotEqual => !found,
        }
    }
}

/// A pattern node with everything needed to fetch it
struct Target<'q> {
    node: &'q Node,
    kind: ResolvedKind,
    params: ListParams,
    predicates: Vec<Predicate>,
}

impl Target<'_> {
    fn api_error(&self, source: GatewayError) -> ExecutionError {
        ExecutionError::Api {
            binding: self.node.name.clone(),
            kind: self.kind.kind.clone(),
            source,
        }
    }

    /// Namespace to address an existing document in
    fn namespace_of(&self, document: &Value) -> Option<String> {
        if !self.kind.namespaced {
            return None;
        }
        document
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Query executor bound to one gateway
pub struct QueryExecutor {
    gateway: Dispatcher,
    resolver: ResourceResolver,
    relationships: RelationshipRules,
}

impl QueryExecutor {
    /// Must be called within a tokio runtime; the dispatcher worker is
    /// spawned here.
    pub fn new(gateway: Arc<dyn ApiGateway>, config: &ExecutorConfig) -> Self {
        Self {
            gateway: Dispatcher::new(gateway, config.worker_pool_size),
            resolver: ResourceResolver::new(),
            relationships: config.relationships.clone(),
        }
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    /// Gateway handle that routes through the dispatch gate
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.gateway
    }

    pub fn relationships(&self) -> &RelationshipRules {
        &self.relationships
    }

    pub async fn execute(
        &self,
        query: &Query,
        ctx: &ExecutionContext,
    ) -> ExecutionResult<QueryResult> {
        let started = Instant::now();
        let level = if ctx.debug { Level::Info } else { Level::Debug };
        log!(level, "executing {}", render_query(query));

        let targets = self.plan(query, ctx).await?;
        for target in &targets {
            log!(
                level,
                "{} -> {} (namespace: {}, fields: '{}', labels: '{}', predicates: {})",
                target.node.name,
                target.kind.gvr,
                target.params.namespace.as_deref().unwrap_or("*"),
                target.params.field_selector,
                target.params.label_selector,
                target.predicates.len()
            );
        }

        let mut result = match &query.clause {
            Clause::Match { projections, .. } => {
                let wanted = projection_paths(&targets, projections)?;
                let matched = self.matched(&query.graph, &targets, level).await?;
                let mut result = QueryResult::new();
                for (target, documents) in targets.iter().zip(&matched) {
                    if projections.is_empty() {
                        result
                            .bindings
                            .insert(target.node.name.clone(), documents.clone());
                    } else if let Some(paths) = wanted.get(&target.node.name) {
                        let projected = documents.iter().map(|d| project(d, paths)).collect();
                        result.bindings.insert(target.node.name.clone(), projected);
                    }
                }
                result.graph = result_graph(&query.graph, &targets, &matched);
                result
            }
            Clause::Create => self.create(&query.graph, &targets).await?,
            Clause::Set { assignments } => self.set(&query.graph, &targets, assignments, level).await?,
            Clause::Delete => self.delete(&query.graph, &targets, level).await?,
        };

        result.execution_time_ms = started.elapsed().as_millis() as u64;
        log!(
            level,
            "{} finished with {} documents in {} ms",
            query.clause.keyword(),
            result.document_count(),
            result.execution_time_ms
        );
        Ok(result)
    }

    /// Resolve kinds, then build selectors and predicates per node
    async fn plan<'q>(
        &self,
        query: &'q Query,
        ctx: &ExecutionContext,
    ) -> ExecutionResult<Vec<Target<'q>>> {
        let mut kinds = Vec::with_capacity(query.graph.nodes.len());
        for node in &query.graph.nodes {
            let kind = self
                .resolver
                .resolve(&self.gateway, &node.kind)
                .await
                .map_err(|source| ExecutionError::Resolution {
                    identifier: node.kind.clone(),
                    source,
                })?;
            kinds.push(kind);
        }

        let mut targets = Vec::with_capacity(kinds.len());
        for (node, kind) in query.graph.nodes.iter().zip(kinds) {
            let params = node_params(node, &kind, ctx)?;
            targets.push(Target {
                node,
                kind,
                params,
                predicates: Vec::new(),
            });
        }

        if let Clause::Match { filters, .. } = &query.clause {
            apply_filters(&mut targets, filters)?;
        }
        Ok(targets)
    }

    /// Fetch and narrow every node's documents
    async fn matched(
        &self,
        graph: &Graph,
        targets: &[Target<'_>],
        level: Level,
    ) -> ExecutionResult<Vec<Vec<Value>>> {
        let links = self.links(graph, targets)?;
        let fetched = self.fetch(targets, level).await?;
        Ok(narrow(&links, fetched))
    }

    /// Relationship rule for every edge, by target index
    fn links(
        &self,
        graph: &Graph,
        targets: &[Target<'_>],
    ) -> ExecutionResult<Vec<Link<'_>>> {
        let index_of = |id: &str| targets.iter().position(|t| t.node.id == id);
        let mut links = Vec::with_capacity(graph.edges.len());
        for edge in &graph.edges {
            let (Some(from), Some(to)) = (index_of(&edge.from), index_of(&edge.to)) else {
                continue;
            };
            let (a, b) = (&targets[from].kind.kind, &targets[to].kind.kind);
            let (rule, from_is_parent) =
                self.relationships
                    .find(a, b)
                    .ok_or_else(|| ExecutionError::NoRelationship {
                        from: a.clone(),
                        to: b.clone(),
                    })?;
            links.push(Link {
                from,
                to,
                rule,
                from_is_parent,
            });
        }
        Ok(links)
    }

    /// List every node concurrently; the dispatcher bounds the actual calls
    async fn fetch(
        &self,
        targets: &[Target<'_>],
        level: Level,
    ) -> ExecutionResult<Vec<Vec<Value>>> {
        let mut tasks = JoinSet::new();
        for (index, target) in targets.iter().enumerate() {
            let gateway = self.gateway.clone();
            let resource = target.kind.gvr.clone();
            let params = target.params.clone();
            tasks.spawn(async move { (index, gateway.list(&resource, &params).await) });
        }

        let mut fetched = vec![Vec::new(); targets.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, listed) = joined?;
            let target = &targets[index];
            let documents = listed.map_err(|source| target.api_error(source))?;
            let total = documents.len();
            fetched[index] = documents
                .into_iter()
                .filter(|d| target.predicates.iter().all(|p| p.accepts(d)))
                .collect();
            log!(
                level,
                "{}: fetched {}, kept {} after filters",
                target.node.name,
                total,
                fetched[index].len()
            );
        }
        Ok(fetched)
    }

    async fn create(&self, graph: &Graph, targets: &[Target<'_>]) -> ExecutionResult<QueryResult> {
        if !graph.edges.is_empty() {
            return Err(ExecutionError::InvalidMutation(
                "CREATE does not take relationships".to_string(),
            ));
        }

        let mut result = QueryResult::new();
        for target in targets {
            let (namespace, document) = synthesize(target)?;
            let created = self
                .gateway
                .create(&target.kind.gvr, namespace.as_deref(), document)
                .await
                .map_err(|source| target.api_error(source))?;
            result
                .bindings
                .entry(target.node.name.clone())
                .or_default()
                .push(created);
        }
        result.graph = graph.clone();
        Ok(result)
    }

    async fn set(
        &self,
        graph: &Graph,
        targets: &[Target<'_>],
        assignments: &[Property],
        level: Level,
    ) -> ExecutionResult<QueryResult> {
        let patches = assignment_patches(targets, assignments)?;
        let matched = self.matched(graph, targets, level).await?;

        let mut result = QueryResult::new();
        for ((target, documents), patch) in targets.iter().zip(matched.iter()).zip(patches) {
            let mut updated = Vec::with_capacity(documents.len());
            for document in documents {
                if patch.as_object().map_or(true, Map::is_empty) {
                    updated.push(document.clone());
                    continue;
                }
                let mut document = document.clone();
                deep_merge(&mut document, patch.clone());
                let namespace = target.namespace_of(&document);
                let stored = self
                    .gateway
                    .update(&target.kind.gvr, namespace.as_deref(), document)
                    .await
                    .map_err(|source| target.api_error(source))?;
                updated.push(stored);
            }
            result.bindings.insert(target.node.name.clone(), updated);
        }
        result.graph = result_graph(graph, targets, &matched);
        Ok(result)
    }

    async fn delete(
        &self,
        graph: &Graph,
        targets: &[Target<'_>],
        level: Level,
    ) -> ExecutionResult<QueryResult> {
        let matched = self.matched(graph, targets, level).await?;

        let mut result = QueryResult::new();
        for (target, documents) in targets.iter().zip(matched.iter()) {
            for document in documents {
                let name = document
                    .pointer("/metadata/name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ExecutionError::InvalidMutation(format!(
                            "matched {} has no metadata.name",
                            target.kind.kind
                        ))
                    })?;
                let namespace = target.namespace_of(document);
                self.gateway
                    .delete(&target.kind.gvr, namespace.as_deref(), name)
                    .await
                    .map_err(|source| target.api_error(source))?;
                log!(level, "deleted {} {}", target.kind.kind, name);
            }
            result
                .bindings
                .insert(target.node.name.clone(), documents.clone());
        }
        result.graph = result_graph(graph, targets, &matched);
        Ok(result)
    }
}

/// An edge with its rule, as indexes into the target list
struct Link<'r> {
    from: usize,
    to: usize,
    rule: &'r RelationshipRule,
    from_is_parent: bool,
}

impl Link<'_> {
    fn linked(&self, from: &Value, to: &Value) -> bool {
        if self.from_is_parent {
            self.rule.links(from, to)
        } else {
            self.rule.links(to, from)
        }
    }
}

/// Keep only documents that take part in every edge, repeating until no
/// set shrinks
fn narrow(links: &[Link<'_>], mut sets: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    loop {
        let mut changed = false;
        for link in links {
            let kept_from: Vec<Value> = sets[link.from]
                .iter()
                .filter(|a| sets[link.to].iter().any(|b| link.linked(a, b)))
                .cloned()
                .collect();
            let kept_to: Vec<Value> = sets[link.to]
                .iter()
                .filter(|b| sets[link.from].iter().any(|a| link.linked(a, b)))
                .cloned()
                .collect();
            if kept_from.len() != sets[link.from].len() || kept_to.len() != sets[link.to].len() {
                changed = true;
            }
            sets[link.from] = kept_from;
            sets[link.to] = kept_to;
        }
        if !changed {
            return sets;
        }
    }
}

fn result_graph(graph: &Graph, targets: &[Target<'_>], sets: &[Vec<Value>]) -> Graph {
    let live: HashMap<&str, bool> = targets
        .iter()
        .zip(sets)
        .map(|(t, s)| (t.node.id.as_str(), !s.is_empty()))
        .collect();
    graph.sanitize(|node| live.get(node.id.as_str()).copied().unwrap_or(false))
}

fn node_params(
    node: &Node,
    kind: &ResolvedKind,
    ctx: &ExecutionContext,
) -> ExecutionResult<ListParams> {
    let mut params = ListParams::default();
    let mut namespace = None;
    for property in &node.properties {
        let value = property.value.selector_text();
        match property.key.as_str() {
            "name" => {
                params
                    .field_selector
                    .add_field("metadata.name", SelectorOperator::Equal, &value)?
            }
            "namespace" => namespace = Some(value),
            key => match selector_target(key) {
                SelectorTarget::Label(label) => {
                    params
                        .label_selector
                        .add_label(&label, SelectorOperator::Equal, &value)?
                }
                SelectorTarget::Field(path) => {
                    params
                        .field_selector
                        .add_field(path, SelectorOperator::Equal, &value)?
                }
            },
        }
    }
    if kind.namespaced {
        params.namespace = namespace.or_else(|| ctx.namespace_scope().map(str::to_string));
    }
    Ok(params)
}

fn apply_filters(targets: &mut [Target<'_>], filters: &[Filter]) -> ExecutionResult<()> {
    for filter in filters {
        let path = FieldPath::parse(&filter.path)?;
        let unknown = || SelectorError::UnknownBinding(filter.path.clone());
        let binding = path.head().ok_or_else(unknown)?;
        let target = targets
            .iter_mut()
            .find(|t| t.node.name == binding)
            .ok_or_else(unknown)?;
        let rest = path.tail();
        if rest.is_empty() {
            return Err(SelectorError::EmptyPath.into());
        }

        let operator = selector_operator(filter.operator);
        let value = filter.value.selector_text();
        match pushdown(&rest) {
            Some(SelectorTarget::Label(key)) => {
                target.params.label_selector.add_label(&key, operator, &value)?
            }
            Some(SelectorTarget::Field(key)) => {
                target.params.field_selector.add_field(key, operator, &value)?
            }
            None => target.predicates.push(Predicate {
                path: rest,
                operator: filter.operator,
                value: filter.value.clone(),
            }),
        }
    }
    Ok(())
}

/// RETURN paths grouped by binding, relative to the binding's document
fn projection_paths(
    targets: &[Target<'_>],
    projections: &[String],
) -> ExecutionResult<BTreeMap<String, Vec<FieldPath>>> {
    let mut wanted: BTreeMap<String, Vec<FieldPath>> = BTreeMap::new();
    for text in projections {
        let path = FieldPath::parse(text)?;
        let binding = path
            .head()
            .filter(|b| targets.iter().any(|t| t.node.name == *b))
            .ok_or_else(|| ExecutionError::UnknownBinding(text.clone()))?;
        wanted
            .entry(binding.to_string())
            .or_default()
            .push(path.tail());
    }
    Ok(wanted)
}

/// Per-target merge patch from a SET block. A path starting with a binding
/// applies to that binding only; any other path applies to every node.
fn assignment_patches(
    targets: &[Target<'_>],
    assignments: &[Property],
) -> ExecutionResult<Vec<Value>> {
    let mut patches = vec![Value::Object(Map::new()); targets.len()];
    for assignment in assignments {
        let path = FieldPath::parse(&assignment.key)?;
        let bound = path
            .head()
            .and_then(|head| targets.iter().position(|t| t.node.name == head));
        let (indexes, path): (Vec<usize>, FieldPath) = match bound {
            Some(index) if path.segments().len() > 1 => (vec![index], path.tail()),
            _ => ((0..targets.len()).collect(), path),
        };
        let patch = path.nest(assignment.value.to_json()).ok_or_else(|| {
            ExecutionError::InvalidMutation(format!("cannot assign through '{}'", assignment.key))
        })?;
        for index in indexes {
            deep_merge(&mut patches[index], patch.clone());
        }
    }
    Ok(patches)
}

/// Document for CREATE and the namespace to create it in
fn synthesize(target: &Target<'_>) -> ExecutionResult<(Option<String>, Value)> {
    let node = target.node;
    let name = node
        .property("name")
        .map(Literal::selector_text)
        .unwrap_or_else(|| node.name.clone());
    let namespace = if target.kind.namespaced {
        Some(
            target
                .params
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        )
    } else {
        None
    };

    let mut labels = Map::new();
    let mut patches = Vec::new();
    for property in &node.properties {
        match property.key.as_str() {
            "name" | "namespace" => {}
            key => match selector_target(key) {
                SelectorTarget::Label(label) => {
                    labels.insert(
                        label.to_string(),
                        Value::String(property.value.selector_text()),
                    );
                }
                SelectorTarget::Field(path) => {
                    let patch = FieldPath::parse(path)?
                        .nest(property.value.to_json())
                        .ok_or_else(|| {
                            ExecutionError::InvalidMutation(format!("cannot assign to '{}'", path))
                        })?;
                    patches.push(patch);
                }
            },
        }
    }

    let mut metadata = Map::new();
    metadata.insert("name".to_string(), Value::String(name));
    if let Some(ns) = &namespace {
        metadata.insert("namespace".to_string(), Value::String(ns.clone()));
    }
    if !labels.is_empty() {
        metadata.insert("labels".to_string(), Value::Object(labels));
    }

    let mut root = Map::new();
    root.insert("apiVersion".to_string(), Value::String(target.kind.api_version()));
    root.insert("kind".to_string(), Value::String(target.kind.kind.clone()));
    root.insert("metadata".to_string(), Value::Object(metadata));
    let mut document = Value::Object(root);
    for patch in patches {
        deep_merge(&mut document, patch);
    }
    Ok((namespace, document))
}
