// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cached identifier → resource coordinate resolution

use super::error::{CatalogError, CatalogResult};
use crate::gateway::{ApiGateway, ApiResourceList, GroupVersionResource};
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// A resource kind as the platform serves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedKind {
    pub gvr: GroupVersionResource,
    pub kind: String,
    pub namespaced: bool,
}

impl ResolvedKind {
    pub fn api_version(&self) -> String {
        self.gvr.api_version()
    }
}

/// Split `group/version` (or a bare core `version`) into its parts
pub fn parse_group_version(text: &str) -> CatalogResult<(String, String)> {
    let invalid = || CatalogError::InvalidGroupVersion(text.to_string());
    match text.split('/').collect::<Vec<_>>().as_slice() {
        [version] if !version.is_empty() => Ok((String::new(), version.to_string())),
        [group, version] if !group.is_empty() && !version.is_empty() => {
            Ok((group.to_string(), version.to_string()))
        }
        _ => Err(invalid()),
    }
}

/// Resolver with a write-once cache keyed by the lower-cased identifier
///
/// Warm lookups only take the read lock. Misses serialize on an async
/// discovery lock and re-check the cache under it, so concurrent misses
/// cost a single discovery round trip.
#[derive(Default)]
pub struct ResourceResolver {
    cache: RwLock<HashMap<String, ResolvedKind>>,
    discovery: Mutex<()>,
}

impl ResourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(
        &self,
        gateway: &dyn ApiGateway,
        identifier: &str,
    ) -> CatalogResult<ResolvedKind> {
        let key = identifier.to_lowercase();
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        let _guard = self.discovery.lock().await;
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        debug!("resolver miss for '{}', running discovery", identifier);
        let lists = gateway.discover().await?;
        let resolved = find_kind(&lists, &key)?
            .ok_or_else(|| CatalogError::KindNotFound(identifier.to_string()))?;

        let mut cache = self.cache.write();
        let entry = cache.entry(key).or_insert(resolved);
        Ok(entry.clone())
    }

    /// Cache every plural name, Kind and short name from one discovery call.
    /// Returns the number of new entries.
    pub async fn warm(&self, gateway: &dyn ApiGateway) -> CatalogResult<usize> {
        let _guard = self.discovery.lock().await;
        let lists = gateway.discover().await?;

        let mut added = 0;
        let mut cache = self.cache.write();
        for list in &lists {
            let (group, version) = parse_group_version(&list.group_version)?;
            for resource in &list.resources {
                let resolved = ResolvedKind {
                    gvr: GroupVersionResource::new(&group, &version, &resource.name),
                    kind: resource.kind.clone(),
                    namespaced: resource.namespaced,
                };
                let aliases = std::iter::once(&resource.name)
                    .chain(std::iter::once(&resource.kind))
                    .chain(resource.short_names.iter());
                for alias in aliases {
                    let key = alias.to_lowercase();
                    if !cache.contains_key(&key) {
                        cache.insert(key, resolved.clone());
                        added += 1;
                    }
                }
            }
        }
        info!("resolver cache warmed with {} new entries", added);
        Ok(added)
    }

    fn lookup(&self, key: &str) -> Option<ResolvedKind> {
        self.cache.read().get(key).cloned()
    }

    /// Cache contents sorted by identifier
    pub fn entries(&self) -> Vec<(String, ResolvedKind)> {
        let mut entries: Vec<_> = self
            .cache
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write();
        info!("clearing {} resolver cache entries", cache.len());
        cache.clear();
    }
}

/// First resource, in discovery order, whose plural name, Kind or short
/// name equals `key`
fn find_kind(lists: &[ApiResourceList], key: &str) -> CatalogResult<Option<ResolvedKind>> {
    for list in lists {
        for resource in &list.resources {
            let matches = resource.name.eq_ignore_ascii_case(key)
                || resource.kind.eq_ignore_ascii_case(key)
                || resource
                    .short_names
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(key));
            if matches {
                let (group, version) = parse_group_version(&list.group_version)?;
                return Ok(Some(ResolvedKind {
                    gvr: GroupVersionResource::new(group, version, &resource.name),
                    kind: resource.kind.clone(),
                    namespaced: resource.namespaced,
                }));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{InMemoryGateway, Snapshot};
    use crate::gateway::{ApiResource, GatewayError};
    use std::sync::Arc;

    fn discover_count(gateway: &InMemoryGateway) -> usize {
        gateway.calls().iter().filter(|c| c.is_discover()).count()
    }

    #[test]
    fn test_parse_group_version() {
        assert_eq!(
            parse_group_version("apps/v1").unwrap(),
            ("apps".to_string(), "v1".to_string())
        );
        assert_eq!(
            parse_group_version("v1").unwrap(),
            (String::new(), "v1".to_string())
        );
        for bad in ["", "a/b/c", "/v1", "apps/"] {
            assert_eq!(
                parse_group_version(bad),
                Err(CatalogError::InvalidGroupVersion(bad.to_string()))
            );
        }
    }

    #[tokio::test]
    async fn test_second_resolve_is_cache_hit() {
        let gateway = InMemoryGateway::with_objects(vec![]);
        let resolver = ResourceResolver::new();

        let first = resolver.resolve(&gateway, "Deployment").await.unwrap();
        let second = resolver.resolve(&gateway, "deployment").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.gvr, GroupVersionResource::new("apps", "v1", "deployments"));
        assert_eq!(discover_count(&gateway), 1);
    }

    #[tokio::test]
    async fn test_aliases_resolve_to_same_coordinate() {
        let gateway = InMemoryGateway::with_objects(vec![]);
        let resolver = ResourceResolver::new();

        let plural = resolver.resolve(&gateway, "deployments").await.unwrap();
        let kind = resolver.resolve(&gateway, "Deployment").await.unwrap();
        let short = resolver.resolve(&gateway, "DEPLOY").await.unwrap();
        assert_eq!(plural.gvr, kind.gvr);
        assert_eq!(kind.gvr, short.gvr);
        assert_eq!(resolver.len(), 3);
    }

    #[tokio::test]
    async fn test_first_match_in_discovery_order_wins() {
        let snapshot = Snapshot {
            discovery: vec![
                ApiResourceList {
                    group_version: "example.com/v1".into(),
                    resources: vec![ApiResource {
                        name: "events".into(),
                        kind: "Event".into(),
                        short_names: vec!["ev".into()],
                        namespaced: true,
                    }],
                },
                ApiResourceList {
                    group_version: "v1".into(),
                    resources: vec![ApiResource {
                        name: "events".into(),
                        kind: "Event".into(),
                        short_names: vec!["ev".into()],
                        namespaced: true,
                    }],
                },
            ],
            objects: vec![],
        };
        let gateway = InMemoryGateway::new(snapshot);
        let resolver = ResourceResolver::new();
        let resolved = resolver.resolve(&gateway, "ev").await.unwrap();
        assert_eq!(resolved.gvr.group, "example.com");
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let gateway = InMemoryGateway::with_objects(vec![]);
        let resolver = ResourceResolver::new();
        let err = resolver.resolve(&gateway, "Widget").await.unwrap_err();
        assert_eq!(err, CatalogError::KindNotFound("Widget".into()));
        assert!(resolver.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_error_is_surfaced() {
        struct Broken;

        #[async_trait::async_trait]
        impl ApiGateway for Broken {
            async fn discover(&self) -> crate::gateway::GatewayResult<Vec<ApiResourceList>> {
                Err(GatewayError::Unauthorized("no token".into()))
            }
            async fn list(
                &self,
                _: &GroupVersionResource,
                _: &crate::gateway::ListParams,
            ) -> crate::gateway::GatewayResult<Vec<serde_json::Value>> {
                unreachable!()
            }
            async fn create(
                &self,
                _: &GroupVersionResource,
                _: Option<&str>,
                _: serde_json::Value,
            ) -> crate::gateway::GatewayResult<serde_json::Value> {
                unreachable!()
            }
            async fn update(
                &self,
                _: &GroupVersionResource,
                _: Option<&str>,
                _: serde_json::Value,
            ) -> crate::gateway::GatewayResult<serde_json::Value> {
                unreachable!()
            }
            async fn delete(
                &self,
                _: &GroupVersionResource,
                _: Option<&str>,
                _: &str,
            ) -> crate::gateway::GatewayResult<()> {
                unreachable!()
            }
        }

        let resolver = ResourceResolver::new();
        let err = resolver.resolve(&Broken, "pods").await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::Discovery(GatewayError::Unauthorized("no token".into()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_discovery() {
        let gateway = Arc::new(InMemoryGateway::with_objects(vec![]));
        let resolver = Arc::new(ResourceResolver::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gateway = gateway.clone();
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver.resolve(gateway.as_ref(), "pods").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(discover_count(&gateway), 1);
    }

    #[tokio::test]
    async fn test_warm_dump_and_clear() {
        let gateway = InMemoryGateway::with_objects(vec![]);
        let resolver = ResourceResolver::new();
        let added = resolver.warm(&gateway).await.unwrap();
        assert_eq!(added, resolver.len());
        assert!(added > 0);

        let entries = resolver.entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(keys.contains(&"svc"));

        gateway.clear_calls();
        resolver.resolve(&gateway, "po").await.unwrap();
        assert_eq!(discover_count(&gateway), 0);

        resolver.clear();
        assert!(resolver.is_empty());
        resolver.resolve(&gateway, "po").await.unwrap();
        assert_eq!(discover_count(&gateway), 1);
    }
}
