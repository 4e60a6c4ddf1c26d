//! Registry + Category Aggregator
//!
//! `category → name → descriptor` 2단 구조. 한 카테고리에 멤버가 하나여도
//! 항상 맵이다.
//!
//! 집계는 교환법칙과 멱등성을 만족한다: 같은 카테고리/이름이 충돌하면
//! 소스 경로가 더 뒤에 정렬되는 쪽이 이긴다. 도착 순서와 무관하므로
//! 어떤 순서로 넣어도 같은 Registry가 나온다.

use super::descriptor::ComponentDescriptor;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// 카테고리 하나의 컴포넌트들
pub type CategoryMap = BTreeMap<String, ComponentDescriptor>;

// ============================================================================
// Registry
// ============================================================================

/// 컴포넌트 레지스트리
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    categories: BTreeMap<String, CategoryMap>,
}

/// 충돌 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion {
    /// 새 항목
    Added,
    /// 기존 항목을 대체함 (밀려난 기술자)
    Replaced(ComponentDescriptor),
    /// 기존 항목이 이겨서 새 기술자가 버려짐
    Rejected(ComponentDescriptor),
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기술자 목록으로부터 집계
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    /// 기술자 삽입 (결정적 last-write-wins)
    pub fn insert(&mut self, descriptor: ComponentDescriptor) -> Insertion {
        let components = self
            .categories
            .entry(descriptor.category().to_string())
            .or_default();

        match components.entry(descriptor.name().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
                Insertion::Added
            }
            Entry::Occupied(mut slot) => {
                if slot.get().source() > descriptor.source() {
                    Insertion::Rejected(descriptor)
                } else {
                    Insertion::Replaced(slot.insert(descriptor))
                }
            }
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 전체 컴포넌트 수
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// 카테고리 이름들 (정렬됨)
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn category(&self, name: &str) -> Option<&CategoryMap> {
        self.categories.get(name)
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&ComponentDescriptor> {
        self.categories.get(category)?.get(name)
    }

    /// 이름으로 모든 카테고리에서 검색
    pub fn find(&self, name: &str) -> Vec<&ComponentDescriptor> {
        self.categories
            .values()
            .filter_map(|components| components.get(name))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryMap)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.categories.values().flat_map(BTreeMap::values)
    }

    // ========================================================================
    // 병합 (상위 레이어용)
    // ========================================================================

    /// 다른 레지스트리를 덮어쓰기 병합 (other 우선)
    ///
    /// 발견(discovery) 자체는 병합하지 않는다. 빌트인과 커스텀을 합치려는
    /// 호출자가 사용한다.
    pub fn merge(&mut self, other: &Registry) {
        for (category, components) in &other.categories {
            let target = self.categories.entry(category.clone()).or_default();
            for (name, descriptor) in components {
                target.insert(name.clone(), descriptor.clone());
            }
        }
    }

    /// `base`에 `overlay`를 덮어쓴 새 레지스트리
    pub fn merged(base: &Registry, overlay: &Registry) -> Registry {
        let mut registry = base.clone();
        registry.merge(overlay);
        registry
    }

    /// `{category: {name: template}}` JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// ============================================================================
// CategoryAggregator
// ============================================================================

/// 기술자 스트림을 Registry로 집계하며 충돌 수를 센다
#[derive(Debug, Default)]
pub struct CategoryAggregator {
    registry: Registry,
    collisions: usize,
}

impl CategoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ComponentDescriptor) {
        match self.registry.insert(descriptor) {
            Insertion::Added => {}
            Insertion::Replaced(loser) | Insertion::Rejected(loser) => {
                self.collisions += 1;
                let winner = self
                    .registry
                    .get(loser.category(), loser.name())
                    .map(|d| d.source().display().to_string())
                    .unwrap_or_default();
                warn!(
                    "Component '{}' in category '{}' from {:?} is shadowed by {}",
                    loser.name(),
                    loser.category(),
                    loser.source(),
                    winner
                );
            }
        }
    }

    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        for descriptor in descriptors {
            self.add(descriptor);
        }
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// (레지스트리, 충돌 수)
    pub fn finish(self) -> (Registry, usize) {
        (self.registry, self.collisions)
    }
}

// ============================================================================
// BuiltinComponents - 빌트인 스캔 결과
// ============================================================================

/// 빌트인 발견 결과. `{"components": Registry}`로 직렬화된다.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinComponents {
    pub components: Arc<Registry>,
}

impl BuiltinComponents {
    pub fn new(components: Arc<Registry>) -> Self {
        Self { components }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Serialize for BuiltinComponents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BuiltinComponents", 1)?;
        state.serialize_field("components", self.components.as_ref())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn descriptor(category: &str, name: &str, source: &str, label: &str) -> ComponentDescriptor {
        let mut template = Map::new();
        template.insert("display_name".into(), Value::String(label.into()));
        ComponentDescriptor::new(name, category, template, source)
    }

    #[test]
    fn test_single_member_category_is_a_map() {
        let registry = Registry::from_descriptors([descriptor("tools", "Calc", "/c/tools/calc.json", "Calc")]);
        let value = registry.to_json();
        assert!(value["tools"].is_object());
        assert_eq!(value["tools"]["Calc"]["display_name"], "Calc");
    }

    #[test]
    fn test_same_name_in_different_categories() {
        let registry = Registry::from_descriptors([
            descriptor("tools", "Search", "/c/tools/search.json", "Tool"),
            descriptor("agents", "Search", "/c/agents/search.json", "Agent"),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("Search").len(), 2);
    }

    #[test]
    fn test_aggregation_is_commutative() {
        let a = descriptor("tools", "Calc", "/c/tools/a.json", "first");
        let b = descriptor("tools", "Calc", "/c/tools/b.json", "second");
        let c = descriptor("models", "Ollama", "/c/models/ollama.toml", "Ollama");

        let forward = Registry::from_descriptors([a.clone(), b.clone(), c.clone()]);
        let backward = Registry::from_descriptors([c, b, a]);

        assert_eq!(forward, backward);
        // 소스 경로가 뒤에 정렬되는 b가 이김
        assert_eq!(forward.get("tools", "Calc").unwrap().display_name(), Some("second"));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let a = descriptor("tools", "Calc", "/c/tools/a.json", "Calc");
        let once = Registry::from_descriptors([a.clone()]);
        let twice = Registry::from_descriptors([a.clone(), a]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_aggregator_counts_collisions() {
        let mut aggregator = CategoryAggregator::new();
        aggregator.extend([
            descriptor("tools", "Calc", "/c/tools/b.json", "b"),
            descriptor("tools", "Calc", "/c/tools/a.json", "a"),
            descriptor("tools", "Other", "/c/tools/o.json", "o"),
        ]);

        let (registry, collisions) = aggregator.finish();
        assert_eq!(collisions, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("tools", "Calc").unwrap().display_name(), Some("b"));
    }

    #[test]
    fn test_merge_overlay_wins() {
        let builtin = Registry::from_descriptors([
            descriptor("tools", "Calc", "/b/tools/calc.json", "builtin"),
            descriptor("inputs", "ChatInput", "/b/inputs/chat.json", "Chat"),
        ]);
        let custom = Registry::from_descriptors([descriptor("tools", "Calc", "/a/tools/calc.json", "custom")]);

        let merged = Registry::merged(&builtin, &custom);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("tools", "Calc").unwrap().display_name(), Some("custom"));
        // 원본은 그대로
        assert_eq!(builtin.get("tools", "Calc").unwrap().display_name(), Some("builtin"));
    }

    #[test]
    fn test_builtin_components_wraps_registry() {
        let registry = Registry::from_descriptors([descriptor("tools", "Calc", "/c/tools/calc.json", "Calc")]);
        let wrapped = BuiltinComponents::new(Arc::new(registry));
        assert_eq!(
            wrapped.to_json(),
            json!({ "components": { "tools": { "Calc": { "display_name": "Calc" } } } })
        );
    }

    #[test]
    fn test_empty_registry_serializes_to_empty_object() {
        assert_eq!(Registry::new().to_json(), json!({}));
    }
}
