//! Descriptor Extractor - 컴포넌트 정의 → ComponentDescriptor
//!
//! - 이름: `name` 필드 → 단일 컴포넌트 유닛이면 파일 stem
//! - 카테고리: `category` 필드 → 루트 바로 아래 폴더 → `uncategorized`
//! - 템플릿: `name`, `category`를 제외한 나머지 필드
//!
//! 개발 중인 컴포넌트는 템플릿이 비어 있을 수 있다. 빈 템플릿은 에러가 아니다.

use super::error::LoadError;
use super::loader::{value_kind, ComponentDefinition, SourceUnit};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 카테고리가 없는 컴포넌트가 들어가는 버킷
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// 템플릿이 비어 있지 않다면 하나 이상 있어야 하는 필드
pub const RECOGNIZED_FIELDS: [&str; 3] = ["display_name", "type", "template"];

const STRING_FIELDS: [&str; 4] = ["display_name", "type", "description", "icon"];
const LIST_FIELDS: [&str; 2] = ["base_classes", "output_types"];

// ============================================================================
// ComponentDescriptor
// ============================================================================

/// 발견된 컴포넌트 하나의 불변 기술자
///
/// 직렬화하면 템플릿 객체만 나온다 (`{category: {name: template}}` 형태를 위해).
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDescriptor {
    name: String,
    category: String,
    template: Map<String, Value>,
    source: PathBuf,
}

impl ComponentDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        template: Map<String, Value>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            template,
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn template(&self) -> &Map<String, Value> {
        &self.template
    }

    /// 정의된 유닛 경로
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn display_name(&self) -> Option<&str> {
        self.template.get("display_name").and_then(Value::as_str)
    }

    pub fn component_type(&self) -> Option<&str> {
        self.template.get("type").and_then(Value::as_str)
    }

    /// 필드 스키마 (`template` 객체)
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.template.get("template").and_then(Value::as_object)
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }

    /// 빈 템플릿이거나 알려진 필드를 하나 이상 가짐
    pub fn is_recognizable(&self) -> bool {
        self.template.is_empty() || RECOGNIZED_FIELDS.iter().any(|f| self.template.contains_key(*f))
    }
}

impl Serialize for ComponentDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.template.serialize(serializer)
    }
}

// ============================================================================
// 추출
// ============================================================================

/// 유닛의 모든 정의를 기술자로 변환
///
/// 하나라도 잘못되면 유닛 전체가 실패한다. 같은 유닛 안에서
/// 같은 카테고리/이름이 두 번 나오면 잘못된 유닛이다.
pub fn extract_all(
    definitions: Vec<ComponentDefinition>,
    unit: &SourceUnit,
) -> Result<Vec<ComponentDescriptor>, LoadError> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(definitions.len());

    for (index, definition) in definitions.into_iter().enumerate() {
        let descriptor = extract(definition, unit)
            .map_err(|e| annotate(e, index))?;

        if !seen.insert((descriptor.category.clone(), descriptor.name.clone())) {
            return Err(LoadError::invalid(format!(
                "component '{}' is defined twice in category '{}'",
                descriptor.name, descriptor.category
            )));
        }
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

/// 정의 하나를 기술자로 변환
pub fn extract(definition: ComponentDefinition, unit: &SourceUnit) -> Result<ComponentDescriptor, LoadError> {
    let ComponentDefinition {
        mut fields,
        fallback_name,
    } = definition;

    let name = match fields.remove("name") {
        Some(value) => non_empty_string("name", value)?,
        None => fallback_name.ok_or_else(|| LoadError::invalid("component has no name"))?,
    };

    let category = match fields.remove("category") {
        Some(value) => non_empty_string("category", value)?,
        None => unit
            .folder
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    };

    validate_template(&fields)?;

    let descriptor = ComponentDescriptor::new(name, category, fields, &unit.path);
    if !descriptor.is_recognizable() {
        debug!(
            "Component '{}' in {:?} has none of the expected fields {:?}",
            descriptor.name, unit.path, RECOGNIZED_FIELDS
        );
    }

    Ok(descriptor)
}

fn non_empty_string(field: &str, value: Value) -> Result<String, LoadError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::String(_) => Err(LoadError::invalid(format!("'{}' must not be blank", field))),
        other => Err(LoadError::invalid(format!(
            "'{}' must be a string, found {}",
            field,
            value_kind(&other)
        ))),
    }
}

fn validate_template(template: &Map<String, Value>) -> Result<(), LoadError> {
    for field in STRING_FIELDS {
        if let Some(value) = template.get(field) {
            if !value.is_string() {
                return Err(LoadError::invalid(format!(
                    "'{}' must be a string, found {}",
                    field,
                    value_kind(value)
                )));
            }
        }
    }

    for field in LIST_FIELDS {
        if let Some(value) = template.get(field) {
            if !value.is_array() {
                return Err(LoadError::invalid(format!(
                    "'{}' must be a list, found {}",
                    field,
                    value_kind(value)
                )));
            }
        }
    }

    if let Some(value) = template.get("template") {
        if !value.is_object() {
            return Err(LoadError::invalid(format!(
                "'template' must be an object, found {}",
                value_kind(value)
            )));
        }
    }

    Ok(())
}

fn annotate(error: LoadError, index: usize) -> LoadError {
    match error {
        LoadError::Invalid(message) => LoadError::Invalid(format!("component #{}: {}", index, message)),
        other => other,
    }
}
