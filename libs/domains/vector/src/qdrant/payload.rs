//! Metadata, payload and filter conversions for Qdrant points.

use std::collections::HashMap;

use qdrant_client::qdrant::{
    value::Kind, Condition, Filter, ListValue, Range, Value as QdrantValue,
};

use crate::error::{VectorError, VectorResult};
use crate::models::{Metadata, MetadataValue, QueryFilter, RESERVED_ID_KEY};

/// Build a point payload; the textual id travels under the reserved key.
pub(super) fn to_payload(id: &str, metadata: Metadata) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = metadata
        .into_iter()
        .map(|(key, value)| (key, to_qdrant_value(value)))
        .collect();

    payload.insert(RESERVED_ID_KEY.to_string(), QdrantValue::from(id.to_string()));
    payload
}

/// Split a point payload back into the textual id and caller metadata.
pub(super) fn from_payload(payload: HashMap<String, QdrantValue>) -> (Option<String>, Metadata) {
    let mut id = None;
    let mut metadata = Metadata::new();

    for (key, value) in payload {
        if key == RESERVED_ID_KEY {
            if let Some(Kind::StringValue(s)) = value.kind {
                id = Some(s);
            }
            continue;
        }

        if let Some(value) = from_qdrant_value(value) {
            metadata.insert(key, value);
        }
    }

    (id, metadata)
}

fn to_qdrant_value(value: MetadataValue) -> QdrantValue {
    match value {
        MetadataValue::Bool(b) => QdrantValue::from(b),
        MetadataValue::Integer(i) => QdrantValue::from(i),
        MetadataValue::Float(f) => QdrantValue::from(f),
        MetadataValue::Text(s) => QdrantValue::from(s),
        MetadataValue::TextList(items) => QdrantValue {
            kind: Some(Kind::ListValue(ListValue {
                values: items.into_iter().map(QdrantValue::from).collect(),
            })),
        },
    }
}

fn from_qdrant_value(value: QdrantValue) -> Option<MetadataValue> {
    match value.kind? {
        Kind::BoolValue(b) => Some(MetadataValue::Bool(b)),
        Kind::IntegerValue(i) => Some(MetadataValue::Integer(i)),
        Kind::DoubleValue(f) => Some(MetadataValue::Float(f)),
        Kind::StringValue(s) => Some(MetadataValue::Text(s)),
        Kind::ListValue(list) => list
            .values
            .into_iter()
            .map(|item| match item.kind {
                Some(Kind::StringValue(s)) => Some(s),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(MetadataValue::TextList),
        // Nested structs and nulls are never written by this crate
        _ => None,
    }
}

/// Translate a vendor-neutral filter into `must` conditions.
pub(super) fn to_filter(filter: &QueryFilter) -> VectorResult<Option<Filter>> {
    if filter.is_empty() {
        return Ok(None);
    }

    let mut conditions = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        let condition = match value {
            MetadataValue::Bool(b) => Condition::matches(key.clone(), *b),
            MetadataValue::Integer(i) => Condition::matches(key.clone(), *i),
            MetadataValue::Text(s) => Condition::matches(key.clone(), s.clone()),
            MetadataValue::TextList(items) => Condition::matches(key.clone(), items.clone()),
            MetadataValue::Float(f) => {
                if !f.is_finite() {
                    return Err(VectorError::InvalidInput(format!(
                        "filter value for '{}' is not finite",
                        key
                    )));
                }
                // Match has no float variant; a closed range pins the value.
                Condition::range(
                    key.clone(),
                    Range {
                        gte: Some(*f),
                        lte: Some(*f),
                        ..Default::default()
                    },
                )
            }
        };
        conditions.push(condition);
    }

    Ok(Some(Filter::must(conditions)))
}
