//! News item schema definitions.
//!
//! A schema variant declares, for every field, whether it is required, what
//! kind of value it holds, and the guidance text the model is given for it.
//! The guidance is part of the extraction contract: it is rendered verbatim
//! into the JSON schema embedded in every extraction prompt.
//!
//! Two variants coexist:
//!
//! | Variant | Fields |
//! |---------|--------|
//! | `minimal` | title, category, summary, full_text, image_links, source_link |
//! | `full` | title, importance, category, summary, full_text, author, publish_date, image_links, source_link |
//!
//! `title` and `source_link` are the shared core. `source_link` is assigned by
//! the pipeline and is never requested from the model.

use crate::error::PipelineError;
use crate::models::{ExtractedItem, NewsItem};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

/// Description of a whole item, shown to the model alongside the fields.
pub const ITEM_DESCRIPTION: &str = "Details about a technical news item intended for Gen AI engineers, enthusiasts, and consultants. \
One source may have multiple news items, especially if it is a newsletter or aggregator site.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Date,
    TextList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// False for fields the pipeline fills in itself.
    pub extracted: bool,
    pub description: &'static str,
}

const TITLE: FieldSpec = FieldSpec {
    name: "title",
    kind: FieldKind::Text,
    required: true,
    extracted: true,
    description: "The title of the news item, give enough context so that the reader knows what the news item is about. \
Include meaningful numbers in the title, if possible.",
};

const IMPORTANCE: FieldSpec = FieldSpec {
    name: "importance",
    kind: FieldKind::Integer,
    required: false,
    extracted: true,
    description: "The importance of the news item, on a scale of 1(low) to 5(high).",
};

const CATEGORY: FieldSpec = FieldSpec {
    name: "category",
    kind: FieldKind::Text,
    required: false,
    extracted: true,
    description: "The category of the news, such as 'AI', 'Foundational Models', 'agents', 'public news', \
'policy', 'open source', 'LLMs', etc.",
};

const SUMMARY: FieldSpec = FieldSpec {
    name: "summary",
    kind: FieldKind::Text,
    required: false,
    extracted: true,
    description: "A summary of the news item, containing all relevant details.",
};

const FULL_TEXT: FieldSpec = FieldSpec {
    name: "full_text",
    kind: FieldKind::Text,
    required: false,
    extracted: true,
    description: "The full text of the news item, including all relevant details.",
};

const AUTHOR: FieldSpec = FieldSpec {
    name: "author",
    kind: FieldKind::Text,
    required: false,
    extracted: true,
    description: "The author of the news item.",
};

const PUBLISH_DATE: FieldSpec = FieldSpec {
    name: "publish_date",
    kind: FieldKind::Date,
    required: false,
    extracted: true,
    description: "The date the news item was published, formatted YYYY-MM-DD.",
};

const IMAGE_LINKS: FieldSpec = FieldSpec {
    name: "image_links",
    kind: FieldKind::TextList,
    required: false,
    extracted: true,
    description: "Links to images related to the news item.",
};

const SOURCE_LINK: FieldSpec = FieldSpec {
    name: "source_link",
    kind: FieldKind::Text,
    required: true,
    extracted: false,
    description: "Link to the news source which this item was extracted from.",
};

const MINIMAL_FIELDS: &[FieldSpec] = &[TITLE, CATEGORY, SUMMARY, FULL_TEXT, IMAGE_LINKS, SOURCE_LINK];

const FULL_FIELDS: &[FieldSpec] = &[
    TITLE,
    IMPORTANCE,
    CATEGORY,
    SUMMARY,
    FULL_TEXT,
    AUTHOR,
    PUBLISH_DATE,
    IMAGE_LINKS,
    SOURCE_LINK,
];

/// Which set of fields items carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    Minimal,
    #[default]
    Full,
}

impl SchemaVariant {
    /// Every field items of this variant carry, in schema order.
    ///
    /// # Returns
    ///
    /// The field specs, including `source_link`, which the pipeline fills in
    /// and the model is never asked for.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SchemaVariant::Minimal => MINIMAL_FIELDS,
            SchemaVariant::Full => FULL_FIELDS,
        }
    }

    /// Whether this variant has a field called `name`.
    ///
    /// # Arguments
    ///
    /// * `name` - A field name as it appears in JSON
    ///
    /// # Returns
    ///
    /// `true` if the field is part of the variant. Undeclared keys are
    /// discarded during coercion and left out of snapshots.
    pub fn declares(self, name: &str) -> bool {
        self.fields().iter().any(|f| f.name == name)
    }

    /// Fields the model is asked to fill.
    pub fn extracted_fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().iter().filter(|f| f.extracted)
    }

    /// Render the collection schema handed to the model.
    ///
    /// Optional fields are typed as nullable so the model can answer `null`
    /// instead of guessing.
    pub fn json_schema(self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in self.extracted_fields() {
            let mut prop = match field.kind {
                FieldKind::Text => json!({ "type": "string" }),
                FieldKind::Integer => json!({ "type": "integer", "minimum": 1, "maximum": 5 }),
                FieldKind::Date => json!({ "type": "string", "format": "date" }),
                FieldKind::TextList => json!({ "type": "array", "items": { "type": "string" } }),
            };
            if field.required {
                required.push(Value::String(field.name.to_string()));
            } else if let Some(ty) = prop.get("type").cloned() {
                prop["type"] = json!([ty, "null"]);
            }
            prop["description"] = Value::String(field.description.to_string());
            properties.insert(field.name.to_string(), prop);
        }

        json!({
            "title": "NewsItemsList",
            "type": "object",
            "properties": {
                "news_items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "description": ITEM_DESCRIPTION,
                        "properties": properties,
                        "required": required,
                    }
                }
            },
            "required": ["news_items"],
        })
    }

    /// Coerce a model response into items of this variant.
    ///
    /// The response must be `{"news_items": [...]}` or a bare array; any other
    /// shape is an error for the whole call. Inside the array, an element that
    /// does not satisfy the item schema is dropped with a warning and its
    /// siblings are kept. Keys the variant does not declare are discarded.
    pub fn coerce_items(self, response: Value) -> Result<Vec<ExtractedItem>, PipelineError> {
        let elements = match response {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("news_items") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => Vec::new(),
                Some(other) => {
                    return Err(PipelineError::SchemaValidation(format!(
                        "news_items must be an array, got {}",
                        json_type_name(&other)
                    )));
                }
                None => {
                    return Err(PipelineError::SchemaValidation(
                        "response has no news_items key".to_string(),
                    ));
                }
            },
            other => {
                return Err(PipelineError::SchemaValidation(format!(
                    "expected an object or array, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let mut items = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            match self.coerce_item(element) {
                Ok(item) => items.push(item),
                Err(e) => warn!(index, error = %e, "Dropping item that does not match the schema"),
            }
        }
        Ok(items)
    }

    fn coerce_item(self, element: Value) -> Result<ExtractedItem, PipelineError> {
        let element = match element {
            Value::Object(mut obj) => {
                obj.retain(|key, _| self.declares(key));
                Value::Object(obj)
            }
            other => {
                return Err(PipelineError::SchemaValidation(format!(
                    "item must be an object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let item: ExtractedItem = serde_json::from_value(element)
            .map_err(|e| PipelineError::SchemaValidation(e.to_string()))?;
        if item.title.trim().is_empty() {
            return Err(PipelineError::SchemaValidation("title is empty".to_string()));
        }
        Ok(item)
    }

    /// Serialize an item with exactly this variant's keys.
    pub fn project(self, item: &NewsItem) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(item)? {
            Value::Object(mut obj) => {
                obj.retain(|key, _| self.declares(key));
                Ok(obj)
            }
            _ => Ok(Map::new()),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants_share_core_fields() {
        for variant in [SchemaVariant::Minimal, SchemaVariant::Full] {
            assert!(variant.declares("title"));
            assert!(variant.declares("source_link"));
        }
        assert!(!SchemaVariant::Minimal.declares("publish_date"));
        assert!(SchemaVariant::Full.declares("importance"));
    }

    #[test]
    fn test_json_schema_excludes_source_link() {
        let schema = SchemaVariant::Full.json_schema();
        let props = &schema["properties"]["news_items"]["items"]["properties"];
        assert!(props.get("source_link").is_none());
        assert!(props.get("publish_date").is_some());
        assert_eq!(
            schema["properties"]["news_items"]["items"]["required"],
            json!(["title"])
        );
    }

    #[test]
    fn test_json_schema_carries_guidance() {
        let schema = SchemaVariant::Minimal.json_schema();
        let title = &schema["properties"]["news_items"]["items"]["properties"]["title"];
        assert!(
            title["description"]
                .as_str()
                .unwrap()
                .contains("meaningful numbers")
        );
        let summary = &schema["properties"]["news_items"]["items"]["properties"]["summary"];
        assert_eq!(summary["type"], json!(["string", "null"]));
    }

    #[test]
    fn test_coerce_wrapped_and_bare() {
        let wrapped = json!({ "news_items": [{ "title": "A" }, { "title": "B" }] });
        let bare = json!([{ "title": "C" }]);
        assert_eq!(SchemaVariant::Full.coerce_items(wrapped).unwrap().len(), 2);
        assert_eq!(SchemaVariant::Full.coerce_items(bare).unwrap().len(), 1);
    }

    #[test]
    fn test_coerce_drops_items_without_title() {
        let response = json!({
            "news_items": [
                { "title": "Kept" },
                { "summary": "no title" },
                { "title": "   " },
                { "title": null },
                "not an object",
                { "title": "Also kept" }
            ]
        });
        let items = SchemaVariant::Full.coerce_items(response).unwrap();
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept", "Also kept"]);
    }

    #[test]
    fn test_coerce_rejects_bad_envelope() {
        assert!(SchemaVariant::Full.coerce_items(json!("text")).is_err());
        assert!(SchemaVariant::Full.coerce_items(json!({ "items": [] })).is_err());
        assert!(
            SchemaVariant::Full
                .coerce_items(json!({ "news_items": 3 }))
                .is_err()
        );
    }

    #[test]
    fn test_coerce_keeps_items_with_loosely_typed_importance() {
        let response = json!({ "news_items": [
            { "title": "float importance", "importance": 4.0 },
            { "title": "string importance", "importance": "4" },
            { "title": "word importance", "importance": "high" },
            { "title": "out of range", "importance": 9 }
        ]});
        let items = SchemaVariant::Full.coerce_items(response).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[1].importance, Some(json!("4")));
    }

    #[test]
    fn test_coerce_discards_undeclared_keys() {
        let response = json!([{ "title": "T", "publish_date": "2024-05", "importance": 4 }]);
        let items = SchemaVariant::Minimal.coerce_items(response).unwrap();
        assert_eq!(items[0].publish_date, None);
        assert_eq!(items[0].importance, None);
    }

    #[test]
    fn test_project_keeps_variant_keys_and_nulls() {
        let item = NewsItem {
            title: "T".to_string(),
            category: None,
            importance: Some(3),
            summary: None,
            full_text: None,
            author: None,
            publish_date: None,
            image_links: None,
            source_link: "https://example.com".to_string(),
        };
        let minimal = SchemaVariant::Minimal.project(&item).unwrap();
        let mut keys: Vec<_> = minimal.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["category", "full_text", "image_links", "source_link", "summary", "title"]
        );
        assert!(minimal["category"].is_null());

        let full = SchemaVariant::Full.project(&item).unwrap();
        assert_eq!(full.len(), 9);
        assert!(full["publish_date"].is_null());
    }
}
