use serde_json::Value;

use crate::locale::{LanguageTagged, LocalizedItem};

/// Untyped catalog document. The upstream owns the schema, so fields are
/// looked up lazily with dotted paths (`"types.0.type.name"`) and missing or
/// mistyped values read as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(Value);

impl Record {
    pub fn new(value: Value) -> Self {
        Record(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Walks a dotted path; numeric segments index into arrays.
    pub fn at(&self, path: &str) -> Option<&Value> {
        lookup(&self.0, path)
    }

    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.at(path).and_then(Value::as_str)
    }

    pub fn u64_at(&self, path: &str) -> Option<u64> {
        self.at(path).and_then(Value::as_u64)
    }

    pub fn record_at(&self, path: &str) -> Option<Record> {
        self.at(path).cloned().map(Record)
    }

    /// Elements of the array at `path`, or an empty list.
    pub fn records_at(&self, path: &str) -> Vec<Record> {
        match self.at(path) {
            Some(Value::Array(items)) => items.iter().cloned().map(Record).collect(),
            _ => Vec::new(),
        }
    }

    /// The list endpoint's `count` field.
    pub fn count(&self) -> Option<u64> {
        self.u64_at("count")
    }

    /// Array at `field` as language-tagged items, tag taken from
    /// `language.name`. Items without a language are skipped.
    pub fn localized(&self, field: &str) -> Vec<LocalizedItem<Record>> {
        self.records_at(field)
            .into_iter()
            .filter_map(|item| {
                let tag = item.str_at("language.name")?.to_string();
                Some(LocalizedItem::new(tag, item))
            })
            .collect()
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Record(value)
    }
}

impl LanguageTagged for Record {
    fn language_tag(&self) -> &str {
        self.str_at("language.name").unwrap_or("")
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pokemon() -> Record {
        Record::new(json!({
            "id": 25,
            "name": "pikachu",
            "types": [
                { "slot": 1, "type": { "name": "electric", "url": "https://pokeapi.co/api/v2/type/13/" } }
            ],
            "sprites": { "front_default": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png", "back_default": null },
            "names": [
                { "language": { "name": "ja" }, "name": "ピカチュウ" },
                { "language": { "name": "en" }, "name": "Pikachu" },
                { "name": "no language" }
            ]
        }))
    }

    #[test]
    fn test_dotted_paths() {
        let record = pokemon();
        assert_eq!(record.u64_at("id"), Some(25));
        assert_eq!(record.str_at("types.0.type.name"), Some("electric"));
        assert_eq!(record.str_at("types.1.type.name"), None);
        assert_eq!(record.str_at("sprites.back_default"), None);
        assert_eq!(record.str_at("id"), None);
        assert_eq!(record.at(""), Some(record.value()));
    }

    #[test]
    fn test_records_at_missing_is_empty() {
        let record = pokemon();
        assert_eq!(record.records_at("types").len(), 1);
        assert!(record.records_at("abilities").is_empty());
        assert!(record.records_at("name").is_empty());
    }

    #[test]
    fn test_localized_skips_untagged() {
        let names = pokemon().localized("names");
        let tags: Vec<&str> = names.iter().map(|n| n.language_tag()).collect();
        assert_eq!(tags, vec!["ja", "en"]);
        assert_eq!(names[1].payload.str_at("name"), Some("Pikachu"));
    }

    #[test]
    fn test_records_select_by_language() {
        let names = pokemon().records_at("names");
        let picked = crate::locale::select_one(&names, &["en"]).unwrap();
        assert_eq!(picked.str_at("name"), Some("Pikachu"));
        assert_eq!(names[2].language_tag(), "");
        assert!(crate::locale::select_one(&names, &[""]).is_none());
    }

    #[test]
    fn test_count() {
        let list = Record::new(json!({ "count": 1025, "results": [] }));
        assert_eq!(list.count(), Some(1025));
        assert_eq!(pokemon().count(), None);
    }
}
