// src/models/presentation.rs
//! Selective disclosure data model: the claims a holder picked, the JSON-LD
//! frame derived from them and the presentation the API returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names a holder chose to reveal.
///
/// Keeps the order names were added in and ignores duplicates. The subject
/// `id` is always revealed, so it is never stored here; JSON-LD keywords
/// (`@...`) are not claims and are dropped as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedClaimSet {
    names: Vec<String>,
}

impl SelectedClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a claim name. Returns `false` when the name was ignored.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name == "id" || name.starts_with('@') || self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SelectedClaimSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SelectedClaimSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// JSON-LD frame telling the API which subject claims a presentation
/// reveals.
///
/// Serializes to:
/// ```json
/// {
///   "@context": [...],
///   "type": [...],
///   "credentialSubject": { "@explicit": true, "id": {}, "name": {} }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisclosureFrame {
    /// Copied verbatim from the source credential; omitted if it had none
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none", default)]
    pub context: Option<Value>,

    /// Copied verbatim from the source credential; omitted if it had none
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub types: Option<Value>,

    #[serde(rename = "credentialSubject")]
    pub credential_subject: SubjectFrame,
}

/// The `credentialSubject` part of a [`DisclosureFrame`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubjectFrame {
    /// Only properties named in the frame are kept
    #[serde(rename = "@explicit")]
    pub explicit: bool,

    /// Revealed property name to match constraint (always `{}` here)
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl SubjectFrame {
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }
}

/// A signed presentation as produced by the API. Opaque to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct Presentation(pub Value);

impl Presentation {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_drops_id_keywords_and_duplicates() {
        let claims: SelectedClaimSet = ["name", "id", "course", "name", "@explicit"]
            .into_iter()
            .collect();
        assert_eq!(claims.iter().collect::<Vec<_>>(), vec!["name", "course"]);
        assert_eq!(claims.len(), 2);
        assert!(!claims.contains("id"));
    }

    #[test]
    fn test_frame_serializes_with_json_ld_keys() {
        let mut properties = Map::new();
        properties.insert("id".into(), json!({}));
        properties.insert("grade".into(), json!({}));
        let frame = DisclosureFrame {
            context: Some(json!(["https://www.w3.org/2018/credentials/v1"])),
            types: None,
            credential_subject: SubjectFrame {
                explicit: true,
                properties,
            },
        };

        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "credentialSubject": {"@explicit": true, "id": {}, "grade": {}}
            })
        );
    }
}
