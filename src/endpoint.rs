use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Status code used when a definition is saved without one
pub const DEFAULT_STATUS: u16 = 200;

/// HTTP verbs a mock endpoint can be registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete, Verb::Patch];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
        }
    }

    /// Map an inbound HTTP method onto a verb; anything outside the set is `None`
    pub fn from_method(method: &axum::http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ();

    /// Case-insensitive: `get` and `GET` name the same verb
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Ordered name → value metadata attached to a definition.
///
/// Serialized as a JSON object whose key order is the insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Zip parallel name/value lists, dropping blank names.
    ///
    /// A missing value becomes the empty string. A repeated name keeps its
    /// first position and takes the last value.
    pub fn from_parallel(names: &[String], values: &[String]) -> Self {
        let mut params = Params::default();
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                continue;
            }
            let value = values.get(index).cloned().unwrap_or_default();
            params.insert(name.clone(), value);
        }
        params
    }

    pub fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = Params;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of parameter names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Params, A::Error> {
                let mut params = Params::default();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    params.insert(name, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

/// A persisted mock endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EndpointDefinition {
    pub id: String,
    pub verb: Verb,
    pub pattern: String,
    pub response: String,
    pub status: u16,
    #[schema(value_type = Object)]
    pub params: Params,
}

/// Raw create/update payload as submitted by the admin client
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct EndpointInput {
    pub verb: Option<String>,
    pub pattern: Option<String>,
    pub response: Option<String>,
    /// Number or numeric string; blank or null means "not supplied"
    #[schema(value_type = Option<Object>)]
    pub status: Option<JsonValue>,
    #[serde(default)]
    pub params_key: Vec<String>,
    #[serde(default)]
    pub params_value: Vec<String>,
}

/// Status as it stands after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusField {
    Absent,
    Code(i64),
    Malformed(String),
}

/// Normalized projection of an [`EndpointInput`]: only the known fields,
/// plus the params map built from the parallel lists
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDraft {
    pub verb: Option<String>,
    pub pattern: Option<String>,
    pub response: Option<String>,
    pub status: StatusField,
    pub params: Params,
}

impl EndpointInput {
    pub fn normalize(&self) -> EndpointDraft {
        let status = match &self.status {
            None | Some(JsonValue::Null) => StatusField::Absent,
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(code) => StatusField::Code(code),
                None => StatusField::Malformed(n.to_string()),
            },
            Some(JsonValue::String(s)) if s.trim().is_empty() => StatusField::Absent,
            Some(JsonValue::String(s)) => match s.trim().parse::<i64>() {
                Ok(code) => StatusField::Code(code),
                Err(_) => StatusField::Malformed(s.clone()),
            },
            Some(other) => StatusField::Malformed(other.to_string()),
        };

        EndpointDraft {
            verb: self.verb.clone(),
            pattern: self.pattern.clone(),
            response: self.response.clone(),
            status,
            params: Params::from_parallel(&self.params_key, &self.params_value),
        }
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn duplicate(verb: Verb, pattern: &str) -> Self {
        Self::new(
            "pattern",
            format!("{} {} already exists: verb and pattern combination must be unique", verb, pattern),
        )
    }

    pub fn is_duplicate(&self) -> bool {
        self.message.contains("combination must be unique")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Field values that passed every check that does not need the store
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFields {
    pub verb: Verb,
    pub pattern: String,
    pub response: String,
    pub status: u16,
    pub params: Params,
}

impl ValidFields {
    pub fn into_definition(self, id: String) -> EndpointDefinition {
        EndpointDefinition {
            id,
            verb: self.verb,
            pattern: self.pattern,
            response: self.response,
            status: self.status,
            params: self.params,
        }
    }
}

impl EndpointDraft {
    /// Resolve a draft for a brand new definition; an absent status becomes 200
    pub fn for_create(self) -> Result<ValidFields, Vec<FieldError>> {
        let status = match self.status {
            StatusField::Absent => StatusField::Code(DEFAULT_STATUS as i64),
            other => other,
        };
        validate(
            self.verb.as_deref(),
            self.pattern.as_deref(),
            self.response.as_deref(),
            &status,
            self.params,
        )
    }

    /// Merge the supplied fields over `existing` and validate the result.
    ///
    /// Params replace the existing ones only when at least one pair survived
    /// normalization.
    pub fn merge_into(self, existing: &EndpointDefinition) -> Result<ValidFields, Vec<FieldError>> {
        let verb = self.verb.unwrap_or_else(|| existing.verb.to_string());
        let pattern = self.pattern.unwrap_or_else(|| existing.pattern.clone());
        let response = self.response.unwrap_or_else(|| existing.response.clone());
        let status = match self.status {
            StatusField::Absent => StatusField::Code(existing.status as i64),
            other => other,
        };
        let params = if self.params.is_empty() {
            existing.params.clone()
        } else {
            self.params
        };
        validate(Some(&verb), Some(&pattern), Some(&response), &status, params)
    }
}

/// Starts with `/` and contains no whitespace anywhere.
///
/// Dispatch compares against the request path only, so a query (`?`) or
/// fragment (`#`) part could never match and is rejected here.
pub fn is_valid_pattern(pattern: &str) -> bool {
    pattern.starts_with('/')
        && !pattern
            .chars()
            .any(|c| c.is_whitespace() || c == '?' || c == '#')
}

fn validate(
    verb: Option<&str>,
    pattern: Option<&str>,
    response: Option<&str>,
    status: &StatusField,
    params: Params,
) -> Result<ValidFields, Vec<FieldError>> {
    let mut errors = Vec::new();

    let response = match response {
        Some(body) if !body.is_empty() => Some(body.to_string()),
        _ => {
            errors.push(FieldError::new("response", "can't be blank"));
            None
        }
    };

    let status = match status {
        StatusField::Absent => {
            errors.push(FieldError::new("status", "can't be blank"));
            None
        }
        StatusField::Malformed(raw) => {
            errors.push(FieldError::new("status", format!("must be an integer, got '{}'", raw)));
            None
        }
        StatusField::Code(code) => match u16::try_from(*code) {
            Ok(code) if (100..=599).contains(&code) => Some(code),
            _ => {
                errors.push(FieldError::new(
                    "status",
                    format!("must be an HTTP status code between 100 and 599, got {}", code),
                ));
                None
            }
        },
    };

    let verb = match verb.map(str::parse::<Verb>) {
        Some(Ok(verb)) => Some(verb),
        _ => {
            let supported: Vec<&str> = Verb::ALL.iter().map(|v| v.as_str()).collect();
            errors.push(FieldError::new(
                "verb",
                format!("only the following methods are supported: {}", supported.join(", ")),
            ));
            None
        }
    };

    let pattern = match pattern {
        Some(p) if is_valid_pattern(p) => Some(p.to_string()),
        _ => {
            errors.push(FieldError::new(
                "pattern",
                "must be a URL path starting with / with no whitespace, query or fragment",
            ));
            None
        }
    };

    match (verb, pattern, response, status) {
        (Some(verb), Some(pattern), Some(response), Some(status)) if errors.is_empty() => {
            Ok(ValidFields {
                verb,
                pattern,
                response,
                status,
                params,
            })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn input(verb: &str, pattern: &str, response: &str) -> EndpointInput {
        EndpointInput {
            verb: Some(verb.to_string()),
            pattern: Some(pattern.to_string()),
            response: Some(response.to_string()),
            ..Default::default()
        }
    }

    fn existing() -> EndpointDefinition {
        let mut params = Params::default();
        params.insert("page".to_string(), "1".to_string());
        EndpointDefinition {
            id: "abc".to_string(),
            verb: Verb::Get,
            pattern: "/users".to_string(),
            response: "[]".to_string(),
            status: 202,
            params,
        }
    }

    #[test]
    fn test_verb_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Verb>(), Ok(Verb::Get));
        assert_eq!("PATCH".parse::<Verb>(), Ok(Verb::Patch));
        assert_eq!("Delete".parse::<Verb>(), Ok(Verb::Delete));
        assert!("HEAD".parse::<Verb>().is_err());
        assert!("".parse::<Verb>().is_err());
    }

    #[test]
    fn test_verb_from_method() {
        assert_eq!(Verb::from_method(&axum::http::Method::PUT), Some(Verb::Put));
        assert_eq!(Verb::from_method(&axum::http::Method::OPTIONS), None);
        assert_eq!(Verb::from_method(&axum::http::Method::HEAD), None);
    }

    #[test]
    fn test_params_drop_blank_names() {
        let params = Params::from_parallel(
            &strings(&["id", "", "  ", "name"]),
            &strings(&["7", "ignored", "ignored", "bob"]),
        );
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("name"), Some("bob"));
    }

    #[test]
    fn test_params_missing_value_is_empty() {
        let params = Params::from_parallel(&strings(&["a", "b"]), &strings(&["1"]));
        assert_eq!(params.get("b"), Some(""));
    }

    #[test]
    fn test_params_repeated_name_keeps_position_takes_last_value() {
        let params = Params::from_parallel(&strings(&["a", "b", "a"]), &strings(&["1", "2", "3"]));
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_params_serialize_preserves_order() {
        let params = Params::from_parallel(&strings(&["zeta", "alpha"]), &strings(&["1", "2"]));
        let text = serde_json::to_string(&params).unwrap();
        assert_eq!(text, r#"{"zeta":"1","alpha":"2"}"#);

        let back: Params = serde_json::from_str(&text).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_create_defaults_status_to_200() {
        let fields = input("GET", "/ping", "pong").normalize().for_create().unwrap();
        assert_eq!(fields.status, 200);
        assert_eq!(fields.verb, Verb::Get);
    }

    #[test]
    fn test_blank_status_string_defaults_to_200() {
        let mut raw = input("post", "/x", "{}");
        raw.status = Some(json!("  "));
        assert_eq!(raw.normalize().for_create().unwrap().status, 200);
    }

    #[test]
    fn test_numeric_string_status_is_accepted() {
        let mut raw = input("post", "/x", "{}");
        raw.status = Some(json!("201"));
        assert_eq!(raw.normalize().for_create().unwrap().status, 201);
    }

    #[test]
    fn test_malformed_and_out_of_range_status_rejected() {
        let mut raw = input("GET", "/x", "{}");
        raw.status = Some(json!("abc"));
        let errors = raw.normalize().for_create().unwrap_err();
        assert_eq!(errors[0].field, "status");

        raw.status = Some(json!(1000));
        let errors = raw.normalize().for_create().unwrap_err();
        assert!(errors[0].message.contains("between 100 and 599"));
    }

    #[test]
    fn test_pattern_format() {
        assert!(is_valid_pattern("/"));
        assert!(is_valid_pattern("/a/b"));
        assert!(is_valid_pattern("/café"));
        assert!(is_valid_pattern("/a%20b"));
        assert!(!is_valid_pattern("/a/b?c=d"));
        assert!(!is_valid_pattern("/a#top"));
        assert!(!is_valid_pattern("nope"));
        assert!(!is_valid_pattern(""));
        assert!(!is_valid_pattern("/with space"));
        assert!(!is_valid_pattern("/tab\there"));
        assert!(!is_valid_pattern("/trailing\n"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let raw = EndpointInput {
            verb: Some("TRACE".to_string()),
            pattern: Some("nope".to_string()),
            response: Some(String::new()),
            ..Default::default()
        };
        let errors = raw.normalize().for_create().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["response", "verb", "pattern"]);
        assert!(errors[1].message.contains("GET, POST, PUT, DELETE, PATCH"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let errors = EndpointInput::default().normalize().for_create().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_merge_changes_only_supplied_fields() {
        let raw = EndpointInput {
            response: Some("X".to_string()),
            ..Default::default()
        };
        let merged = raw.normalize().merge_into(&existing()).unwrap();
        assert_eq!(merged.response, "X");
        assert_eq!(merged.verb, Verb::Get);
        assert_eq!(merged.pattern, "/users");
        assert_eq!(merged.status, 202);
        assert_eq!(merged.params.get("page"), Some("1"));
    }

    #[test]
    fn test_merge_replaces_params_only_when_supplied() {
        let raw = EndpointInput {
            params_key: strings(&["", "limit"]),
            params_value: strings(&["x", "10"]),
            ..Default::default()
        };
        let merged = raw.normalize().merge_into(&existing()).unwrap();
        assert_eq!(merged.params.get("page"), None);
        assert_eq!(merged.params.get("limit"), Some("10"));

        let blank_only = EndpointInput {
            params_key: strings(&[""]),
            params_value: strings(&["x"]),
            ..Default::default()
        };
        let merged = blank_only.normalize().merge_into(&existing()).unwrap();
        assert_eq!(merged.params.get("page"), Some("1"));
    }

    #[test]
    fn test_merge_validates_result() {
        let raw = EndpointInput {
            pattern: Some("bad pattern".to_string()),
            ..Default::default()
        };
        let errors = raw.normalize().merge_into(&existing()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "pattern");
    }

    #[test]
    fn test_duplicate_field_error() {
        let err = FieldError::duplicate(Verb::Get, "/a");
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("GET /a"));
    }

    #[test]
    fn test_definition_serializes_uppercase_verb() {
        let value = serde_json::to_value(existing()).unwrap();
        assert_eq!(value["verb"], "GET");
        assert_eq!(value["params"]["page"], "1");
    }
}
