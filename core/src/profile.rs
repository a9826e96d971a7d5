//! The authenticated user's profile and its display fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Initials shown when either name part is missing.
pub const PLACEHOLDER_INITIALS: &str = "US";

/// Profile of the current user as returned by `GET /user`.
///
/// `initials` and `fullname` are derived from `name`/`lastname` whenever a
/// profile is loaded and are never serialized, so they neither reach the
/// backend nor the persisted snapshot. Unknown backend fields are kept in
/// `extra` and round-trip untouched.
///
/// The known fields are read leniently: a numeric phone is kept as text, a
/// quoted id is parsed, and a value of any other shape reads as absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub initials: String,
    #[serde(skip)]
    pub fullname: String,
}

impl UserProfile {
    /// Decode a profile from a JSON value and compute its display fields.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut profile: UserProfile = serde_json::from_value(value)?;
        profile.refresh_derived();
        Ok(profile)
    }

    /// Recompute `initials` and `fullname` from the name parts.
    pub fn refresh_derived(&mut self) {
        // Echoed display fields must not round-trip back to the server.
        self.extra.remove("initials");
        self.extra.remove("fullname");
        self.initials = initials(self.name.as_deref(), self.lastname.as_deref());
        self.fullname = fullname(self.name.as_deref(), self.lastname.as_deref());
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// First letter of each name part, uppercased, or `"US"` if either is
/// missing or empty.
pub fn initials(name: Option<&str>, lastname: Option<&str>) -> String {
    let first = |s: Option<&str>| s.and_then(|s| s.chars().next());
    match (first(name), first(lastname)) {
        (Some(n), Some(l)) => n.to_uppercase().chain(l.to_uppercase()).collect(),
        _ => PLACEHOLDER_INITIALS.to_string(),
    }
}

/// Name parts joined by a single space, trimmed.
pub fn fullname(name: Option<&str>, lastname: Option<&str>) -> String {
    format!("{} {}", name.unwrap_or_default(), lastname.unwrap_or_default())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derived_fields_from_both_parts() {
        assert_eq!(initials(Some("Ana"), Some("Lopez")), "AL");
        assert_eq!(fullname(Some("Ana"), Some("Lopez")), "Ana Lopez");
    }

    #[test]
    fn derived_fields_without_name_parts() {
        assert_eq!(initials(None, None), "US");
        assert_eq!(fullname(None, None), "");
    }

    #[test]
    fn one_missing_part_uses_placeholder_initials() {
        assert_eq!(initials(Some("ana"), None), "US");
        assert_eq!(initials(Some(""), Some("lopez")), "US");
        assert_eq!(fullname(None, Some("Lopez")), "Lopez");
        assert_eq!(initials(Some("ana"), Some("lopez")), "AL");
    }

    #[test]
    fn from_value_computes_display_fields_and_keeps_extra() {
        let profile = UserProfile::from_value(json!({
            "id": 7,
            "name": "Ana",
            "lastname": "Lopez",
            "email": "ana@example.com",
            "phone": null,
            "empresa_id": 3,
            "initials": "ZZ"
        }))
        .unwrap();
        assert_eq!(profile.id, Some(7));
        assert_eq!(profile.initials, "AL");
        assert_eq!(profile.fullname, "Ana Lopez");
        assert_eq!(profile.extra.get("empresa_id"), Some(&json!(3)));
        assert!(!profile.extra.contains_key("initials"));
    }

    #[test]
    fn loosely_typed_fields_are_accepted() {
        let profile = UserProfile::from_value(json!({
            "id": "7",
            "name": "Ana",
            "lastname": "Lopez",
            "email": {"primary": "ana@example.com"},
            "phone": 5550100
        }))
        .unwrap();
        assert_eq!(profile.id, Some(7));
        assert_eq!(profile.phone.as_deref(), Some("5550100"));
        assert_eq!(profile.email, None);
        assert_eq!(profile.initials, "AL");

        let profile = UserProfile::from_value(json!({"id": -3, "name": null})).unwrap();
        assert_eq!(profile.id, None);
        assert_eq!(profile.name, None);
    }

    #[test]
    fn display_fields_are_never_serialized() {
        let profile =
            UserProfile::from_value(json!({"name": "Ana", "lastname": "Lopez"})).unwrap();
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("initials").is_none());
        assert!(value.get("fullname").is_none());
        assert_eq!(value["name"], "Ana");
    }
}
