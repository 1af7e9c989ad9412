use serde::{Deserialize, Serialize};

// --- Mist API types ---

/// The id/name pair every listed Mist object carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of `GET self`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl SelfInfo {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.email) {
            (Some(first), Some(last), _) => format!("{} {}", first, last),
            (_, _, Some(email)) => email.clone(),
            _ => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_ref_without_name() {
        let r: NamedRef = serde_json::from_str(r#"{"id":"abc","mac":"001122334455"}"#).unwrap();
        assert_eq!(r.id, "abc");
        assert_eq!(r.name, None);
    }

    #[test]
    fn test_self_display_name() {
        let info: SelfInfo = serde_json::from_str(r#"{"email":"ops@example.com"}"#).unwrap();
        assert_eq!(info.display_name(), "ops@example.com");
    }
}
