use serde::{Deserialize, Deserializer, Serialize};

/// Account that owns a repository. Only the `id` takes part in blacklisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub login: String,
}

/// A repository as returned by the GitHub search API.
///
/// Two records with the same `id` are the same repository. Every field,
/// including `id`, takes part in equality, so a changed description or a
/// renamed repository compares unequal to its stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub name: String,
    /// `None` when the repository has no description. An empty string in
    /// stored history reads as `None` too.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub description: Option<String>,
    pub html_url: String,
    pub owner: Owner,
}

impl Record {
    pub fn new(id: u64, name: impl Into<String>, owner: Owner) -> Self {
        let name = name.into();
        Self {
            id,
            html_url: format!("https://github.com/{}/{}", owner.login, name),
            name,
            description: None,
            owner,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description text, or an empty string when the repository has none.
    pub fn summary(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner {
            id: 7,
            login: "alice".to_string(),
        }
    }

    #[test]
    fn test_record_equality_covers_description() {
        let a = Record::new(1, "CVE-2024-0001-poc", owner()).with_description("old");
        let b = Record::new(1, "CVE-2024-0001-poc", owner()).with_description("new");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_record_deserializes_github_item() {
        let json = r#"{
            "id": 42,
            "name": "CVE-2023-1234",
            "full_name": "bob/CVE-2023-1234",
            "description": null,
            "html_url": "https://github.com/bob/CVE-2023-1234",
            "stargazers_count": 3,
            "owner": {"id": 9, "login": "bob", "type": "User"}
        }"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.description, None);
        assert_eq!(record.owner.login, "bob");
        assert_eq!(record.summary(), "");
    }

    #[test]
    fn test_record_new_builds_html_url() {
        let record = Record::new(1, "poc", owner());
        assert_eq!(record.html_url, "https://github.com/alice/poc");
    }

    #[test]
    fn test_empty_description_matches_missing_one() {
        let stored = r#"{
            "id": 5,
            "name": "CVE-2022-0005",
            "description": "",
            "html_url": "https://github.com/alice/CVE-2022-0005",
            "owner": {"id": 7, "login": "alice"}
        }"#;

        let record: Record = serde_json::from_str(stored).unwrap();
        assert_eq!(record.description, None);
        assert_eq!(record, Record::new(5, "CVE-2022-0005", owner()));
    }
}
