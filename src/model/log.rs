use serde::{Deserialize, Deserializer, Serialize};

use super::Record;

/// Everything added or updated on one calendar day, across all runs of that day.
///
/// `new` is append-only. `update` holds at most one entry per record id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedLog {
    #[serde(rename = "New", default, deserialize_with = "null_as_empty")]
    pub new: Vec<Record>,
    #[serde(rename = "Update", default, deserialize_with = "null_as_empty")]
    pub update: Vec<Record>,
}

/// Added and updated records produced by a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResultSets {
    pub added: Vec<Record>,
    pub updated: Vec<Record>,
}

impl RunResultSets {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

// Older logs were written with `null` for an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Record>>::deserialize(deserializer)?.unwrap_or_default())
}
