use serde::Serialize;

/// A contact pulled off a page. Has no id until the store saves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactRecord {
    pub name: String,
    pub title: String,
    pub email: String,
}

impl ContactRecord {
    /// Builds a record from raw captures, trimming each field.
    pub fn from_raw(name: &str, title: &str, email: &str) -> Self {
        ContactRecord {
            name: name.trim().to_string(),
            title: title.trim().to_string(),
            email: email.trim().to_string(),
        }
    }
}

/// A record as it lives in the `contacts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredContact {
    pub id: i64,
    #[serde(flatten)]
    pub record: ContactRecord,
}
