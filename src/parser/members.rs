use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::ContactExtractor;
use crate::contact::ContactRecord;

/// Member listing layout: a `member_name` div holding a link with the name,
/// then a `member_info_content` div with the title, then a mailto link.
pub const MEMBER_PATTERN: &str = concat!(
    r#"(?s)<div class="member_name">.*?<a[^>]*>(?P<name>.*?)</a>.*?"#,
    r#"<div class="member_info_content">(?P<title>.*?)</div>.*?"#,
    r#"<a href="mailto:[^"]*">(?P<email>[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})</a>"#,
);

const REQUIRED_GROUPS: [&str; 3] = ["name", "title", "email"];

static MEMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(MEMBER_PATTERN).unwrap());

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid contact pattern: {0}")]
    Invalid(#[from] regex::Error),
    #[error("contact pattern is missing the named group `{0}`")]
    MissingGroup(&'static str),
}

/// Regex-driven extractor. Each non-overlapping match is one contact.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    re: Regex,
}

impl PatternExtractor {
    /// Custom pattern; must define the `name`, `title` and `email` groups.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let re = Regex::new(pattern)?;
        for group in REQUIRED_GROUPS {
            if !re.capture_names().flatten().any(|n| n == group) {
                return Err(PatternError::MissingGroup(group));
            }
        }
        Ok(PatternExtractor { re })
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        PatternExtractor {
            re: MEMBER_RE.clone(),
        }
    }
}

impl ContactExtractor for PatternExtractor {
    fn extract(&self, html: &str) -> Vec<ContactRecord> {
        let mut contacts = Vec::new();

        for caps in self.re.captures_iter(html) {
            let field = |g: &str| caps.name(g).map_or("", |m| m.as_str());
            let record = ContactRecord::from_raw(field("name"), field("title"), field("email"));
            if record.name.is_empty() {
                debug!("Skipping match with empty name ({})", record.email);
                continue;
            }
            contacts.push(record);
        }

        debug!("Matched {} contacts in {} bytes of HTML", contacts.len(), html.len());
        contacts
    }
}
