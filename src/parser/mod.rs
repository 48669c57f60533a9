pub mod members;

use crate::contact::ContactRecord;

pub use members::PatternExtractor;

/// Turns raw page HTML into contact records.
///
/// Never fails: markup that doesn't match simply yields no records.
pub trait ContactExtractor {
    fn extract(&self, html: &str) -> Vec<ContactRecord>;
}
