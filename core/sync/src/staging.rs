//! Local record of field edits awaiting save.

/// Insertion-ordered set of staged field names.
///
/// Re-staging a field keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedEdits {
    fields: Vec<String>,
}

impl StagedEdits {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `field`. Returns false if it was already staged.
    pub fn stage(&mut self, field: &str) -> bool {
        if self.contains(field) {
            return false;
        }
        self.fields.push(field.to_string());
        true
    }

    /// Drop `field` after it has been written some other way.
    pub fn unstage(&mut self, field: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f != field);
        self.fields.len() != before
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Staged field names in staging order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Owned copy of the staged names.
    pub fn names(&self) -> Vec<String> {
        self.fields.clone()
    }

    /// Clear all staged changes.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Get count of staged changes.
    pub fn count(&self) -> usize {
        self.fields.len()
    }

    /// Check if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_is_idempotent() {
        let mut staged = StagedEdits::new();
        assert!(staged.stage("StatusID"));
        assert!(staged.stage("Tags"));
        assert!(!staged.stage("StatusID"));

        assert_eq!(staged.count(), 2);
        assert_eq!(staged.iter().collect::<Vec<_>>(), vec!["StatusID", "Tags"]);
    }

    #[test]
    fn test_unstage() {
        let mut staged = StagedEdits::new();
        staged.stage("Additional");
        staged.stage("Location");

        assert!(staged.unstage("Additional"));
        assert!(!staged.unstage("Additional"));
        assert_eq!(staged.names(), vec!["Location".to_string()]);
    }

    #[test]
    fn test_clear() {
        let mut staged = StagedEdits::new();
        staged.stage("Phone");
        staged.clear();
        assert!(staged.is_empty());
        assert!(!staged.contains("Phone"));
    }
}
