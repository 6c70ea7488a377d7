use crate::error::SendError;

/// Compose box state: the draft being typed and the last send error.
#[derive(Debug, Default, Clone)]
pub struct Composer {
    draft: String,
    error: Option<String>,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Trimmed content ready to send.
    pub fn prepared(&self) -> Result<String, SendError> {
        let content = self.draft.trim();
        if content.is_empty() {
            return Err(SendError::EmptyContent);
        }
        Ok(content.to_string())
    }

    /// Clear the draft after a successful send, unless it was edited while
    /// the request was in flight.
    pub fn sent(&mut self, snapshot: &str) {
        if self.draft == snapshot {
            self.draft.clear();
        }
        self.error = None;
    }

    /// Record an inline error. The draft is kept for a retry.
    pub fn failed(&mut self, error: &SendError) {
        self.error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_draft_is_empty() {
        let mut composer = Composer::default();
        composer.set_draft("  \n\t ");
        assert!(matches!(composer.prepared(), Err(SendError::EmptyContent)));
    }

    #[test]
    fn failure_keeps_draft_and_success_clears_it() {
        let mut composer = Composer::default();
        composer.set_draft(" hello ");
        assert_eq!(composer.prepared().unwrap(), "hello");

        composer.failed(&SendError::UnresolvedRecipient);
        assert_eq!(composer.draft(), " hello ");
        assert!(composer.error().is_some());

        composer.sent(" hello ");
        assert_eq!(composer.draft(), "");
        assert_eq!(composer.error(), None);
    }

    #[test]
    fn edits_during_send_survive() {
        let mut composer = Composer::default();
        composer.set_draft("first");
        composer.set_draft("first, and more");
        composer.sent("first");
        assert_eq!(composer.draft(), "first, and more");
    }
}
