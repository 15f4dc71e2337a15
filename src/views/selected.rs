use crate::api::types::QaId;

/// Confirmation gate in front of the irreversible delete mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeleteDialog {
    #[default]
    Closed,
    Open { qa_id: QaId },
    Deleting { qa_id: QaId },
}

impl DeleteDialog {
    pub fn request(&mut self, qa_id: &str) {
        if !self.is_deleting() {
            *self = DeleteDialog::Open {
                qa_id: qa_id.to_string(),
            };
        }
    }

    /// Cancel is ignored while the delete is in flight.
    pub fn cancel(&mut self) -> bool {
        if let DeleteDialog::Open { .. } = self {
            *self = DeleteDialog::Closed;
            return true;
        }
        false
    }

    /// Move to `Deleting` and hand out the id to delete.
    pub fn confirm(&mut self) -> Option<QaId> {
        match self {
            DeleteDialog::Open { qa_id } => {
                let qa_id = qa_id.clone();
                *self = DeleteDialog::Deleting {
                    qa_id: qa_id.clone(),
                };
                Some(qa_id)
            }
            _ => None,
        }
    }

    /// The dialog closes once the mutation settles, whatever the outcome.
    pub fn settle(&mut self) {
        *self = DeleteDialog::Closed;
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self, DeleteDialog::Deleting { .. })
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, DeleteDialog::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_requires_open_dialog() {
        let mut dialog = DeleteDialog::default();
        assert_eq!(dialog.confirm(), None);
        dialog.request("qa-1");
        assert_eq!(dialog.confirm(), Some("qa-1".to_string()));
        assert!(dialog.is_deleting());
        assert_eq!(dialog.confirm(), None);
    }

    #[test]
    fn test_cancel_blocked_while_deleting() {
        let mut dialog = DeleteDialog::default();
        dialog.request("qa-1");
        dialog.confirm();
        assert!(!dialog.cancel());
        dialog.request("qa-2");
        assert!(dialog.is_deleting());
        dialog.settle();
        assert!(!dialog.is_open());
    }
}
