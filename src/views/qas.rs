use crate::api::types::{DiseaseId, Qa};
use crate::util::clamp;

use super::scope::ViewScope;
use super::selected::DeleteDialog;
use super::Fetch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Closed,
    /// Blank draft.
    Add,
    /// Draft pre-filled from the selected entry.
    Edit,
}

/// QA entries of one disease, with the current pick and form visibility.
#[derive(Debug)]
pub struct QaList {
    disease_id: DiseaseId,
    entries: Fetch<Vec<Qa>>,
    selected: usize,
    form_mode: FormMode,
    pub delete_dialog: DeleteDialog,
    pub scope: ViewScope,
}

impl QaList {
    pub fn new(disease_id: &str) -> Self {
        Self {
            disease_id: disease_id.to_string(),
            entries: Fetch::Idle,
            selected: 0,
            form_mode: FormMode::Closed,
            delete_dialog: DeleteDialog::default(),
            scope: ViewScope::default(),
        }
    }

    pub fn disease_id(&self) -> &str {
        &self.disease_id
    }

    pub fn entries(&self) -> &Fetch<Vec<Qa>> {
        &self.entries
    }

    pub fn form_mode(&self) -> FormMode {
        self.form_mode
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    fn count(&self) -> usize {
        self.entries.loaded().map(Vec::len).unwrap_or(0)
    }

    fn max_index(&self) -> usize {
        self.count().saturating_sub(1)
    }

    pub fn mark_loading(&mut self) {
        // Keep showing the previous entries while a refetch is in flight.
        if self.entries.loaded().is_none() {
            self.entries = Fetch::Loading;
        }
    }

    /// Drop an in-flight refetch. Loaded entries and the selection survive.
    pub fn abandon_requests(&mut self) {
        if self.entries == Fetch::Loading {
            self.entries = Fetch::Idle;
        }
        self.scope.reset();
    }

    /// Install a fresh listing and pull the selection back into range.
    pub fn replace_entries(&mut self, entries: Fetch<Vec<Qa>>) {
        self.entries = entries;
        self.selected = clamp(self.selected, 0, self.max_index());
    }

    /// Select a position; out-of-range picks land on the nearest entry.
    pub fn select(&mut self, index: usize) -> usize {
        self.selected = clamp(index, 0, self.max_index());
        self.selected
    }

    pub fn selected(&self) -> Option<&Qa> {
        self.entries.loaded()?.get(self.selected)
    }

    /// No entries: the view offers "add first QA" instead of a list.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn open_add(&mut self) {
        self.form_mode = FormMode::Add;
    }

    /// Open the form on the selected entry. Refused when nothing is selected.
    pub fn open_edit(&mut self) -> Option<&Qa> {
        self.selected()?;
        self.form_mode = FormMode::Edit;
        self.selected()
    }

    pub fn close_form(&mut self) {
        self.form_mode = FormMode::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Article;

    fn qa(id: &str) -> Qa {
        Qa {
            id: id.to_string(),
            disease: None,
            article: Article {
                id: format!("art-{}", id),
                text: "text".to_string(),
            },
            questions: Vec::new(),
        }
    }

    fn list_with(n: usize) -> QaList {
        let mut list = QaList::new("H1");
        list.replace_entries(Fetch::Loaded((0..n).map(|i| qa(&i.to_string())).collect()));
        list
    }

    #[test]
    fn test_selection_reclamped_when_list_shrinks() {
        let mut list = list_with(5);
        assert_eq!(list.select(4), 4);
        list.replace_entries(Fetch::Loaded(vec![qa("a"), qa("b")]));
        assert_eq!(list.selected_index(), 1);
        assert_eq!(list.selected().unwrap().id, "b");

        list.replace_entries(Fetch::Loaded(Vec::new()));
        assert_eq!(list.selected_index(), 0);
        assert!(list.selected().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn test_select_past_end_clamps() {
        let mut list = list_with(3);
        assert_eq!(list.select(10), 2);
    }

    #[test]
    fn test_failed_listing_is_empty_but_distinct() {
        let mut list = list_with(2);
        list.select(1);
        list.replace_entries(Fetch::Failed("boom".to_string()));
        assert!(list.is_empty());
        assert_eq!(list.selected_index(), 0);
        assert_eq!(list.entries(), &Fetch::Failed("boom".to_string()));
    }

    #[test]
    fn test_form_modes() {
        let mut list = QaList::new("H1");
        assert!(list.open_edit().is_none());
        assert_eq!(list.form_mode(), FormMode::Closed);
        list.open_add();
        assert_eq!(list.form_mode(), FormMode::Add);
        list.close_form();

        let mut list = list_with(2);
        list.select(1);
        assert_eq!(list.open_edit().unwrap().id, "1");
        assert_eq!(list.form_mode(), FormMode::Edit);
    }

    #[test]
    fn test_refetch_keeps_previous_entries_visible() {
        let mut list = list_with(2);
        list.mark_loading();
        assert!(list.entries().loaded().is_some());
        let mut fresh = QaList::new("H1");
        fresh.mark_loading();
        assert_eq!(fresh.entries(), &Fetch::Loading);
    }

    #[test]
    fn test_abandon_requests_keeps_entries_and_selection() {
        let mut list = list_with(3);
        list.select(2);
        let ticket = list.scope.ticket();
        list.mark_loading();
        list.abandon_requests();
        assert!(!list.scope.is_current(ticket));
        assert_eq!(list.selected().unwrap().id, "2");

        let mut fresh = QaList::new("H1");
        fresh.mark_loading();
        fresh.abandon_requests();
        assert_eq!(fresh.entries(), &Fetch::Idle);
    }
}
