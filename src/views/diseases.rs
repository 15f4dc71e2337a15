use crate::api::types::{Disease, DiseaseId, DiseaseRef};

use super::scope::ViewScope;
use super::Fetch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiseaseTab {
    #[default]
    Info,
    Qas,
}

/// A search hit from the id listing, with its position in the unfiltered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundDisease<'a> {
    pub id: &'a str,
    pub original_index: usize,
}

/// Browser over the two independent disease listings: the id-only index used
/// for search, and the full records used for detail.
///
/// The selection is a disease id. Positional picks are resolved against the
/// id listing at the moment they are made, and detail is looked up by id, so
/// the two listings may disagree on order without showing the wrong disease.
#[derive(Debug, Default)]
pub struct DiseaseBrowser {
    ids: Fetch<Vec<DiseaseRef>>,
    details: Fetch<Vec<Disease>>,
    search: String,
    selected_id: Option<DiseaseId>,
    tab: DiseaseTab,
    pub scope: ViewScope,
}

impl DiseaseBrowser {
    pub fn ids(&self) -> &Fetch<Vec<DiseaseRef>> {
        &self.ids
    }

    pub fn details(&self) -> &Fetch<Vec<Disease>> {
        &self.details
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn tab(&self) -> DiseaseTab {
        self.tab
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn mark_loading(&mut self) {
        self.ids = Fetch::Loading;
        self.details = Fetch::Loading;
    }

    /// Drop in-flight listing requests. Loaded listings, selection and search
    /// survive.
    pub fn abandon_requests(&mut self) {
        if self.ids == Fetch::Loading {
            self.ids = Fetch::Idle;
        }
        if self.details == Fetch::Loading {
            self.details = Fetch::Idle;
        }
        self.scope.reset();
    }

    pub fn set_ids(&mut self, ids: Fetch<Vec<DiseaseRef>>) {
        self.ids = ids;
    }

    pub fn set_details(&mut self, details: Fetch<Vec<Disease>>) {
        self.details = details;
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    pub fn set_tab(&mut self, tab: DiseaseTab) {
        self.tab = tab;
    }

    /// Ids starting with the search term (case-sensitive), in listing order.
    pub fn filtered(&self) -> Vec<FoundDisease<'_>> {
        filter_by_prefix(self.ids.loaded().map(Vec::as_slice).unwrap_or(&[]), &self.search)
    }

    /// Select by position in the unfiltered id listing.
    pub fn select_by_index(&mut self, original_index: usize) -> Option<&str> {
        let id = self.ids.loaded()?.get(original_index)?.id.clone();
        self.selected_id = Some(id);
        self.selected_id.as_deref()
    }

    /// Select by id. Unknown ids are refused once either listing is loaded.
    /// Before that, ids are taken on trust only while no listing has failed.
    pub fn select_by_id(&mut self, id: &str) -> bool {
        let in_ids = self
            .ids
            .loaded()
            .map(|ids| ids.iter().any(|d| d.id == id));
        let in_details = self
            .details
            .loaded()
            .map(|details| details.iter().any(|d| d.id == id));
        let known = match (in_ids, in_details) {
            (None, None) => {
                !matches!(self.ids, Fetch::Failed(_)) && !matches!(self.details, Fetch::Failed(_))
            }
            (a, b) => a.unwrap_or(false) || b.unwrap_or(false),
        };
        if known {
            self.selected_id = Some(id.to_string());
        }
        known
    }

    /// The disease shown in the detail pane. With nothing selected, the first
    /// record of the full listing is shown.
    pub fn selected_disease(&self) -> Option<&Disease> {
        let details = self.details.loaded()?;
        match &self.selected_id {
            Some(id) => details.iter().find(|d| &d.id == id),
            None => details.first(),
        }
    }
}

pub fn filter_by_prefix<'a>(ids: &'a [DiseaseRef], term: &str) -> Vec<FoundDisease<'a>> {
    ids.iter()
        .enumerate()
        .filter(|(_, d)| d.id.starts_with(term))
        .map(|(original_index, d)| FoundDisease {
            id: &d.id,
            original_index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::DiseaseDbLinks;

    fn refs(ids: &[&str]) -> Vec<DiseaseRef> {
        ids.iter().map(|id| DiseaseRef { id: id.to_string() }).collect()
    }

    fn disease(id: &str) -> Disease {
        Disease {
            id: id.to_string(),
            names: vec![format!("{} name", id)],
            category: "cat".to_string(),
            description: "desc".to_string(),
            db_links: DiseaseDbLinks::default(),
        }
    }

    #[test]
    fn test_prefix_filter_keeps_order_and_index() {
        let ids = refs(&["flu", "flux", "cold"]);
        let found = filter_by_prefix(&ids, "flu");
        assert_eq!(
            found,
            vec![
                FoundDisease { id: "flu", original_index: 0 },
                FoundDisease { id: "flux", original_index: 1 },
            ]
        );
    }

    #[test]
    fn test_prefix_filter_is_case_sensitive() {
        let ids = refs(&["Flu", "flu"]);
        let found = filter_by_prefix(&ids, "F");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original_index, 0);
        assert_eq!(filter_by_prefix(&ids, "").len(), 2);
    }

    #[test]
    fn test_selection_survives_differently_ordered_listings() {
        let mut browser = DiseaseBrowser::default();
        browser.set_ids(Fetch::Loaded(refs(&["a", "b", "c"])));
        browser.set_details(Fetch::Loaded(vec![disease("c"), disease("b"), disease("a")]));

        assert_eq!(browser.select_by_index(0), Some("a"));
        assert_eq!(browser.selected_disease().unwrap().id, "a");
    }

    #[test]
    fn test_default_selection_is_first_detail() {
        let mut browser = DiseaseBrowser::default();
        assert!(browser.selected_disease().is_none());
        browser.set_details(Fetch::Loaded(vec![disease("x"), disease("y")]));
        assert_eq!(browser.selected_disease().unwrap().id, "x");
    }

    #[test]
    fn test_select_unknown_id_refused() {
        let mut browser = DiseaseBrowser::default();
        assert!(browser.select_by_id("anything"));
        browser.set_ids(Fetch::Loaded(refs(&["a"])));
        assert!(!browser.select_by_id("zzz"));
        assert_eq!(browser.selected_id(), Some("anything"));
        assert!(browser.select_by_index(5).is_none());
    }

    #[test]
    fn test_select_refused_when_listings_failed() {
        let mut browser = DiseaseBrowser::default();
        browser.set_ids(Fetch::Failed("timeout".to_string()));
        browser.set_details(Fetch::Failed("timeout".to_string()));
        assert!(!browser.select_by_id("H00001"));
        assert_eq!(browser.selected_id(), None);

        browser.mark_loading();
        assert!(browser.select_by_id("H00001"));
    }

    #[test]
    fn test_abandon_requests_keeps_loaded_listing_and_selection() {
        let mut browser = DiseaseBrowser::default();
        browser.set_ids(Fetch::Loaded(refs(&["a", "b"])));
        browser.set_details(Fetch::Loading);
        browser.select_by_id("b");
        let ticket = browser.scope.ticket();

        browser.abandon_requests();
        assert!(!browser.scope.is_current(ticket));
        assert_eq!(browser.ids(), &Fetch::Loaded(refs(&["a", "b"])));
        assert_eq!(browser.details(), &Fetch::Idle);
        assert_eq!(browser.selected_id(), Some("b"));
    }

    #[test]
    fn test_stale_detail_listing_shows_nothing_rather_than_wrong_disease() {
        let mut browser = DiseaseBrowser::default();
        browser.set_ids(Fetch::Loaded(refs(&["new", "a"])));
        browser.set_details(Fetch::Loaded(vec![disease("a")]));
        browser.select_by_index(0);
        assert!(browser.selected_disease().is_none());
    }
}
