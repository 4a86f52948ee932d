//! Report queries.

use roadwatch_geo::NearFilter;
use roadwatch_types::{Category, Report, ReportStatus};
use serde::{Deserialize, Serialize};

/// Filters applied to a report listing. Every field is optional; an empty
/// query matches all reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub near: Option<NearFilter>,
}

impl ReportQuery {
    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn near(mut self, filter: NearFilter) -> Self {
        self.near = Some(filter);
        self
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.status.map_or(true, |s| report.status == s)
            && self.category.map_or(true, |c| report.category == c)
            && self.near.as_ref().map_or(true, |n| n.matches(report))
    }
}

/// Result of a query: a snapshot of stored reports, filtered lazily.
///
/// The snapshot is taken once; [`ReportSet::iter`] can be called any number
/// of times and always yields the same reports, newest first. Writes that
/// commit after the snapshot are not reflected.
#[derive(Clone, Debug)]
pub struct ReportSet {
    snapshot: Vec<Report>,
    query: ReportQuery,
}

impl ReportSet {
    pub(crate) fn new(mut snapshot: Vec<Report>, query: ReportQuery) -> Self {
        snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Self { snapshot, query }
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> + '_ {
        self.snapshot.iter().filter(move |r| self.query.matches(r))
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<Report> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a ReportSet {
    type Item = &'a Report;
    type IntoIter = Box<dyn Iterator<Item = &'a Report> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
