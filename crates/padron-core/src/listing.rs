//! The in-memory list pipeline behind every table screen.
//!
//! A render runs filter → sort → paginate over the fetched records. The
//! selection set lives beside the pipeline and is keyed by record id, so it
//! survives filter, sort and page changes untouched.

use std::{cmp::Ordering, collections::BTreeSet};

use chrono::{DateTime, Utc};

use crate::{personnel::Personnel, zone::Zone};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZES: [usize; 4] = [5, 10, 25, 50];

// ─── Listable ────────────────────────────────────────────────────────────────

/// A sortable value pulled out of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
  Text(String),
  Flag(bool),
  Time(DateTime<Utc>),
}

impl SortKey {
  fn rank(&self) -> u8 {
    match self {
      Self::Text(_) => 0,
      Self::Flag(_) => 1,
      Self::Time(_) => 2,
    }
  }

  /// Total order: keys of the same kind compare by value, keys of
  /// different kinds by kind.
  pub fn compare(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Self::Text(a), Self::Text(b)) => a.cmp(b),
      (Self::Flag(a), Self::Flag(b)) => a.cmp(b),
      (Self::Time(a), Self::Time(b)) => a.cmp(b),
      _ => self.rank().cmp(&other.rank()),
    }
  }
}

/// Missing values sort before present ones.
fn compare_keys(a: Option<SortKey>, b: Option<SortKey>) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => a.compare(&b),
    (None, None) => Ordering::Equal,
    (None, Some(_)) => Ordering::Less,
    (Some(_), None) => Ordering::Greater,
  }
}

/// A record the list pipeline can filter, sort and select.
pub trait Listable {
  fn list_id(&self) -> &str;

  /// Fields the free-text term is matched against.
  fn search_fields(&self) -> Vec<&str>;

  fn zone_name(&self) -> Option<&str> { None }

  /// `"active"` or `"inactive"`.
  fn status_key(&self) -> &str;

  /// The value of a named field, or `None` if the field is unknown.
  fn sort_key(&self, field: &str) -> Option<SortKey>;
}

impl Listable for Personnel {
  fn list_id(&self) -> &str { &self.id }

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.national_id.as_str(),
      self.given_names.as_str(),
      self.surnames.as_str(),
      self.phone.as_str(),
    ]
  }

  fn zone_name(&self) -> Option<&str> { self.zone_name.as_deref() }

  fn status_key(&self) -> &str { self.status.as_ref() }

  fn sort_key(&self, field: &str) -> Option<SortKey> {
    let text = |s: &str| Some(SortKey::Text(s.to_owned()));
    match field {
      "nationalId" => text(self.national_id.as_str()),
      "givenNames" => text(self.given_names.as_str()),
      "surnames" => text(self.surnames.as_str()),
      "phone" => text(self.phone.as_str()),
      "zoneName" => self.zone_name.as_deref().and_then(text),
      "status" => text(self.status.as_ref()),
      "createdAt" => Some(SortKey::Time(self.created_at)),
      "updatedAt" => Some(SortKey::Time(self.updated_at)),
      _ => None,
    }
  }
}

impl Listable for Zone {
  fn list_id(&self) -> &str { &self.id }

  fn search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.name.as_str()];
    fields.extend(self.description.as_deref());
    fields
  }

  fn status_key(&self) -> &str { if self.active { "active" } else { "inactive" } }

  fn sort_key(&self, field: &str) -> Option<SortKey> {
    match field {
      "name" => Some(SortKey::Text(self.name.clone())),
      "description" => self.description.clone().map(SortKey::Text),
      "active" => Some(SortKey::Flag(self.active)),
      "createdAt" => Some(SortKey::Time(self.created_at)),
      "updatedAt" => Some(SortKey::Time(self.updated_at)),
      _ => None,
    }
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Filter state. An empty string disables that criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
  pub term:   String,
  pub zone:   String,
  pub status: String,
}

impl ListFilter {
  pub fn is_empty(&self) -> bool {
    self.term.is_empty() && self.zone.is_empty() && self.status.is_empty()
  }

  pub fn matches<T: Listable + ?Sized>(&self, record: &T) -> bool {
    let term = self.term.to_lowercase();
    let term_ok = term.is_empty()
      || record
        .search_fields()
        .iter()
        .any(|f| f.to_lowercase().contains(&term));
    let zone_ok = self.zone.is_empty() || record.zone_name() == Some(self.zone.as_str());
    let status_ok = self.status.is_empty() || record.status_key() == self.status;
    term_ok && zone_ok && status_ok
  }

  /// Keep the matching records, in their original order.
  pub fn apply<'a, T: Listable>(&self, records: impl IntoIterator<Item = &'a T>) -> Vec<&'a T> {
    records.into_iter().filter(|r| self.matches(*r)).collect()
  }
}

// ─── Sort ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
  pub field:     String,
  pub direction: Direction,
}

impl SortState {
  pub fn asc(field: impl Into<String>) -> Self {
    Self { field: field.into(), direction: Direction::Asc }
  }

  /// Stable sort in place. Ties keep their incoming order in both
  /// directions.
  pub fn apply<T: Listable>(&self, rows: &mut [&T]) {
    rows.sort_by(|a, b| {
      let ord = compare_keys(a.sort_key(&self.field), b.sort_key(&self.field));
      match self.direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
      }
    });
  }
}

// ─── View state ──────────────────────────────────────────────────────────────

/// One rendered page.
#[derive(Debug)]
pub struct Page<'a, T> {
  pub rows:       Vec<&'a T>,
  /// Records surviving the filter, across all pages.
  pub matched:    usize,
  pub page:       usize,
  pub page_size:  usize,
  pub page_count: usize,
}

/// Filter, sort, page and selection state for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
  pub filter: ListFilter,
  sort:       Option<SortState>,
  page:       usize,
  page_size:  usize,
  selected:   BTreeSet<String>,
}

impl Default for ListView {
  fn default() -> Self {
    Self {
      filter:    ListFilter::default(),
      sort:      None,
      page:      0,
      page_size: DEFAULT_PAGE_SIZE,
      selected:  BTreeSet::new(),
    }
  }
}

impl ListView {
  pub fn new() -> Self { Self::default() }

  pub fn sort(&self) -> Option<&SortState> { self.sort.as_ref() }
  pub fn page(&self) -> usize { self.page }
  pub fn page_size(&self) -> usize { self.page_size }

  /// Sort by `field`; sorting by the current field again flips the
  /// direction.
  pub fn sort_by(&mut self, field: &str) {
    self.sort = Some(match self.sort.take() {
      Some(s) if s.field == field => SortState {
        direction: match s.direction {
          Direction::Asc => Direction::Desc,
          Direction::Desc => Direction::Asc,
        },
        ..s
      },
      _ => SortState::asc(field),
    });
  }

  pub fn clear_sort(&mut self) { self.sort = None; }

  pub fn set_page(&mut self, page: usize) { self.page = page; }

  /// Change the page size and go back to the first page. Zero is treated
  /// as one.
  pub fn set_page_size(&mut self, size: usize) {
    self.page_size = size.max(1);
    self.page = 0;
  }

  /// Run the pipeline over `records`.
  pub fn render<'a, T: Listable>(&self, records: &'a [T]) -> Page<'a, T> {
    let mut rows = self.filter.apply(records);
    if let Some(sort) = &self.sort {
      sort.apply(&mut rows);
    }
    let matched = rows.len();
    let page_count = matched.div_ceil(self.page_size);
    let start = self.page.saturating_mul(self.page_size).min(matched);
    let end = start.saturating_add(self.page_size).min(matched);
    Page {
      rows: rows[start..end].to_vec(),
      matched,
      page: self.page,
      page_size: self.page_size,
      page_count,
    }
  }

  // ─── Selection ───────────────────────────────────────────────────────────

  pub fn selected(&self) -> &BTreeSet<String> { &self.selected }

  pub fn is_selected(&self, id: &str) -> bool { self.selected.contains(id) }

  pub fn toggle(&mut self, id: &str) {
    if !self.selected.remove(id) {
      self.selected.insert(id.to_owned());
    }
  }

  /// Select every record of the full fetched set, filtered out or not.
  pub fn select_all<T: Listable>(&mut self, records: &[T]) {
    self
      .selected
      .extend(records.iter().map(|r| r.list_id().to_owned()));
  }

  pub fn all_selected<T: Listable>(&self, records: &[T]) -> bool {
    !records.is_empty() && records.iter().all(|r| self.is_selected(r.list_id()))
  }

  pub fn clear_selection(&mut self) { self.selected.clear(); }
}
