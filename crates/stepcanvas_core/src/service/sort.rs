//! Sortable ActionItem table views.
//!
//! # Responsibility
//! - Order ActionItem rows by one of five columns in either direction.
//! - Track header clicks as a two-state ascending/descending cycle.
//!
//! # Invariants
//! - Sorting is stable and always produces a new vector.
//! - Missing dates sort as `9999-12-31`; missing text sorts as `""`.
//! - Once a column is active the table never returns to "unsorted".

use crate::model::task::{ActionItem, ExtendedDetails};
use crate::service::breakdown::{flatten_action_items, FlattenedActionItem};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stand-in for an unset date so it sorts after any real ISO date.
pub const MISSING_DATE_SENTINEL: &str = "9999-12-31";

/// Sortable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Completion flag, open before done when ascending.
    Status,
    Text,
    Responsible,
    DueDate,
    CompletedDate,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Text => "text",
            Self::Responsible => "responsible",
            Self::DueDate => "dueDate",
            Self::CompletedDate => "completedDate",
        }
    }
}

/// Unknown column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortKey(pub String);

impl Display for UnknownSortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown sort column `{}`; expected status|text|responsible|dueDate|completedDate",
            self.0
        )
    }
}

impl Error for UnknownSortKey {}

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "status" => Ok(Self::Status),
            "text" => Ok(Self::Text),
            "responsible" => Ok(Self::Responsible),
            "dueDate" | "due_date" => Ok(Self::DueDate),
            "completedDate" | "completed_date" => Ok(Self::CompletedDate),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// Active column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// Header-click state of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    active: Option<SortConfig>,
}

impl SortState {
    pub fn active(&self) -> Option<SortConfig> {
        self.active
    }

    /// Applies a header click on `key`.
    ///
    /// A new column starts ascending; the active column alternates
    /// between ascending and descending.
    pub fn request_sort(&mut self, key: SortKey) -> SortConfig {
        let direction = match self.active {
            Some(active) if active.key == key && active.direction == SortDirection::Ascending => {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        let config = SortConfig { key, direction };
        self.active = Some(config);
        config
    }
}

/// Row type that exposes one ActionItem to the comparator.
pub trait ActionItemRow {
    fn action_item(&self) -> &ActionItem;
}

impl ActionItemRow for ActionItem {
    fn action_item(&self) -> &ActionItem {
        self
    }
}

impl ActionItemRow for &ActionItem {
    fn action_item(&self) -> &ActionItem {
        self
    }
}

impl ActionItemRow for FlattenedActionItem<'_> {
    fn action_item(&self) -> &ActionItem {
        self.action_item
    }
}

/// Compares two rows by `config.key` in `config.direction`.
pub fn compare_rows<R: ActionItemRow>(left: &R, right: &R, config: SortConfig) -> Ordering {
    let left = left.action_item();
    let right = right.action_item();
    let ordering = match config.key {
        SortKey::Status => left.completed.cmp(&right.completed),
        SortKey::Text => fold_case(Some(&left.text)).cmp(&fold_case(Some(&right.text))),
        SortKey::Responsible => {
            fold_case(left.responsible.as_ref()).cmp(&fold_case(right.responsible.as_ref()))
        }
        SortKey::DueDate => date_key(&left.due_date).cmp(date_key(&right.due_date)),
        SortKey::CompletedDate => {
            date_key(&left.completed_date).cmp(date_key(&right.completed_date))
        }
    };
    match config.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Returns the rows in presentation order for `state`.
///
/// Without an active column the input order is kept.
pub fn sorted_rows<R: ActionItemRow + Clone>(rows: &[R], state: &SortState) -> Vec<R> {
    let mut sorted = rows.to_vec();
    if let Some(config) = state.active() {
        sorted.sort_by(|left, right| compare_rows(left, right, config));
    }
    sorted
}

fn fold_case(value: Option<&String>) -> String {
    value.map(|value| value.to_lowercase()).unwrap_or_default()
}

fn date_key(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(date) if !date.is_empty() => date,
        _ => MISSING_DATE_SENTINEL,
    }
}

/// Which ActionItems a table shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableScope {
    /// Items of one SubStep.
    SubStep(String),
    /// Every item of the Task.
    All,
}

/// Read-only sortable view over flattened ActionItems.
#[derive(Debug, Clone)]
pub struct ActionItemTable<'a> {
    task_name: &'a str,
    scope_label: String,
    rows: Vec<FlattenedActionItem<'a>>,
    sort: SortState,
}

impl<'a> ActionItemTable<'a> {
    /// Builds the table for `scope`. An unknown SubStep yields no rows.
    pub fn new(details: &'a ExtendedDetails, task_name: &'a str, scope: &TableScope) -> Self {
        let (scope_label, rows) = match scope {
            TableScope::All => (
                ALL_SCOPE_LABEL.to_string(),
                flatten_action_items(details, task_name).collect(),
            ),
            TableScope::SubStep(sub_step_id) => (
                details
                    .sub_step(sub_step_id)
                    .map(|sub_step| sub_step.text.clone())
                    .unwrap_or_default(),
                flatten_action_items(details, task_name)
                    .filter(|row| row.sub_step_id == sub_step_id)
                    .collect(),
            ),
        };
        Self {
            task_name,
            scope_label,
            rows,
            sort: SortState::default(),
        }
    }

    pub fn task_name(&self) -> &str {
        self.task_name
    }

    /// SubStep title, or `All` for the Task-wide view.
    pub fn scope_label(&self) -> &str {
        &self.scope_label
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn request_sort(&mut self, key: SortKey) -> SortConfig {
        self.sort.request_sort(key)
    }

    /// Rows in presentation order.
    pub fn rows(&self) -> Vec<FlattenedActionItem<'a>> {
        sorted_rows(&self.rows, &self.sort)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

const ALL_SCOPE_LABEL: &str = "All";

#[cfg(test)]
mod tests {
    use super::{compare_rows, SortConfig, SortDirection, SortKey, SortState};
    use crate::model::task::ActionItem;
    use std::cmp::Ordering;

    #[test]
    fn key_names_round_trip() {
        for key in [
            SortKey::Status,
            SortKey::Text,
            SortKey::Responsible,
            SortKey::DueDate,
            SortKey::CompletedDate,
        ] {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        assert!("priority".parse::<SortKey>().is_err());
    }

    #[test]
    fn switching_column_resets_to_ascending() {
        let mut state = SortState::default();
        state.request_sort(SortKey::Text);
        state.request_sort(SortKey::Text);
        let config = state.request_sort(SortKey::DueDate);
        assert_eq!(config.direction, SortDirection::Ascending);
    }

    #[test]
    fn responsible_is_case_insensitive_and_missing_is_empty() {
        let mut upper = ActionItem::new("a", "x");
        upper.responsible = Some("Bob".to_string());
        let mut lower = ActionItem::new("b", "x");
        lower.responsible = Some("bob".to_string());
        let missing = ActionItem::new("c", "x");
        let config = SortConfig {
            key: SortKey::Responsible,
            direction: SortDirection::Ascending,
        };

        assert_eq!(compare_rows(&upper, &lower, config), Ordering::Equal);
        assert_eq!(compare_rows(&missing, &upper, config), Ordering::Less);
    }

    #[test]
    fn empty_date_counts_as_missing() {
        let mut blank = ActionItem::new("a", "x");
        blank.completed_date = Some(String::new());
        let mut dated = ActionItem::new("b", "x");
        dated.completed_date = Some("2024-05-01".to_string());
        let config = SortConfig {
            key: SortKey::CompletedDate,
            direction: SortDirection::Ascending,
        };
        assert_eq!(compare_rows(&dated, &blank, config), Ordering::Less);
    }
}
