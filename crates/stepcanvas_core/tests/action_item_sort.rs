use stepcanvas_core::{
    sorted_rows, ActionItem, ActionItemTable, ExtendedDetails, Position, SortDirection, SortKey,
    SortState, SubStep, TableScope,
};

fn item(id: &str, text: &str, completed: bool) -> ActionItem {
    ActionItem {
        completed,
        ..ActionItem::new(id, text)
    }
}

fn completion(rows: &[ActionItem]) -> Vec<bool> {
    rows.iter().map(|row| row.completed).collect()
}

#[test]
fn status_header_cycles_between_two_directions() {
    let rows = vec![item("1", "b", false), item("2", "a", true)];
    let mut state = SortState::default();

    state.request_sort(SortKey::Status);
    assert_eq!(completion(&sorted_rows(&rows, &state)), vec![false, true]);

    let config = state.request_sort(SortKey::Status);
    assert_eq!(config.direction, SortDirection::Descending);
    assert_eq!(completion(&sorted_rows(&rows, &state)), vec![true, false]);

    let config = state.request_sort(SortKey::Status);
    assert_eq!(config.direction, SortDirection::Ascending);
    assert_eq!(completion(&sorted_rows(&rows, &state)), vec![false, true]);
    assert!(state.active().is_some());
}

#[test]
fn missing_due_date_sorts_last_ascending_and_first_descending() {
    let undated = item("1", "x", false);
    let dated = ActionItem {
        due_date: Some("2024-01-01".to_string()),
        ..item("2", "y", false)
    };
    let rows = vec![undated, dated];
    let mut state = SortState::default();

    state.request_sort(SortKey::DueDate);
    let sorted = sorted_rows(&rows, &state);
    let ascending: Vec<Option<&str>> = sorted.iter().map(|row| row.due_date.as_deref()).collect();
    assert_eq!(ascending, vec![Some("2024-01-01"), None]);

    state.request_sort(SortKey::DueDate);
    let descending = sorted_rows(&rows, &state);
    assert_eq!(descending[0].due_date, None);
}

#[test]
fn equal_keys_keep_original_order() {
    let rows = vec![
        item("1", "Alpha", true),
        item("2", "beta", false),
        item("3", "alpha", false),
        item("4", "ALPHA", true),
    ];
    let mut state = SortState::default();

    state.request_sort(SortKey::Text);
    let sorted = sorted_rows(&rows, &state);
    let ids: Vec<&str> = sorted.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "4", "2"]);

    state.request_sort(SortKey::Text);
    let sorted = sorted_rows(&rows, &state);
    let ids: Vec<&str> = sorted.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1", "3", "4"]);

    state.request_sort(SortKey::Status);
    let sorted = sorted_rows(&rows, &state);
    let ids: Vec<&str> = sorted.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3", "1", "4"]);
}

#[test]
fn unsorted_state_keeps_input_order() {
    let rows = vec![item("2", "b", true), item("1", "a", false)];
    let sorted = sorted_rows(&rows, &SortState::default());
    assert_eq!(sorted, rows);
}

fn table_fixture() -> ExtendedDetails {
    let mut design = SubStep::new("substep-1", "Design", Position::default());
    design.action_items = vec![
        ActionItem {
            responsible: Some("zoe".to_string()),
            ..item("action-1", "Sketch", true)
        },
        ActionItem {
            responsible: Some("Adam".to_string()),
            ..item("action-2", "Review", false)
        },
    ];
    let mut build = SubStep::new("substep-2", "Build", Position::default());
    build.action_items = vec![item("action-3", "Code", false)];
    ExtendedDetails::default().with_sub_steps(vec![design, build])
}

#[test]
fn table_scopes_and_sorting_leave_storage_untouched() {
    let details = table_fixture();
    let before = details.clone();

    let mut all = ActionItemTable::new(&details, "Launch", &TableScope::All);
    assert_eq!(all.scope_label(), "All");
    assert_eq!(all.task_name(), "Launch");
    all.request_sort(SortKey::Responsible);
    let rows = all.rows();
    let ids: Vec<&str> = rows.iter().map(|r| r.action_item.id.as_str()).collect();
    assert_eq!(ids, vec!["action-3", "action-2", "action-1"]);
    assert_eq!(rows[0].sub_step_name, "Build");

    let scope = TableScope::SubStep("substep-1".to_string());
    let scoped = ActionItemTable::new(&details, "Launch", &scope);
    assert_eq!(scoped.scope_label(), "Design");
    let rows = scoped.rows();
    let ids: Vec<&str> = rows.iter().map(|r| r.action_item.id.as_str()).collect();
    assert_eq!(ids, vec!["action-1", "action-2"]);

    let missing_scope = TableScope::SubStep("nope".to_string());
    let missing = ActionItemTable::new(&details, "Launch", &missing_scope);
    assert!(missing.is_empty());

    assert_eq!(details, before);
}
