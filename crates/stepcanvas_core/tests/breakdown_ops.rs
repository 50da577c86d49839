use stepcanvas_core::{
    flatten_action_items, ActionItemPatch, BreakdownService, ExtendedDetails, Position,
    SequentialIdGenerator, SubStepPatch, SubStepStatus, UuidIdGenerator,
};
use std::collections::HashSet;

fn setup() -> (BreakdownService, SequentialIdGenerator) {
    (BreakdownService::default(), SequentialIdGenerator::new())
}

#[test]
fn add_sub_step_stacks_cards_and_defaults_status() {
    let (service, mut ids) = setup();
    let mut details = ExtendedDetails::default();
    for _ in 0..3 {
        details = service.add_sub_step(&details, &mut ids).0;
    }

    let positions: Vec<Position> = details.sub_steps.iter().map(|s| s.position).collect();
    assert_eq!(
        positions,
        vec![
            Position::new(10.0, 10.0),
            Position::new(10.0, 100.0),
            Position::new(10.0, 190.0),
        ]
    );
    assert!(details
        .sub_steps
        .iter()
        .all(|s| s.status == SubStepStatus::NotStarted && s.action_items.is_empty()));
}

#[test]
fn ids_stay_unique_across_add_remove_sequences() {
    let service = BreakdownService::default();
    let mut ids = UuidIdGenerator;
    let mut details = ExtendedDetails::default();
    let mut removed = HashSet::new();

    // Deterministic interleaving: remove the first card every third step.
    for step in 0..30 {
        if step % 3 == 2 {
            let victim = details.sub_steps[0].id.clone();
            details = service.remove_sub_step(&details, &victim);
            removed.insert(victim);
        } else {
            details = service.add_sub_step(&details, &mut ids).0;
        }
    }

    let surviving: HashSet<&str> = details.sub_steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(surviving.len(), details.sub_steps.len());
    assert!(surviving.iter().all(|id| !removed.contains(*id)));
    assert_eq!(removed.len(), 10);
}

#[test]
fn remove_sub_step_drops_its_action_items() {
    let (service, mut ids) = setup();
    let (details, sub_step_id) = service.add_sub_step(&ExtendedDetails::default(), &mut ids);
    let (details, item_id) = service.add_action_item(&details, &sub_step_id, &mut ids);
    let item_id = item_id.unwrap();

    let details = service.remove_sub_step(&details, &sub_step_id);
    assert!(details.sub_steps.is_empty());
    assert!(details.find_action_item(&item_id).is_none());

    let after = service.update_action_item(
        &details,
        &sub_step_id,
        &item_id,
        &ActionItemPatch::completed(true),
    );
    assert_eq!(after, details);
}

#[test]
fn lookup_misses_return_unchanged_details() {
    let (service, mut ids) = setup();
    let (details, sub_step_id) = service.add_sub_step(&ExtendedDetails::default(), &mut ids);

    assert_eq!(
        service.update_sub_step(&details, "substep-404", &SubStepPatch::text("x")),
        details
    );
    assert_eq!(service.remove_sub_step(&details, "substep-404"), details);
    assert_eq!(
        service.remove_action_item(&details, &sub_step_id, "action-404"),
        details
    );

    let (unchanged, id) = service.add_action_item(&details, "substep-404", &mut ids);
    assert_eq!(unchanged, details);
    assert!(id.is_none());
}

#[test]
fn update_action_item_is_scoped_to_named_sub_step() {
    let (service, mut ids) = setup();
    let (details, first) = service.add_sub_step(&ExtendedDetails::default(), &mut ids);
    let (details, second) = service.add_sub_step(&details, &mut ids);
    let (details, item) = service.add_action_item(&details, &first, &mut ids);
    let item = item.unwrap();

    let wrong_owner =
        service.update_action_item(&details, &second, &item, &ActionItemPatch::text("moved"));
    assert_eq!(wrong_owner, details);

    let updated =
        service.update_action_item(&details, &first, &item, &ActionItemPatch::text("Call vendor"));
    let (_, stored) = updated.find_action_item(&item).unwrap();
    assert_eq!(stored.text, "Call vendor");
    assert!(!stored.completed);
}

#[test]
fn report_save_locates_item_task_wide() {
    let (service, mut ids) = setup();
    let (details, _) = service.add_sub_step(&ExtendedDetails::default(), &mut ids);
    let (details, second) = service.add_sub_step(&details, &mut ids);
    let (details, item) = service.add_action_item(&details, &second, &mut ids);
    let item = item.unwrap();

    let mut edited = details.find_action_item(&item).unwrap().1.clone();
    edited.completed = true;
    edited.completed_date = Some("2024-03-01".to_string());
    edited.report = Some(stepcanvas_core::ActionItemReport {
        notes: Some("done on site".to_string()),
        attachments: Vec::new(),
    });

    let saved = service.update_action_item_report(&details, &edited);
    let (owner, stored) = saved.find_action_item(&item).unwrap();
    assert_eq!(owner.id, second);
    assert_eq!(stored, &edited);

    let mut ghost = edited.clone();
    ghost.id = "action-404".to_string();
    assert_eq!(service.update_action_item_report(&saved, &ghost), saved);
}

#[test]
fn flatten_follows_storage_order_and_restarts() {
    let (service, mut ids) = setup();
    let (details, first) = service.add_sub_step(&ExtendedDetails::default(), &mut ids);
    let (details, empty) = service.add_sub_step(&details, &mut ids);
    let (details, third) = service.add_sub_step(&details, &mut ids);
    let details = service.update_sub_step(&details, &first, &SubStepPatch::text("Design"));
    let details = service.update_sub_step(&details, &third, &SubStepPatch::text("Ship"));
    let (details, a) = service.add_action_item(&details, &third, &mut ids);
    let (details, b) = service.add_action_item(&details, &first, &mut ids);
    let (details, c) = service.add_action_item(&details, &first, &mut ids);

    let walk = flatten_action_items(&details, "Launch");
    let ids_in_order: Vec<&str> = walk.clone().map(|row| row.action_item.id.as_str()).collect();
    assert_eq!(
        ids_in_order,
        vec![b.as_deref().unwrap(), c.as_deref().unwrap(), a.as_deref().unwrap()]
    );

    let names: Vec<(&str, &str)> = walk.map(|row| (row.sub_step_name, row.task_name)).collect();
    assert_eq!(
        names,
        vec![("Design", "Launch"), ("Design", "Launch"), ("Ship", "Launch")]
    );
    assert!(details.sub_step(&empty).unwrap().action_items.is_empty());
    assert_eq!(flatten_action_items(&details, "Launch").count(), 3);
}
