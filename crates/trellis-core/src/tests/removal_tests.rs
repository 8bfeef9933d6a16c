use crate::{ElementGraph, ElementId, UsageError, Variable, WidgetType};

#[derive(Default)]
struct List;

#[derive(Default)]
struct Item {
    selected: bool,
}

#[derive(Default)]
struct Text;

struct Types {
    list: WidgetType,
    item: WidgetType,
    text: WidgetType,
}

fn graph() -> (ElementGraph, Types) {
    let mut ui = ElementGraph::new();
    let types = Types {
        list: ui.register_type::<List>(),
        item: ui.register_type::<Item>(),
        text: ui.register_type::<Text>(),
    };
    (ui, types)
}

/// One frame of a list with `items` rows, each row holding two cells and a
/// text child. `None` leaves the list out. Returns the license cell and the
/// list element.
fn declare(
    ui: &mut ElementGraph,
    types: &Types,
    items: Option<usize>,
) -> Result<(Variable<u32>, Option<ElementId>), UsageError> {
    ui.begin()?;
    let license = ui.variable(|| 0u32)?;
    ui.root()?;
    ui.down()?;
    let list = match items {
        Some(items) => {
            let list = ui.next_keyed(types.list, "list")?;
            ui.down()?;
            ui.variable(|| String::from("scroll"))?;
            for row in 0..items {
                ui.next_keyed(types.item, row as u64)?;
                ui.down()?;
                ui.variable(|| row)?;
                ui.variable(|| false)?;
                ui.next(types.text)?;
                ui.up()?;
            }
            ui.up()?;
            Some(list)
        }
        None => None,
    };
    ui.up()?;
    ui.end()?;
    Ok((license, list))
}

#[test]
fn removing_a_subtree_releases_every_arena_slot() {
    let (mut ui, types) = graph();
    let (license, list) = declare(&mut ui, &types, Some(3)).expect("frame 1");
    let list = list.expect("list declared");
    let before = ui.stats();
    assert_eq!(before.elements, 8);
    assert_eq!(before.variables, 8);

    license.update(|n| n + 1);
    declare(&mut ui, &types, None).expect("licensed removal");
    let detached = ui.stats();
    assert_eq!(detached.pending_removals, 1);
    assert_eq!(detached.elements, 8, "detached storage is still held");
    assert!(ui.contains(list));

    declare(&mut ui, &types, None).expect("teardown frame");
    let after = ui.stats();
    assert_eq!(after.pending_removals, 0);
    assert_eq!((after.elements, after.free_elements), (1, 7));
    assert_eq!((after.variables, after.free_variables), (1, 7));
    let pool = |ty| after.pool(ty).map(|pool| (pool.live, pool.free));
    assert_eq!(pool(types.list), Some((0, 1)));
    assert_eq!(pool(types.item), Some((0, 3)));
    assert_eq!(pool(types.text), Some((0, 3)));
}

#[test]
fn freed_slots_are_reused_with_fresh_generations() {
    let (mut ui, types) = graph();
    let (license, old) = declare(&mut ui, &types, Some(1)).expect("frame 1");
    license.set(1);
    let (license, _) = declare(&mut ui, &types, None).expect("licensed removal");
    license.set(2);
    let (_, new) = declare(&mut ui, &types, Some(1)).expect("licensed insert");

    let (old, new) = (old.expect("old list"), new.expect("new list"));
    assert_eq!(old.index().slot(), new.index().slot(), "slot is recycled");
    assert_ne!(old, new);
    assert!(ui.element(old).is_err());
    assert!(!ui.element(new).expect("live").is_new());

    let stats = ui.stats();
    assert_eq!(stats.pool(types.list).map(|pool| pool.free), Some(0));
    assert_eq!(stats.pool(types.item).map(|pool| pool.free), Some(0));
}

#[test]
fn removal_drops_payload_state() {
    let (mut ui, types) = graph();
    let (license, _) = declare(&mut ui, &types, Some(1)).expect("frame 1");
    let root = ui.root_element().expect("root");
    let list = ui.children(root).expect("live").next().expect("list").id();
    let row = ui.children(list).expect("live").next().expect("row").id();
    ui.data_mut::<Item>(row).selected = true;

    license.set(1);
    let (license, _) = declare(&mut ui, &types, None).expect("licensed removal");
    license.set(2);
    declare(&mut ui, &types, Some(1)).expect("licensed insert");
    let list = ui.children(root).expect("live").next().expect("list").id();
    let row = ui.children(list).expect("live").next().expect("row").id();
    assert!(!ui.data::<Item>(row).selected, "a recycled slot starts from default");
}

#[test]
fn ancestor_marking_is_idempotent() {
    let (mut ui, types) = graph();
    declare(&mut ui, &types, Some(2)).expect("frame 1");
    let root = ui.root_element().expect("root");
    let list = ui.children(root).expect("live").next().expect("list").id();
    let leaf = ui.children(list).expect("live").last().expect("row").id();

    ui.mark_ancestors_revisit(leaf).expect("idle");
    let once = ui.dump_tree();
    ui.mark_ancestors_revisit(leaf).expect("idle");
    assert_eq!(ui.dump_tree(), once);
    assert!(ui.element(root).expect("live").is_revisit());
    assert!(ui.element(list).expect("live").is_revisit());
    assert!(!ui.element(root).expect("live").is_rerender());
}

#[test]
fn subtree_marking_bumps_generations() {
    let (mut ui, types) = graph();
    declare(&mut ui, &types, Some(2)).expect("frame 1");
    let root = ui.root_element().expect("root");
    let list = ui.children(root).expect("live").next().expect("list").id();

    ui.mark_subtree_rerender(list).expect("idle");
    ui.mark_subtree_rerender(list).expect("idle");
    let rows: Vec<_> = ui.children(list).expect("live").map(|row| row.generation()).collect();
    assert_eq!(rows, vec![2, 2]);
    assert_eq!(ui.element(list).expect("live").generation(), 2);
    assert_eq!(ui.element(root).expect("live").generation(), 0);
    assert!(ui.element(root).expect("live").is_revisit());
}

#[test]
fn marking_is_rejected_during_a_frame_and_for_stale_ids() {
    let (mut ui, types) = graph();
    let (license, list) = declare(&mut ui, &types, Some(1)).expect("frame 1");
    let list = list.expect("list declared");

    ui.begin().expect("begin");
    assert_eq!(ui.mark_subtree_rerender(list), Err(UsageError::AlreadyDeclaring));
    assert_eq!(ui.mark_ancestors_revisit(list), Err(UsageError::AlreadyDeclaring));
    assert!(ui.is_declaring(), "rejection does not abort the frame");
    ui.variable(|| 0u32).expect("license cell");
    ui.root().expect("root");
    ui.end().expect("end");

    license.set(1);
    declare(&mut ui, &types, None).expect("licensed removal");
    declare(&mut ui, &types, None).expect("teardown frame");
    assert_eq!(
        ui.mark_subtree_rerender(list),
        Err(UsageError::StaleElement { element: list })
    );
}

#[test]
fn detached_subtrees_are_unlinked_immediately() {
    let (mut ui, types) = graph();
    let (license, list) = declare(&mut ui, &types, Some(2)).expect("frame 1");
    let list = list.expect("list declared");
    license.set(1);
    declare(&mut ui, &types, None).expect("licensed removal");

    let root = ui.root_element().expect("root");
    assert_eq!(ui.children(root).expect("live").count(), 0);
    assert!(ui.element(list).expect("still allocated").parent().is_none());
    assert!(!ui.dump_tree().contains(&list.to_string()));
}

#[test]
fn pending_requests_for_removed_elements_are_dropped() {
    let (mut ui, types) = graph();
    let (license, list) = declare(&mut ui, &types, Some(1)).expect("frame 1");
    let list = list.expect("list declared");
    license.set(1);
    declare(&mut ui, &types, None).expect("licensed removal");
    declare(&mut ui, &types, None).expect("teardown frame");

    ui.handle().request_revisit(list);
    ui.begin().expect("stale request is ignored");
    let root = ui.root().expect("root");
    assert!(!ui.element(root).expect("live").is_revisit());
}
