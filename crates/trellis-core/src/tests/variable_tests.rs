use crate::{ElementGraph, ElementId, UsageError, Variable, VariableOwner, WidgetType};

#[derive(Default)]
struct Counter {
    label: &'static str,
}

fn graph() -> (ElementGraph, WidgetType) {
    let mut ui = ElementGraph::new();
    let counter = ui.register_type::<Counter>();
    (ui, counter)
}

/// Declares one frame with the root entered unconditionally.
fn frame<R>(
    ui: &mut ElementGraph,
    body: impl FnOnce(&mut ElementGraph) -> Result<R, UsageError>,
) -> Result<R, UsageError> {
    ui.begin()?;
    ui.root()?;
    ui.down()?;
    let out = body(ui)?;
    ui.up()?;
    ui.end()?;
    Ok(out)
}

/// Keyed counter element holding `cells` u32 variables.
fn counter_element(
    ui: &mut ElementGraph,
    ty: WidgetType,
    key: &str,
    cells: usize,
) -> Result<(ElementId, Vec<Variable<u32>>), UsageError> {
    let id = ui.next_keyed(ty, key)?;
    ui.down()?;
    let mut variables = Vec::with_capacity(cells);
    for _ in 0..cells {
        variables.push(ui.variable(|| 0u32)?);
    }
    ui.up()?;
    Ok((id, variables))
}

#[test]
fn writes_become_visible_at_the_next_begin() {
    let (mut ui, _) = graph();
    let count = frame(&mut ui, |ui| {
        let count = ui.variable(|| 1i32)?;
        assert!(count.is_new());
        assert!(!count.modified());
        assert_eq!(count.owner(), VariableOwner::Element(ui.root_element().expect("root")));
        count.set(5);
        assert_eq!(*count, 1, "the frame keeps its snapshot");
        Ok(count)
    })
    .expect("frame 1");
    assert!(ui.handle().has_pending());
    assert_eq!(*count, 1);

    let next = frame(&mut ui, |ui| ui.variable(|| 1i32)).expect("frame 2");
    assert_eq!(next.id(), count.id());
    assert_eq!(*next, 5);
    assert!(next.modified());
    assert!(!next.is_new());
    assert_eq!(*count, 1, "old snapshots are not rewritten");
    assert!(!ui.handle().has_pending());

    let settled = frame(&mut ui, |ui| ui.variable(|| 1i32)).expect("frame 3");
    assert_eq!(*settled, 5);
    assert!(!settled.modified(), "modified lasts exactly one frame");
}

#[test]
fn last_write_wins_and_updates_chain() {
    let (mut ui, _) = graph();
    let cell = frame(&mut ui, |ui| ui.variable(|| 1u32)).expect("frame 1");
    cell.set(7);
    cell.set(2);
    cell.update(|n| n + 1);
    cell.update(|n| n * 10);
    assert_eq!(ui.handle().pending_count(), 4);

    let cell = frame(&mut ui, |ui| ui.variable(|| 1u32)).expect("frame 2");
    assert_eq!(*cell, 30);
    assert!(cell.modified());
}

#[test]
fn update_without_prior_write_reads_the_committed_value() {
    let (mut ui, _) = graph();
    let cell = frame(&mut ui, |ui| ui.variable(|| String::from("a"))).expect("frame 1");
    cell.update(|s| format!("{s}b"));
    let cell = frame(&mut ui, |ui| ui.variable(String::new)).expect("frame 2");
    cell.update(|s| format!("{s}c"));
    let cell = frame(&mut ui, |ui| ui.variable(String::new)).expect("frame 3");
    assert_eq!(cell.get(), "abc");
}

#[test]
fn commit_licenses_only_the_owning_subtree() {
    let (mut ui, ty) = graph();
    let (a, b, cell) = frame(&mut ui, |ui| {
        let (a, mut cells) = counter_element(ui, ty, "a", 1)?;
        let (b, _) = counter_element(ui, ty, "b", 0)?;
        ui.data_mut::<Counter>(a).label = "first";
        Ok((a, b, cells.remove(0)))
    })
    .expect("frame 1");
    cell.set(3);

    ui.begin().expect("begin");
    let root = ui.root().expect("root");
    {
        let root = ui.element(root).expect("live");
        assert!(root.is_revisit());
        assert!(!root.is_rerender());
    }
    assert!(ui.element(a).expect("live").is_rerender());
    assert!(!ui.element(b).expect("live").is_revisit());
    assert_eq!(ui.element(a).expect("live").generation(), 1);
    assert_eq!(ui.data::<Counter>(a).label, "first");

    assert!(ui.down_if().expect("down_if"));
    ui.next_keyed(ty, "a").expect("a");
    assert!(ui.down_if().expect("a is revisited"));
    let cell = ui.variable(|| 0u32).expect("cell");
    assert_eq!((*cell, cell.modified()), (3, true));
    ui.up().expect("up");
    ui.next_keyed(ty, "b").expect("b");
    assert!(!ui.down_if().expect("b is clean"));
    ui.up().expect("up");
    ui.end().expect("end");
}

#[test]
fn declaring_fewer_variables_is_rejected() {
    let (mut ui, ty) = graph();
    frame(&mut ui, |ui| counter_element(ui, ty, "a", 2)).expect("frame 1");
    let (a, _) = frame(&mut ui, |ui| counter_element(ui, ty, "a", 2)).expect("frame 2");

    let error = frame(&mut ui, |ui| counter_element(ui, ty, "a", 1)).expect_err("too few");
    assert_eq!(
        error,
        UsageError::UnstableVariableCount {
            owner: Some(a),
            expected: 2,
            requested: 1,
        }
    );
    assert!(!ui.is_declaring());
}

#[test]
fn declaring_more_variables_is_rejected() {
    let (mut ui, ty) = graph();
    let (a, _) = frame(&mut ui, |ui| counter_element(ui, ty, "a", 2)).expect("frame 1");
    let error = frame(&mut ui, |ui| counter_element(ui, ty, "a", 3)).expect_err("too many");
    assert_eq!(
        error,
        UsageError::UnstableVariableCount {
            owner: Some(a),
            expected: 2,
            requested: 3,
        }
    );
}

#[test]
fn skipping_an_element_keeps_its_variables() {
    let (mut ui, ty) = graph();
    frame(&mut ui, |ui| counter_element(ui, ty, "a", 2)).expect("frame 1");
    frame(&mut ui, |ui| {
        ui.next_keyed(ty, "a")?;
        assert!(!ui.down_if()?);
        Ok(())
    })
    .expect("skipping is not a count change");
    assert_eq!(ui.stats().variables, 2);
}

#[test]
fn redeclaring_with_another_type_is_rejected() {
    let (mut ui, _) = graph();
    frame(&mut ui, |ui| ui.variable(|| 0u32)).expect("frame 1");
    let error = frame(&mut ui, |ui| ui.variable(String::new)).expect_err("type change");
    assert!(matches!(
        error,
        UsageError::VariableTypeMismatch { position: 0, expected: "u32", .. }
    ));
}

#[test]
fn external_scope_is_sealed_after_its_first_frame() {
    let (mut ui, _) = graph();
    let external = |ui: &mut ElementGraph, cells: usize| -> Result<Vec<Variable<bool>>, UsageError> {
        ui.begin()?;
        let mut out = Vec::new();
        for _ in 0..cells {
            out.push(ui.variable(|| false)?);
        }
        ui.root()?;
        ui.end()?;
        Ok(out)
    };

    external(&mut ui, 0).expect("no external cells yet");
    let cells = external(&mut ui, 2).expect("chain is still new");
    assert!(cells.iter().all(|cell| cell.owner() == VariableOwner::External));
    external(&mut ui, 2).expect("same count");

    assert_eq!(
        external(&mut ui, 1).map(|_| ()),
        Err(UsageError::UnstableVariableCount {
            owner: None,
            expected: 2,
            requested: 1,
        })
    );
    assert_eq!(
        external(&mut ui, 3).map(|_| ()),
        Err(UsageError::UnstableVariableCount {
            owner: None,
            expected: 2,
            requested: 3,
        })
    );
}

#[test]
fn external_commit_licenses_the_whole_tree() {
    let (mut ui, ty) = graph();
    ui.begin().expect("begin");
    let toggle = ui.variable(|| false).expect("toggle");
    ui.root().expect("root");
    ui.down().expect("down");
    let (a, _) = counter_element(&mut ui, ty, "a", 0).expect("a");
    ui.up().expect("up");
    ui.end().expect("end");

    toggle.set(true);
    ui.begin().expect("begin");
    let toggle = ui.variable(|| false).expect("toggle");
    assert!(*toggle && toggle.modified());
    let root = ui.root().expect("root");
    assert!(ui.element(root).expect("live").is_rerender());
    assert!(ui.element(a).expect("live").is_rerender());
}

#[test]
fn writes_to_removed_variables_are_dropped() {
    let (mut ui, ty) = graph();
    let declare = |ui: &mut ElementGraph, keep: bool| -> Result<_, UsageError> {
        ui.begin()?;
        let license = ui.variable(|| 0u8)?;
        ui.root()?;
        ui.down()?;
        let cells = if keep {
            Some(counter_element(ui, ty, "a", 1)?.1)
        } else {
            None
        };
        ui.up()?;
        ui.end()?;
        Ok((license, cells))
    };

    let (license, cells) = declare(&mut ui, true).expect("frame 1");
    let orphan = cells.and_then(|mut cells| cells.pop()).expect("one cell");
    license.set(1);
    declare(&mut ui, false).expect("licensed removal");
    declare(&mut ui, false).expect("teardown frame");
    assert_eq!(ui.stats().variables, 1, "only the license cell is left");

    orphan.set(9);
    declare(&mut ui, false).expect("stale write is ignored");
    let root = ui.root_element().expect("root");
    assert_eq!(ui.element(root).expect("live").generation(), 1);
}
