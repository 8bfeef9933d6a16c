use super::*;
use trellis_testing::{outline, shape_of};

fn outline_of(demo: &Demo) -> Vec<(usize, &'static str)> {
    let root = demo.graph().root_element().expect("root");
    outline(&shape_of(demo.graph(), root))
}

fn run(demo: &mut Demo, events: &[Event]) {
    for event in events {
        assert!(demo.dispatch(*event), "{event:?} should apply");
        demo.frame().expect("frame");
    }
}

#[test]
fn counter_screen_grows_a_badge_at_three() {
    let mut demo = Demo::new();
    demo.frame().expect("first frame");
    assert_eq!(
        render(demo.graph()).expect("render"),
        vec!["count: 0", "[ + ]", "[ - ]"]
    );

    run(&mut demo, &[Event::Increment, Event::Increment, Event::Increment]);
    assert_eq!(
        outline_of(&demo),
        vec![
            (0, "Column"),
            (1, "Label"),
            (1, "Button"),
            (1, "Button"),
            (1, "Label"),
        ]
    );

    run(&mut demo, &[Event::Decrement]);
    assert_eq!(
        render(demo.graph()).expect("render"),
        vec!["count: 2", "[ + ]", "[ - ]"]
    );
}

#[test]
fn refresh_redeclares_without_a_license() {
    let mut demo = Demo::new();
    demo.frame().expect("first frame");
    run(&mut demo, &[Event::Increment]);
    let before = outline_of(&demo);
    assert!(demo.dispatch(Event::Refresh));
    assert!(demo.frame().expect("refresh frame"), "root is re-entered");
    assert_eq!(outline_of(&demo), before);
    assert!(!demo.frame().expect("idle frame"), "nothing staged");
}

#[test]
fn switching_pages_replaces_the_screen() {
    let mut demo = Demo::new();
    demo.frame().expect("first frame");
    run(&mut demo, &[Event::Increment, Event::ShowPage(Page::Chores)]);
    assert!(!demo.dispatch(Event::Increment), "counter is gone");
    assert!(!demo.dispatch(Event::ShowPage(Page::Chores)), "already shown");

    run(&mut demo, &[Event::ToggleChore(1)]);
    assert_eq!(
        render(demo.graph()).expect("render"),
        vec!["[ ] dishes", "[x] laundry", "[ ] plants", "1/3 done"]
    );

    run(&mut demo, &[Event::ToggleHideDone]);
    assert_eq!(
        render(demo.graph()).expect("render"),
        vec!["[ ] dishes", "[ ] plants", "1/3 done"]
    );

    run(&mut demo, &[Event::ShowPage(Page::Counter)]);
    assert_eq!(
        render(demo.graph()).expect("render"),
        vec!["count: 0", "[ + ]", "[ - ]"],
        "the counter screen starts over"
    );
    demo.frame().expect("teardown frame");
    let stats = demo.graph().stats();
    assert_eq!(stats.elements, 5, "root, column, label and two buttons");
    assert_eq!(stats.variables, 2, "page and count");
}
