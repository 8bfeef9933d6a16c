use anyhow::Context;

mod app;

use app::{render, Demo, Event, Page};

const SCRIPT: &[Event] = &[
    Event::Increment,
    Event::Increment,
    Event::Increment,
    Event::Refresh,
    Event::Decrement,
    Event::ShowPage(Page::Chores),
    Event::ToggleChore(0),
    Event::ToggleChore(2),
    Event::ToggleHideDone,
    Event::ShowPage(Page::Counter),
];

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "logging")]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    println!("=== Trellis Demo ===");
    println!("Each event below stages a write; the next frame applies it and");
    println!("only re-enters the parts of the tree that own the written cells.");
    println!();

    let mut demo = Demo::new();
    demo.frame().context("initial frame")?;
    print_frame(&demo, "initial")?;

    for event in SCRIPT {
        if !demo.dispatch(*event) {
            println!("-- {event:?}: not applicable, skipped");
            continue;
        }
        let entered = demo
            .frame()
            .with_context(|| format!("frame after {event:?}"))?;
        if !entered {
            println!("-- {event:?}: nothing to redeclare");
            continue;
        }
        print_frame(&demo, &format!("{event:?}"))?;
    }

    let stats = demo.graph().stats();
    println!(
        "frames: {}, elements: {} live / {} free, variables: {} live / {} free",
        stats.frame, stats.elements, stats.free_elements, stats.variables, stats.free_variables
    );
    for pool in &stats.pools {
        println!("  {}: {} live / {} free", pool.type_name, pool.live, pool.free);
    }
    Ok(())
}

fn print_frame(demo: &Demo, title: &str) -> anyhow::Result<()> {
    println!("-- {title} (frame {})", demo.graph().frame());
    for line in render(demo.graph()).context("render")? {
        println!("   {line}");
    }
    log::debug!("tree after {title}:\n{}", demo.graph().dump_tree());
    Ok(())
}
