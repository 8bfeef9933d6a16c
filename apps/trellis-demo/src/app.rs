//! Toy widget set and the two demo screens.
//!
//! Every frame the whole UI is redeclared from the current state cells. The
//! graph keeps identities and cells across frames, so a screen only changes
//! shape in the frame after one of its cells was written.

use trellis_core::{ElementGraph, ElementId, GraphConfig, UsageError, Variable, WidgetType};

#[derive(Default, Debug)]
pub struct Column;

#[derive(Default, Debug)]
pub struct Label {
    pub text: String,
}

#[derive(Default, Debug)]
pub struct Button {
    pub label: String,
}

#[derive(Default, Debug)]
pub struct Checkbox {
    pub label: String,
    pub checked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Counter,
    Chores,
}

/// Input the demo script feeds in between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Increment,
    Decrement,
    ShowPage(Page),
    ToggleChore(usize),
    ToggleHideDone,
    /// Re-enter the tree without writing anything.
    Refresh,
}

pub const CHORES: [&str; 3] = ["dishes", "laundry", "plants"];

#[derive(Clone, Copy)]
struct Widgets {
    column: WidgetType,
    label: WidgetType,
    button: WidgetType,
    checkbox: WidgetType,
}

/// Cells captured during the last frame that entered each screen.
#[derive(Default)]
struct Handles {
    page: Option<Variable<Page>>,
    count: Option<Variable<i32>>,
    hide_done: Option<Variable<bool>>,
    chores: Vec<Variable<bool>>,
}

pub struct Demo {
    graph: ElementGraph,
    widgets: Widgets,
    handles: Handles,
}

impl Demo {
    pub fn new() -> Self {
        let mut graph = ElementGraph::with_config(
            GraphConfig::default()
                .with_element_capacity(32)
                .with_variable_capacity(16)
                .with_payload_capacity(8),
        );
        let widgets = Widgets {
            column: graph.register_type::<Column>(),
            label: graph.register_type::<Label>(),
            button: graph.register_type::<Button>(),
            checkbox: graph.register_type::<Checkbox>(),
        };
        Self {
            graph,
            widgets,
            handles: Handles::default(),
        }
    }

    pub fn graph(&self) -> &ElementGraph {
        &self.graph
    }

    /// Declares one frame. Returns whether the root was re-entered.
    pub fn frame(&mut self) -> Result<bool, UsageError> {
        let graph = &mut self.graph;
        graph.begin()?;
        let page = graph.variable(|| Page::Counter)?;
        graph.root()?;
        let entered = graph.down_if()?;
        if entered {
            match *page {
                Page::Counter => counter_screen(graph, self.widgets, &mut self.handles)?,
                Page::Chores => chores_screen(graph, self.widgets, &mut self.handles)?,
            }
            graph.up()?;
        }
        self.handles.page = Some(page);
        graph.end()?;
        Ok(entered)
    }

    /// Stages the writes for `event`. Returns false when the event does not
    /// apply to the screen shown last.
    pub fn dispatch(&self, event: Event) -> bool {
        let handles = &self.handles;
        match event {
            Event::Increment | Event::Decrement => {
                let Some(count) = handles.count.as_ref() else {
                    return false;
                };
                let step = if event == Event::Increment { 1 } else { -1 };
                count.update(move |count| count + step);
            }
            Event::ShowPage(page) => {
                let Some(current) = handles.page.as_ref() else {
                    return false;
                };
                if **current == page {
                    return false;
                }
                current.set(page);
            }
            Event::ToggleChore(index) => {
                let Some(chore) = handles.chores.get(index) else {
                    return false;
                };
                chore.update(|done| !done);
            }
            Event::ToggleHideDone => {
                let Some(hide) = handles.hide_done.as_ref() else {
                    return false;
                };
                hide.update(|hide| !hide);
            }
            Event::Refresh => {
                let Some(root) = self.graph.root_element() else {
                    return false;
                };
                self.graph.handle().request_revisit(root);
            }
        }
        log::info!("dispatched {event:?}");
        true
    }
}

impl Default for Demo {
    fn default() -> Self {
        Self::new()
    }
}

fn counter_screen(
    graph: &mut ElementGraph,
    widgets: Widgets,
    handles: &mut Handles,
) -> Result<(), UsageError> {
    graph.next_keyed(widgets.column, "counter")?;
    graph.down()?;
    let count = graph.variable(|| 0i32)?;
    label(graph, widgets, &format!("count: {}", *count))?;
    button(graph, widgets, "+")?;
    button(graph, widgets, "-")?;
    if *count >= 3 {
        label(graph, widgets, "that's a lot")?;
    }
    graph.up()?;
    handles.count = Some(count);
    handles.hide_done = None;
    handles.chores.clear();
    Ok(())
}

fn chores_screen(
    graph: &mut ElementGraph,
    widgets: Widgets,
    handles: &mut Handles,
) -> Result<(), UsageError> {
    graph.next_keyed(widgets.column, "chores")?;
    graph.down()?;
    let hide_done = graph.variable(|| false)?;
    let mut cells = Vec::with_capacity(CHORES.len());
    let mut done = 0;
    for chore in CHORES {
        let row = graph.next_keyed(widgets.checkbox, chore)?;
        graph.down()?;
        let checked = graph.variable(|| false)?;
        graph.up()?;
        let data = graph.data_mut::<Checkbox>(row);
        data.label = chore.to_owned();
        data.checked = *checked;
        graph.set_visible(row, !(*hide_done && *checked))?;
        if *checked {
            done += 1;
        }
        cells.push(checked);
    }
    label(graph, widgets, &format!("{done}/{} done", CHORES.len()))?;
    graph.up()?;
    handles.count = None;
    handles.hide_done = Some(hide_done);
    handles.chores = cells;
    Ok(())
}

fn label(graph: &mut ElementGraph, widgets: Widgets, text: &str) -> Result<ElementId, UsageError> {
    let id = graph.next(widgets.label)?;
    let data = graph.data_mut::<Label>(id);
    if data.text != text {
        data.text = text.to_owned();
    }
    Ok(id)
}

fn button(graph: &mut ElementGraph, widgets: Widgets, text: &str) -> Result<ElementId, UsageError> {
    let id = graph.next_keyed(widgets.button, text)?;
    let data = graph.data_mut::<Button>(id);
    if data.label != text {
        data.label = text.to_owned();
    }
    Ok(id)
}

/// Text rendering of the visible tree, one widget per line.
pub fn render(graph: &ElementGraph) -> Result<Vec<String>, UsageError> {
    let mut lines = Vec::new();
    let Some(root) = graph.root_element() else {
        return Ok(lines);
    };
    graph.for_each_visible(root, |element, depth| {
        let indent = "  ".repeat(depth.saturating_sub(2));
        let line = if let Ok(label) = element.data::<Label>() {
            format!("{indent}{}", label.text)
        } else if let Ok(button) = element.data::<Button>() {
            format!("{indent}[ {} ]", button.label)
        } else if let Ok(checkbox) = element.data::<Checkbox>() {
            let mark = if checkbox.checked { 'x' } else { ' ' };
            format!("{indent}[{mark}] {}", checkbox.label)
        } else {
            return;
        };
        lines.push(line);
    })?;
    Ok(lines)
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
