use trellis_core::{
    ElementGraph, ElementId, FrameHandle, GraphConfig, GraphStats, UsageError, WidgetType,
};

use crate::shape::{shape_of, ShapeEntry};

type Content = Box<dyn FnMut(&mut ElementGraph) -> Result<(), UsageError>>;

/// Headless harness for driving an [`ElementGraph`] frame by frame.
///
/// `frame` declares the children of the root once, entering the root
/// unconditionally. `set_content` installs a closure that is rerun by
/// `recompose` and `pump_until_idle`, entering the root only when it is
/// flagged for revisit, the way an application's frame loop would.
pub struct TestUi {
    graph: ElementGraph,
    content: Option<Content>,
}

impl TestUi {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            graph: ElementGraph::with_config(config),
            content: None,
        }
    }

    pub fn register<D: Default + 'static>(&mut self) -> WidgetType {
        self.graph.register_type::<D>()
    }

    /// Runs one frame with `f` declaring the children of the root.
    ///
    /// A usage error aborts the frame inside the graph and is returned as is.
    pub fn frame<R>(
        &mut self,
        f: impl FnOnce(&mut ElementGraph) -> Result<R, UsageError>,
    ) -> Result<R, UsageError> {
        let graph = &mut self.graph;
        graph.begin()?;
        graph.root()?;
        graph.down()?;
        let out = f(graph)?;
        graph.up()?;
        graph.end()?;
        Ok(out)
    }

    /// Install the provided content and run the first frame.
    pub fn set_content(
        &mut self,
        content: impl FnMut(&mut ElementGraph) -> Result<(), UsageError> + 'static,
    ) -> Result<(), UsageError> {
        self.content = Some(Box::new(content));
        self.recompose().map(|_| ())
    }

    /// Runs one frame of the installed content. Returns whether the root
    /// was entered.
    pub fn recompose(&mut self) -> Result<bool, UsageError> {
        let graph = &mut self.graph;
        graph.begin()?;
        graph.root()?;
        let entered = graph.down_if()?;
        if entered {
            if let Some(content) = self.content.as_mut() {
                content(graph)?;
            }
            graph.up()?;
        }
        graph.end()?;
        Ok(entered)
    }

    /// Runs frames until no staged write or revisit request is left.
    /// Returns the number of frames run.
    pub fn pump_until_idle(&mut self) -> Result<usize, UsageError> {
        let handle = self.graph.handle();
        let mut frames = 0;
        while handle.has_pending() {
            frames += 1;
            if frames > 100 {
                panic!("pump_until_idle looped too many times!");
            }
            log::debug!(
                "pump_until_idle: frame {frames} with {} pending command(s)",
                handle.pending_count()
            );
            self.recompose()?;
        }
        Ok(frames)
    }

    pub fn handle(&self) -> FrameHandle {
        self.graph.handle()
    }

    pub fn graph(&self) -> &ElementGraph {
        &self.graph
    }

    /// Gain mutable access to the graph for assertions or manual frames.
    pub fn graph_mut(&mut self) -> &mut ElementGraph {
        &mut self.graph
    }

    pub fn root_id(&self) -> Option<ElementId> {
        self.graph.root_element()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn dump_tree(&self) -> String {
        self.graph.dump_tree()
    }

    /// Shape of the attached tree below the root, hidden elements included.
    pub fn shape(&self) -> Vec<ShapeEntry> {
        match self.graph.root_element() {
            Some(root) => shape_of(&self.graph, root),
            None => Vec::new(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }
}

impl Default for TestUi {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TestUi`.
pub fn run_test_frames<R>(f: impl FnOnce(&mut TestUi) -> R) -> R {
    let mut ui = TestUi::new();
    f(&mut ui)
}

#[cfg(test)]
#[path = "tests/testing_tests.rs"]
mod tests;
