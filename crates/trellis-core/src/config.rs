/// Sizing hints for a new [`ElementGraph`](crate::ElementGraph).
///
/// Capacities only pre-size the arenas; every arena still grows on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphConfig {
    pub element_capacity: usize,
    pub variable_capacity: usize,
    /// Initial capacity of each payload pool created by `register_type`.
    pub payload_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            element_capacity: 64,
            variable_capacity: 64,
            payload_capacity: 16,
        }
    }
}

impl GraphConfig {
    pub fn with_element_capacity(mut self, capacity: usize) -> Self {
        self.element_capacity = capacity;
        self
    }

    pub fn with_variable_capacity(mut self, capacity: usize) -> Self {
        self.variable_capacity = capacity;
        self
    }

    pub fn with_payload_capacity(mut self, capacity: usize) -> Self {
        self.payload_capacity = capacity;
        self
    }
}
