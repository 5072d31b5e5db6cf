#![allow(dead_code)]

use testdag::registry::{TestCase, TestRegistry};

/// Builder for `TestRegistry` to simplify test setup.
pub struct RegistryBuilder {
    registry: TestRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TestRegistry::new(),
        }
    }

    pub fn case(mut self, case: TestCase) -> Self {
        self.registry.register(case);
        self
    }

    pub fn build(self) -> TestRegistry {
        self.registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
