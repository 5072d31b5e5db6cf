#![allow(dead_code)]

pub use testdag_test_utils::bodies;
pub use testdag_test_utils::builders::RegistryBuilder;
pub use testdag_test_utils::{init_tracing, with_timeout};
