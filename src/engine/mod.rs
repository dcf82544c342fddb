//! Execution engine building blocks
//!
//! Variable storage, template resolution, request building and response
//! validation. The scheduler that ties them together lives in
//! [`crate::testing`].

pub mod assertion;
pub mod request;
pub mod template;
pub mod variables;

pub use assertion::{Assertion, Expectation, Operator};
pub use request::RequestTemplate;
pub use template::Resolver;
pub use variables::VariableStore;
