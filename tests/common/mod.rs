mod mocks;

pub use mocks::{MockSink, MockSource};
