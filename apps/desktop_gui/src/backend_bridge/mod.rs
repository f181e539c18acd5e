//! Backend worker: a tokio runtime on its own thread driving the form controller.

pub mod commands;
pub mod runtime;
pub mod view;
