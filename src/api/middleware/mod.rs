//! Request middleware: access logging and the Q&A deadline.

pub mod access_log;
pub mod deadline;
