//! Layout, matching, scheduling and painting of table diagrams.

pub mod driver;
pub mod layout;
pub mod matcher;
pub mod renderer;
