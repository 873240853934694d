//! Small helpers.

pub(crate) mod size;
