pub mod deletion_stack;
pub mod entries;
pub mod lifetime;
