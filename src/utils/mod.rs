pub mod debounce;
pub mod morse;
pub mod shell;
pub mod update;

pub use debounce::{debounce, Debounced};
pub use update::{update, Directive, Splice, UpdateError};
