mod load;
mod types;

pub use load::{apply_env_overrides, apply_overrides_from, load_default, load_from};
pub use types::*;
