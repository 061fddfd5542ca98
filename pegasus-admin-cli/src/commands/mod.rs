pub mod meta_level;
pub mod nodes_stat;

pub use meta_level::{run_meta_level_get, run_meta_level_set};
pub use nodes_stat::run_nodes_stat;
