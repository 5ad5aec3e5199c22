pub mod listing;
pub mod model;

// Re-export commonly used types/functions for the CLIs
pub use listing::{decode_records, render_range, InsnOut};
pub use model::{load_raw_bin, read_u8, read_u32, Image};
