pub mod nc;
pub mod time;
pub mod types;
pub mod utils;

pub use nc::{GdalSource, gdal_dataset_path};
pub use time::TimeAxis;
pub use types::{GridSource, ReadError};
pub use utils::resolve_files;
