mod core;
pub use self::core::RgbdDataset;

mod file_list;
pub use file_list::{get_rgbd_file_lists, RgbdFileDataset};
