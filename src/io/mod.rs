pub mod dataset;

mod geometry;
pub use geometry::Geometry;

mod intrinsic;
pub use intrinsic::{read_pinhole_camera_intrinsic, write_pinhole_camera_intrinsic};

mod ply;
pub use ply::{read_ply, write_ply};

mod pose_graph;
pub use pose_graph::{read_pose_graph, write_pose_graph};

/// Removes the folder if it exists and creates it again empty.
pub fn make_clean_folder<P: AsRef<std::path::Path>>(path: P) -> Result<(), crate::error::Error> {
    let path = path.as_ref();
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}
