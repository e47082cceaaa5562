use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::{camera::CameraIntrinsics, error::Error};

/// Pinhole intrinsic document. `intrinsic_matrix` is the 3x3 `K` in column-major order.
#[derive(Deserialize, Serialize, Debug)]
struct PinholeIntrinsicDoc {
    width: usize,
    height: usize,
    intrinsic_matrix: Vec<f64>,
}

pub fn read_pinhole_camera_intrinsic<P>(filepath: P) -> Result<CameraIntrinsics, Error>
where
    P: AsRef<Path>,
{
    let buffer = std::io::BufReader::new(std::fs::File::open(filepath)?);
    let doc: PinholeIntrinsicDoc = serde_json::from_reader(buffer)?;
    if doc.intrinsic_matrix.len() != 9 {
        return Err(Error::Parser(format!(
            "intrinsic_matrix needs 9 values, got {}",
            doc.intrinsic_matrix.len()
        )));
    }

    let k = &doc.intrinsic_matrix;
    Ok(CameraIntrinsics {
        fx: k[0],
        fy: k[4],
        cx: k[6],
        cy: k[7],
        width: Some(doc.width),
        height: Some(doc.height),
    })
}

pub fn write_pinhole_camera_intrinsic<P>(filepath: P, intrinsic: &CameraIntrinsics) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let doc = PinholeIntrinsicDoc {
        width: intrinsic.width.unwrap_or(0),
        height: intrinsic.height.unwrap_or(0),
        intrinsic_matrix: intrinsic.matrix().as_slice().to_vec(),
    };
    let buffer = std::io::BufWriter::new(std::fs::File::create(filepath)?);
    serde_json::to_writer_pretty(buffer, &doc)?;
    Ok(())
}
