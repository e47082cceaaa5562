pub mod camera;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod io;
pub mod mesh;
pub mod pointcloud;
pub mod pose_graph;
pub mod progress;
pub mod slac;
pub mod system;
pub mod trajectory_builder;
pub mod transform;


pub mod image;
pub use crate::image::RgbdImage;
