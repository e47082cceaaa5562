use std::path::Path;

use nalgebra::Matrix6;
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::Error,
    pose_graph::{PoseGraph, PoseGraphEdge, PoseGraphNode},
    transform::Transform,
};

fn node_class_name() -> String {
    "PoseGraphNode".to_string()
}

fn edge_class_name() -> String {
    "PoseGraphEdge".to_string()
}

fn graph_class_name() -> String {
    "PoseGraph".to_string()
}

fn unit_confidence() -> f64 {
    1.0
}

// Matrices are stored flat in column-major order.
#[derive(Deserialize, Serialize, Debug)]
struct NodeDoc {
    #[serde(default = "node_class_name")]
    class_name: String,
    pose: Vec<f64>,
}

#[derive(Deserialize, Serialize, Debug)]
struct EdgeDoc {
    #[serde(default = "edge_class_name")]
    class_name: String,
    source_node_id: usize,
    target_node_id: usize,
    transformation: Vec<f64>,
    information: Vec<f64>,
    #[serde(default)]
    uncertain: bool,
    #[serde(default = "unit_confidence")]
    confidence: f64,
}

#[derive(Deserialize, Serialize, Debug)]
struct PoseGraphDoc {
    #[serde(default = "graph_class_name")]
    class_name: String,
    #[serde(default)]
    version_major: u32,
    #[serde(default)]
    version_minor: u32,
    nodes: Vec<NodeDoc>,
    edges: Vec<EdgeDoc>,
}

impl TryFrom<PoseGraphDoc> for PoseGraph {
    type Error = Error;

    fn try_from(doc: PoseGraphDoc) -> Result<Self, Self::Error> {
        let nodes = doc
            .nodes
            .iter()
            .map(|node| Transform::from_column_slice(&node.pose).map(PoseGraphNode::new))
            .collect::<Result<Vec<_>, Error>>()?;

        let edges = doc
            .edges
            .iter()
            .map(|edge| {
                if edge.information.len() != 36 {
                    return Err(Error::Parser(format!(
                        "Information matrix needs 36 values, got {}",
                        edge.information.len()
                    )));
                }
                Ok(PoseGraphEdge {
                    source: edge.source_node_id,
                    target: edge.target_node_id,
                    transformation: Transform::from_column_slice(&edge.transformation)?,
                    information: Matrix6::from_column_slice(&edge.information),
                    uncertain: edge.uncertain,
                    confidence: edge.confidence,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let graph = PoseGraph { nodes, edges };
        graph.validate()?;
        Ok(graph)
    }
}

impl From<&PoseGraph> for PoseGraphDoc {
    fn from(graph: &PoseGraph) -> Self {
        PoseGraphDoc {
            class_name: graph_class_name(),
            version_major: 1,
            version_minor: 0,
            nodes: graph
                .nodes
                .iter()
                .map(|node| NodeDoc {
                    class_name: node_class_name(),
                    pose: node.pose.to_column_vec(),
                })
                .collect(),
            edges: graph
                .edges
                .iter()
                .map(|edge| EdgeDoc {
                    class_name: edge_class_name(),
                    source_node_id: edge.source,
                    target_node_id: edge.target,
                    transformation: edge.transformation.to_column_vec(),
                    information: edge.information.as_slice().to_vec(),
                    uncertain: edge.uncertain,
                    confidence: edge.confidence,
                })
                .collect(),
        }
    }
}

pub fn read_pose_graph<P>(filepath: P) -> Result<PoseGraph, Error>
where
    P: AsRef<Path>,
{
    let buffer = std::io::BufReader::new(std::fs::File::open(filepath)?);
    let doc: PoseGraphDoc = serde_json::from_reader(buffer)?;
    PoseGraph::try_from(doc)
}

/// Writes the pose graph as JSON, creating the parent directories.
pub fn write_pose_graph<P>(filepath: P, graph: &PoseGraph) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    if let Some(parent) = filepath.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let buffer = std::io::BufWriter::new(std::fs::File::create(filepath)?);
    serde_json::to_writer_pretty(buffer, &PoseGraphDoc::from(graph))?;
    Ok(())
}
