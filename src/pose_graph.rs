use nalgebra::Matrix6;

use crate::{error::Error, transform::Transform};

/// A camera pose in the graph. Transforms points from camera to the graph frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseGraphNode {
    pub pose: Transform,
}

impl PoseGraphNode {
    pub fn new(pose: Transform) -> Self {
        Self { pose }
    }
}

/// A relative constraint between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseGraphEdge {
    pub source: usize,
    pub target: usize,
    /// Transforms points from the source camera to the target camera.
    pub transformation: Transform,
    /// Registration confidence.
    pub information: Matrix6<f64>,
    /// Loop closures are uncertain and may be pruned by the optimizer,
    /// odometry edges are always trusted.
    pub uncertain: bool,
    pub confidence: f64,
}

impl PoseGraphEdge {
    /// Edge between temporally adjacent frames.
    pub fn odometry(
        source: usize,
        target: usize,
        transformation: Transform,
        information: Matrix6<f64>,
    ) -> Self {
        Self {
            source,
            target,
            transformation,
            information,
            uncertain: false,
            confidence: 1.0,
        }
    }

    /// Edge between two keyframes.
    pub fn loop_closure(
        source: usize,
        target: usize,
        transformation: Transform,
        information: Matrix6<f64>,
    ) -> Self {
        Self {
            uncertain: true,
            ..Self::odometry(source, target, transformation, information)
        }
    }
}

/// Camera poses linked by relative transforms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseGraph {
    pub nodes: Vec<PoseGraphNode>,
    pub edges: Vec<PoseGraphEdge>,
}

impl PoseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph holding a single node at the identity, the root of a fragment.
    pub fn with_root() -> Self {
        Self {
            nodes: vec![PoseGraphNode::new(Transform::eye())],
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, pose: Transform) -> usize {
        self.nodes.push(PoseGraphNode::new(pose));
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, edge: PoseGraphEdge) {
        self.edges.push(edge);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn odometry_edges(&self) -> impl Iterator<Item = &PoseGraphEdge> + '_ {
        self.edges.iter().filter(|edge| !edge.uncertain)
    }

    pub fn loop_closure_edges(&self) -> impl Iterator<Item = &PoseGraphEdge> + '_ {
        self.edges.iter().filter(|edge| edge.uncertain)
    }

    /// Checks that every edge references existing nodes.
    pub fn validate(&self) -> Result<(), Error> {
        let len = self.len();
        match self
            .edges
            .iter()
            .find(|edge| edge.source >= len || edge.target >= len)
        {
            Some(edge) => Err(Error::Parser(format!(
                "Edge ({}, {}) references a node outside of the {len} graph nodes",
                edge.source, edge.target
            ))),
            None => Ok(()),
        }
    }
}
