//! JSON scene description for the CLI front-end.
//!
//! This has no counterpart in spec.md's core module list; it's the ambient
//! authoring surface a real deployment of this crate would need to drive
//! `render8`/`render16`/`shaded8` from a file instead of hand-built Rust.

use crate::region::Region;
use crate::render::RenderOptions;
use crate::tree::{NodeId, Tree};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct SceneDesc {
    pub tree: ExprDesc,
    pub bounds: BoundsDesc,
    pub resolution: ResolutionDesc,
    #[serde(default)]
    pub options: OptionsDesc,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundsDesc {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResolutionDesc {
    pub ni: usize,
    pub nj: usize,
    pub nk: usize,
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u8,
}

fn default_bit_depth() -> u8 {
    8
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OptionsDesc {
    pub min_volume: usize,
    pub prune: bool,
}

impl Default for OptionsDesc {
    fn default() -> Self {
        let defaults = RenderOptions::default();
        Self {
            min_volume: defaults.min_volume,
            prune: defaults.prune,
        }
    }
}

impl From<OptionsDesc> for RenderOptions {
    fn from(o: OptionsDesc) -> Self {
        Self {
            min_volume: o.min_volume,
            prune: o.prune,
        }
    }
}

/// A node in the on-disk expression tree. Nodes are addressed by array
/// index within `ExprDesc::nodes`, mirroring `Tree`'s own `NodeId` arena so
/// building one from the other is a single linear pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ExprNodeDesc {
    Const { value: f64 },
    X,
    Y,
    Z,
    Add { a: usize, b: usize },
    Sub { a: usize, b: usize },
    Mul { a: usize, b: usize },
    Div { a: usize, b: usize },
    Min { a: usize, b: usize },
    Max { a: usize, b: usize },
    Neg { a: usize },
    Sqrt { a: usize },
    Square { a: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExprDesc {
    pub nodes: Vec<ExprNodeDesc>,
    pub root: usize,
}

impl ExprDesc {
    /// Builds a `Tree` from the on-disk node list. Node `i` may only refer
    /// to operands with index `< i`, so this is a single forward pass with
    /// no need to pre-allocate placeholder ids.
    pub fn build(&self) -> Tree {
        let mut tree = Tree::new();
        let mut ids: HashMap<usize, NodeId> = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let id = match node {
                ExprNodeDesc::Const { value } => tree.constant(*value),
                ExprNodeDesc::X => tree.x(),
                ExprNodeDesc::Y => tree.y(),
                ExprNodeDesc::Z => tree.z(),
                ExprNodeDesc::Add { a, b } => tree.add(ids[a], ids[b]),
                ExprNodeDesc::Sub { a, b } => tree.sub(ids[a], ids[b]),
                ExprNodeDesc::Mul { a, b } => tree.mul(ids[a], ids[b]),
                ExprNodeDesc::Div { a, b } => tree.div(ids[a], ids[b]),
                ExprNodeDesc::Min { a, b } => tree.min(ids[a], ids[b]),
                ExprNodeDesc::Max { a, b } => tree.max(ids[a], ids[b]),
                ExprNodeDesc::Neg { a } => tree.neg(ids[a]),
                ExprNodeDesc::Sqrt { a } => tree.sqrt(ids[a]),
                ExprNodeDesc::Square { a } => tree.square(ids[a]),
            };
            ids.insert(i, id);
        }
        tree.set_root(ids[&self.root]);
        tree
    }
}

impl SceneDesc {
    /// Builds the root `Region` and the per-slice `L` luminance table
    /// (linear ramp from 0 at the near plane to the bit-depth's max at the
    /// far plane) implied by `bounds`/`resolution`.
    pub fn region(&self) -> Region {
        let x = linspace(self.bounds.x[0], self.bounds.x[1], self.resolution.ni);
        let y = linspace(self.bounds.y[0], self.bounds.y[1], self.resolution.nj);
        let z = linspace(self.bounds.z[0], self.bounds.z[1], self.resolution.nk);
        let max: u32 = if self.resolution.bit_depth >= 16 { 65535 } else { 255 << 8 };
        let nk = self.resolution.nk;
        let l: Vec<u16> = (0..=nk).map(|k| ((k as u32 * max) / nk as u32) as u16).collect();
        Region::new(0, 0, x, y, z, l).expect("SceneDesc produces a well-formed region")
    }

    pub fn render_options(&self) -> RenderOptions {
        self.options.into()
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    (0..=n).map(|i| lo + (hi - lo) * (i as f64) / (n as f64)).collect()
}

pub fn parse_scene_json(json_text: &str) -> Result<SceneDesc, serde_json::Error> {
    serde_json::from_str(json_text)
}
