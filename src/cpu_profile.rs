//! CPU profile normalization
//!
//! Turns a raw sampling-profiler record (V8 `.cpuprofile` layout: a node
//! table plus `samples`/`timeDeltas` arrays) into an immutable call tree and a
//! chronological sample list.
//!
//! The call tree uses index-based ownership: nodes live in a `Vec`, children
//! and parents are referenced by [`NodeId`], and a post-order is computed once
//! at build time so rollups never recurse.
//!
//! # Example
//!
//! ```
//! use vatio::cpu_profile::{CpuProfile, CpuSample, ProfileOptions, RawCpuNode};
//!
//! let nodes = vec![
//!     RawCpuNode::new(1, "(root)", vec![2]),
//!     RawCpuNode::new(2, "main", vec![]),
//! ];
//! let samples = vec![CpuSample::new(0, 2), CpuSample::new(1000, 1)];
//! let profile = CpuProfile::new(nodes, samples, ProfileOptions::default()).unwrap();
//!
//! assert_eq!(profile.start_time(), 0);
//! assert_eq!(profile.end_time(), 1000);
//! assert_eq!(profile.intervals().count(), 1);
//! ```

use crate::error::{EngineError, Result};
use crate::timeline::{Micros, TimeSpan};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Call-tree node identifier as assigned by the profiler
pub type NodeId = u64;

/// Function metadata as recorded by the profiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCallFrame {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "unknown_position")]
    pub line_number: i64,
    #[serde(default = "unknown_position")]
    pub column_number: i64,
}

fn unknown_position() -> i64 {
    -1
}

/// One entry of the raw node table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCpuNode {
    pub id: NodeId,
    #[serde(default)]
    pub call_frame: RawCallFrame,
    #[serde(default)]
    pub hit_count: u64,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Some producers (trace-event `ProfileChunk`) link upward instead of
    /// listing children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
}

impl RawCpuNode {
    pub fn new(id: NodeId, function_name: &str, children: Vec<NodeId>) -> Self {
        Self {
            id,
            call_frame: RawCallFrame {
                function_name: function_name.to_string(),
                url: String::new(),
                line_number: -1,
                column_number: -1,
            },
            hit_count: 0,
            children,
            parent: None,
        }
    }

    pub fn with_location(mut self, url: &str, line_number: i64, column_number: i64) -> Self {
        self.call_frame.url = url.to_string();
        self.call_frame.line_number = line_number;
        self.call_frame.column_number = column_number;
        self
    }
}

/// Raw CPU profiling record
///
/// Sample `i` was taken at `startTime + timeDeltas[0] + ... + timeDeltas[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCpuProfile {
    pub nodes: Vec<RawCpuNode>,
    pub start_time: Micros,
    pub end_time: Micros,
    #[serde(default)]
    pub samples: Vec<NodeId>,
    #[serde(default)]
    pub time_deltas: Vec<i64>,
}

/// Source position of a function (zero-based, as recorded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub url: String,
    pub line: i64,
    pub column: i64,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.url, self.line + 1, self.column + 1)
    }
}

/// Normalized call-tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTreeNode {
    pub id: NodeId,
    /// Back-reference by id; the node does not own its parent
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub function_name: String,
    /// `None` for native and synthetic frames that carry no script url
    pub source: Option<SourceLocation>,
    pub hit_count: u64,
}

impl CallTreeNode {
    /// Function name, or the V8 placeholder for anonymous functions
    pub fn display_name(&self) -> &str {
        if self.function_name.is_empty() {
            "(anonymous)"
        } else {
            &self.function_name
        }
    }
}

/// A single CPU sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSample {
    pub timestamp: Micros,
    pub node: NodeId,
}

impl CpuSample {
    pub fn new(timestamp: Micros, node: NodeId) -> Self {
        Self { timestamp, node }
    }
}

/// Half-open span `[start, end)` during which `node` was on-CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Micros,
    pub end: Micros,
    pub node: NodeId,
}

impl Interval {
    pub fn duration_us(&self) -> u64 {
        (self.end - self.start) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// How to treat consecutive samples that share a timestamp but name
/// different nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateTimestampPolicy {
    /// Reject the profile as malformed
    #[default]
    Reject,
    /// Accept and treat the earlier sample as a zero-duration interval
    ZeroDuration,
}

/// Options controlling CPU profile normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileOptions {
    pub duplicate_timestamps: DuplicateTimestampPolicy,
}

/// Normalized CPU profile: immutable call tree plus sample sequence
#[derive(Debug, Clone)]
pub struct CpuProfile {
    nodes: Vec<CallTreeNode>,
    index: HashMap<NodeId, usize>,
    root: NodeId,
    post_order: Vec<NodeId>,
    samples: Vec<CpuSample>,
}

impl CpuProfile {
    /// Build from a parsed raw record
    pub fn from_raw(raw: RawCpuProfile, options: ProfileOptions) -> Result<Self> {
        if raw.samples.len() != raw.time_deltas.len() {
            return Err(EngineError::MalformedProfile(format!(
                "{} samples but {} time deltas",
                raw.samples.len(),
                raw.time_deltas.len()
            )));
        }

        let mut timestamp = raw.start_time;
        let mut samples = Vec::with_capacity(raw.samples.len());
        for (i, (&node, &delta)) in raw.samples.iter().zip(&raw.time_deltas).enumerate() {
            timestamp = timestamp.checked_add(delta).ok_or_else(|| {
                EngineError::MalformedProfile(format!("timestamp overflow at sample {}", i))
            })?;
            samples.push(CpuSample::new(timestamp, node));
        }

        Self::new(raw.nodes, samples, options)
    }

    /// Parse a `.cpuprofile` JSON document
    pub fn from_json(json: &str, options: ProfileOptions) -> Result<Self> {
        let raw: RawCpuProfile = serde_json::from_str(json)
            .map_err(|e| EngineError::MalformedProfile(format!("invalid JSON: {}", e)))?;
        Self::from_raw(raw, options)
    }

    /// Build from a node table and already-timestamped samples
    ///
    /// # Errors
    /// `MalformedProfile` if there are no samples, the node table is not a
    /// single rooted tree, a sample names an unknown node, timestamps go
    /// backwards, or the span's length does not fit in `i64` microseconds.
    pub fn new(
        raw_nodes: Vec<RawCpuNode>,
        samples: Vec<CpuSample>,
        options: ProfileOptions,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(EngineError::MalformedProfile(
                "profile contains zero samples".to_string(),
            ));
        }

        let tree = CallTree::build(raw_nodes)?;
        check_samples(&samples, &tree.index, options)?;

        let (first, last) = (samples[0].timestamp, samples[samples.len() - 1].timestamp);
        if last.checked_sub(first).is_none() {
            return Err(EngineError::MalformedProfile(format!(
                "span [{}us, {}us] exceeds the representable duration",
                first, last
            )));
        }

        Ok(Self {
            nodes: tree.nodes,
            index: tree.index,
            root: tree.root,
            post_order: tree.post_order,
            samples,
        })
    }

    /// Timestamp of the first sample
    pub fn start_time(&self) -> Micros {
        self.samples[0].timestamp
    }

    /// Timestamp of the last sample
    pub fn end_time(&self) -> Micros {
        self.samples[self.samples.len() - 1].timestamp
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start_time(), self.end_time())
    }

    pub fn node(&self, id: NodeId) -> Option<&CallTreeNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CallTreeNode> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Every node id, children before their parent
    pub fn post_order(&self) -> &[NodeId] {
        &self.post_order
    }

    pub fn samples(&self) -> &[CpuSample] {
        &self.samples
    }

    /// One interval per consecutive sample pair, in time order.
    ///
    /// Calling this again restarts the walk from the first sample.
    pub fn intervals(&self) -> Intervals<'_> {
        Intervals {
            samples: &self.samples,
            pos: 0,
        }
    }

    /// The final sample, which opens no interval
    pub fn boundary(&self) -> CpuSample {
        self.samples[self.samples.len() - 1]
    }
}

/// Lazy walk over consecutive sample pairs
#[derive(Debug, Clone)]
pub struct Intervals<'a> {
    samples: &'a [CpuSample],
    pos: usize,
}

impl Iterator for Intervals<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        let current = self.samples.get(self.pos)?;
        let next = self.samples.get(self.pos + 1)?;
        self.pos += 1;
        Some(Interval {
            start: current.timestamp,
            end: next.timestamp,
            node: current.node,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.len().saturating_sub(self.pos + 1);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Intervals<'_> {}

struct CallTree {
    nodes: Vec<CallTreeNode>,
    index: HashMap<NodeId, usize>,
    root: NodeId,
    post_order: Vec<NodeId>,
}

impl CallTree {
    fn build(raw_nodes: Vec<RawCpuNode>) -> Result<Self> {
        let malformed = |msg: String| EngineError::MalformedProfile(msg);

        let mut index = HashMap::with_capacity(raw_nodes.len());
        for (i, node) in raw_nodes.iter().enumerate() {
            if index.insert(node.id, i).is_some() {
                return Err(malformed(format!("duplicate node id {}", node.id)));
            }
        }

        let mut parents: Vec<Option<NodeId>> = vec![None; raw_nodes.len()];
        let mut children: Vec<Vec<NodeId>> = Vec::with_capacity(raw_nodes.len());

        for node in &raw_nodes {
            for &child in &node.children {
                let ci = *index.get(&child).ok_or_else(|| {
                    malformed(format!("node {} lists unknown child {}", node.id, child))
                })?;
                if child == node.id {
                    return Err(malformed(format!("node {} is its own child", node.id)));
                }
                if let Some(existing) = parents[ci] {
                    return Err(malformed(format!(
                        "node {} has two parents ({} and {})",
                        child, existing, node.id
                    )));
                }
                parents[ci] = Some(node.id);
            }
            children.push(node.children.clone());
        }

        // Upward links are merged after every child list is known
        for (i, node) in raw_nodes.iter().enumerate() {
            let Some(parent) = node.parent else {
                continue;
            };
            let pi = *index.get(&parent).ok_or_else(|| {
                malformed(format!("node {} names unknown parent {}", node.id, parent))
            })?;
            match parents[i] {
                Some(existing) if existing == parent => {}
                Some(existing) => {
                    return Err(malformed(format!(
                        "node {} has two parents ({} and {})",
                        node.id, existing, parent
                    )))
                }
                None => {
                    if parent == node.id {
                        return Err(malformed(format!("node {} is its own parent", node.id)));
                    }
                    parents[i] = Some(parent);
                    children[pi].push(node.id);
                }
            }
        }

        let roots: Vec<usize> = (0..raw_nodes.len())
            .filter(|&i| parents[i].is_none())
            .collect();
        let root_index = match roots.as_slice() {
            [only] => *only,
            [] => return Err(malformed("call tree has no root".to_string())),
            many => {
                return Err(malformed(format!(
                    "call tree has {} roots, expected exactly one",
                    many.len()
                )))
            }
        };

        let post_order = post_order(root_index, &raw_nodes, &children, &index);
        if post_order.len() != raw_nodes.len() {
            return Err(malformed(format!(
                "{} nodes unreachable from root (cycle in node table)",
                raw_nodes.len() - post_order.len()
            )));
        }

        let root = raw_nodes[root_index].id;
        let nodes = raw_nodes
            .into_iter()
            .zip(parents)
            .zip(children)
            .map(|((raw, parent), children)| {
                let source = if raw.call_frame.url.is_empty() {
                    None
                } else {
                    Some(SourceLocation {
                        url: raw.call_frame.url,
                        line: raw.call_frame.line_number,
                        column: raw.call_frame.column_number,
                    })
                };
                CallTreeNode {
                    id: raw.id,
                    parent,
                    children,
                    function_name: raw.call_frame.function_name,
                    source,
                    hit_count: raw.hit_count,
                }
            })
            .collect();

        Ok(Self {
            nodes,
            index,
            root,
            post_order,
        })
    }
}

/// Iterative post-order from `root`; stops short of nodes it cannot reach
fn post_order(
    root: usize,
    raw_nodes: &[RawCpuNode],
    children: &[Vec<NodeId>],
    index: &HashMap<NodeId, usize>,
) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(raw_nodes.len());
    let mut visited = vec![false; raw_nodes.len()];
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
    visited[root] = true;

    while let Some(top) = stack.last_mut() {
        let (node, cursor) = *top;
        if let Some(&child) = children[node].get(cursor) {
            top.1 += 1;
            let ci = index[&child];
            if !visited[ci] {
                visited[ci] = true;
                stack.push((ci, 0));
            }
        } else {
            order.push(raw_nodes[node].id);
            stack.pop();
        }
    }

    order
}

fn check_samples(
    samples: &[CpuSample],
    index: &HashMap<NodeId, usize>,
    options: ProfileOptions,
) -> Result<()> {
    for (i, sample) in samples.iter().enumerate() {
        if !index.contains_key(&sample.node) {
            return Err(EngineError::MalformedProfile(format!(
                "sample {} at {}us references unknown node {}",
                i, sample.timestamp, sample.node
            )));
        }
    }

    for (i, pair) in samples.windows(2).enumerate() {
        let (prev, next) = (pair[0], pair[1]);
        if next.timestamp < prev.timestamp {
            return Err(EngineError::MalformedProfile(format!(
                "timestamps go backwards at sample {}: {}us after {}us",
                i + 1,
                next.timestamp,
                prev.timestamp
            )));
        }
        if next.timestamp == prev.timestamp
            && next.node != prev.node
            && options.duplicate_timestamps == DuplicateTimestampPolicy::Reject
        {
            return Err(EngineError::MalformedProfile(format!(
                "samples {} and {} share timestamp {}us but name different nodes ({} and {})",
                i,
                i + 1,
                next.timestamp,
                prev.node,
                next.node
            )));
        }
    }

    Ok(())
}
