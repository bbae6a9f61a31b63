// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Immutable call-tree captures returned by a profiling backend.

/// Identifies a node inside the [`ProfileSnapshot`] that produced it. Ids are
/// arena offsets and carry no meaning in any other snapshot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn from_offset(offset: usize) -> Option<Self> {
        u32::try_from(offset).ok().map(Self)
    }

    fn to_offset(self) -> usize {
        self.0 as usize
    }
}

/// Source location of a call-tree node. Empty strings mean the backend did
/// not know the value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Frame {
    pub function_name: String,
    pub file_name: String,
    pub line: Option<u32>,
}

impl Frame {
    pub fn new(
        function_name: impl Into<String>,
        file_name: impl Into<String>,
        line: Option<u32>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            file_name: file_name.into(),
            line,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileNode {
    pub frame: Frame,
    pub children: Vec<NodeId>,
}

/// One tick of the backend's sampler: the leaf node that was executing and
/// when, in the backend's monotonic microsecond clock.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RawSample {
    pub node: NodeId,
    pub timestamp_us: u64,
}

/// A finished profiling session. Samples are ordered by timestamp.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileSnapshot {
    nodes: Vec<ProfileNode>,
    samples: Vec<RawSample>,
    end_time_us: u64,
}

impl ProfileSnapshot {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&ProfileNode> {
        self.nodes.get(id.to_offset())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    /// Backend timestamp at which the session was stopped, in the same clock
    /// as [`RawSample::timestamp_us`].
    pub fn end_time_us(&self) -> u64 {
        self.end_time_us
    }
}

/// Assembles a [`ProfileSnapshot`]. Backends call this while converting their
/// own representation; the builder guarantees every id it hands out refers to
/// a node of the snapshot being built.
#[derive(Debug)]
pub struct SnapshotBuilder {
    nodes: Vec<ProfileNode>,
    samples: Vec<RawSample>,
}

impl SnapshotBuilder {
    pub fn new(root: Frame) -> Self {
        Self {
            nodes: vec![ProfileNode {
                frame: root,
                children: Vec::new(),
            }],
            samples: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_child(&mut self, parent: NodeId, frame: Frame) -> anyhow::Result<NodeId> {
        anyhow::ensure!(
            parent.to_offset() < self.nodes.len(),
            "parent {parent:?} is not part of this snapshot"
        );
        let id = NodeId::from_offset(self.nodes.len())
            .ok_or_else(|| anyhow::anyhow!("snapshot node count exceeds u32::MAX"))?;
        self.nodes.push(ProfileNode {
            frame,
            children: Vec::new(),
        });
        if let Some(parent) = self.nodes.get_mut(parent.to_offset()) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Records a sample. Timestamps must not decrease.
    pub fn add_sample(&mut self, node: NodeId, timestamp_us: u64) -> anyhow::Result<()> {
        anyhow::ensure!(
            node.to_offset() < self.nodes.len(),
            "sampled node {node:?} is not part of this snapshot"
        );
        if let Some(last) = self.samples.last() {
            anyhow::ensure!(
                last.timestamp_us <= timestamp_us,
                "sample timestamps must be ordered ({} after {})",
                timestamp_us,
                last.timestamp_us
            );
        }
        self.samples.push(RawSample { node, timestamp_us });
        Ok(())
    }

    pub fn build(self, end_time_us: u64) -> ProfileSnapshot {
        ProfileSnapshot {
            nodes: self.nodes,
            samples: self.samples,
            end_time_us,
        }
    }
}

/// Per-node lookup derived from one snapshot: source names, the parent link,
/// and the node itself. Borrowing the snapshot keeps the index from being
/// reused with any other capture.
#[derive(Debug)]
pub struct NodeIndex<'a> {
    entries: Vec<Option<NodeEntry<'a>>>,
}

#[derive(Copy, Clone, Debug)]
pub struct NodeEntry<'a> {
    pub function_name: &'a str,
    pub file_name: &'a str,
    pub parent: Option<NodeId>,
    pub node: &'a ProfileNode,
}

impl<'a> NodeIndex<'a> {
    /// Walks the tree from the root. Nodes unreachable from the root are left
    /// out of the index.
    pub fn build(snapshot: &'a ProfileSnapshot) -> Self {
        let mut entries = vec![None; snapshot.node_count()];
        let mut pending = vec![(None, snapshot.root())];

        while let Some((parent, id)) = pending.pop() {
            let Some(node) = snapshot.node(id) else {
                continue;
            };
            let Some(slot) = entries.get_mut(id.to_offset()) else {
                continue;
            };
            if slot.is_some() {
                continue;
            }
            *slot = Some(NodeEntry {
                function_name: &node.frame.function_name,
                file_name: &node.frame.file_name,
                parent,
                node,
            });
            pending.extend(node.children.iter().map(|&child| (Some(id), child)));
        }

        Self { entries }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeEntry<'a>> {
        self.entries.get(id.to_offset())?.as_ref()
    }
}
