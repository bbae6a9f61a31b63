// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collapsed-stack output, one line per sampled leaf:
//!
//! ```text
//! leaf(file.js:12);caller(file.js:3);outer(main.js:?) 50
//! ```
//!
//! Frames run from the sampled leaf towards the root, and the root node
//! itself is omitted. The trailing number is `hits * sampling_interval_ms`.

use super::{FilteredHits, NodeId, NodeIndex, ProfileSnapshot};
use std::fmt::Write;

const UNKNOWN_FUNCTION: &str = "[unknown]";
const UNKNOWN_FIELD: &str = "?";

/// Serializes `hits` against the call tree of `snapshot`.
///
/// Leaves that resolve to no frames (the root itself, or ids the snapshot
/// does not know) produce no line.
pub fn collapse_stacks(
    snapshot: &ProfileSnapshot,
    hits: &FilteredHits,
    sampling_interval_ms: u64,
) -> String {
    let index = NodeIndex::build(snapshot);
    let root = snapshot.root();
    let mut out = String::new();

    for (&leaf, &count) in hits {
        let line_start = out.len();
        if write_stack(&mut out, &index, root, leaf) == 0 {
            out.truncate(line_start);
            continue;
        }
        // Writing into a String cannot fail.
        let _ = writeln!(out, " {}", count.saturating_mul(sampling_interval_ms));
    }
    out
}

/// Appends `leaf` and its ancestors, stopping before `root`. Returns the
/// number of frames written.
fn write_stack(out: &mut String, index: &NodeIndex<'_>, root: NodeId, leaf: NodeId) -> usize {
    let mut frames = 0;
    let mut current = Some(leaf);
    while let Some(id) = current {
        if id == root {
            break;
        }
        let Some(entry) = index.get(id) else {
            break;
        };
        if frames > 0 {
            out.push(';');
        }
        write_frame(
            out,
            entry.function_name,
            entry.file_name,
            entry.node.frame.line,
        );
        frames += 1;
        current = entry.parent;
    }
    frames
}

fn write_frame(out: &mut String, function_name: &str, file_name: &str, line: Option<u32>) {
    out.push_str(or_placeholder(function_name, UNKNOWN_FUNCTION));
    out.push('(');
    out.push_str(or_placeholder(file_name, UNKNOWN_FIELD));
    out.push(':');
    match line {
        Some(line) => {
            let _ = write!(out, "{line}");
        }
        None => out.push_str(UNKNOWN_FIELD),
    }
    out.push(')');
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}
