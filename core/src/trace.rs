//! Record-level change events.
//!
//! Every operation reports what it did to each partition as an ordered list
//! of [`TraceEvent`]s, enough for a front end to replay the operation step by
//! step. The engine itself never reads a trace back.

use crate::rdd::Record;
use rddviz_common::CommonError;
use serde::{Deserialize, Serialize};

/// Which partition of a node an event touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    To,
    /// Node-local aggregate held before the shuffle.
    PreShuffle,
    /// Records received from the shuffle.
    PostShuffle,
}

/// Location of a partition an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Site {
    Node { node: usize, slot: Slot },
    /// A local-mode stage.
    Stage { stage: usize },
}

impl Site {
    pub fn node(node: usize, slot: Slot) -> Self {
        Site::Node { node, slot }
    }

    pub fn stage(stage: usize) -> Self {
        Site::Stage { stage }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEvent {
    Added {
        site: Site,
        index: usize,
        record: Record,
    },
    Updated {
        site: Site,
        index: usize,
        before: Record,
        after: Record,
    },
    Removed {
        site: Site,
        index: usize,
        record: Record,
    },
    Shuffled {
        from_node: usize,
        to_node: usize,
        record: Record,
    },
}

/// Ordered event log of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn added(&mut self, site: Site, index: usize, record: Record) {
        self.push(TraceEvent::Added {
            site,
            index,
            record,
        });
    }

    pub fn updated(&mut self, site: Site, index: usize, before: Record, after: Record) {
        self.push(TraceEvent::Updated {
            site,
            index,
            before,
            after,
        });
    }

    pub fn removed(&mut self, site: Site, index: usize, record: Record) {
        self.push(TraceEvent::Removed {
            site,
            index,
            record,
        });
    }

    pub fn shuffled(&mut self, from_node: usize, to_node: usize, record: Record) {
        self.push(TraceEvent::Shuffled {
            from_node,
            to_node,
            record,
        });
    }

    pub fn extend(&mut self, other: Trace) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events that touched `site`, in order.
    pub fn at(&self, site: Site) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events.iter().filter(move |event| match event {
            TraceEvent::Added { site: s, .. }
            | TraceEvent::Updated { site: s, .. }
            | TraceEvent::Removed { site: s, .. } => *s == site,
            TraceEvent::Shuffled { .. } => false,
        })
    }

    pub fn to_json(&self) -> Result<String, CommonError> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }
}

impl IntoIterator for Trace {
    type Item = TraceEvent;
    type IntoIter = std::vec::IntoIter<TraceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
