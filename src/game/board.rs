//! Board State
//!
//! Single source of truth for what every node shows and when it expires.
//!
//! The tick loop and press handling both touch the board. Every read that
//! leads to a write is one compound operation under the board lock, so an
//! activation is consumed exactly once: whichever caller observes the
//! non-`Off` kind first owns it, the other sees `Off`.
//! Uses BTreeMap so sweeps and snapshots iterate in node order.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::{Duration, Instant};

use crate::core::node::NodeId;
use crate::game::content::{ButtonState, ContentKind};

/// Concurrent node → content map.
#[derive(Debug)]
pub struct BoardState {
    cells: Mutex<BTreeMap<NodeId, ButtonState>>,
}

impl BoardState {
    /// Create a dark board over the given nodes.
    pub fn new(nodes: &[NodeId]) -> Self {
        let cells = nodes
            .iter()
            .map(|node| (node.clone(), ButtonState::OFF))
            .collect();
        Self {
            cells: Mutex::new(cells),
        }
    }

    fn cells(&self) -> MutexGuard<'_, BTreeMap<NodeId, ButtonState>> {
        // A panic while holding the lock cannot leave a half-written cell.
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.cells().len()
    }

    /// Board has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.cells().is_empty()
    }

    /// Light `node` with `kind`, expiring `ttl` after `now` (`None` = never).
    ///
    /// Only an `Off` node can be activated. Returns false for unknown nodes,
    /// occupied nodes, and attempts to place `Off`.
    pub fn place(&self, node: &NodeId, kind: ContentKind, ttl: Option<Duration>, now: Instant) -> bool {
        if !kind.is_active() {
            return false;
        }
        let mut cells = self.cells();
        match cells.get_mut(node) {
            Some(cell) if !cell.kind.is_active() => {
                *cell = ButtonState::lit(kind, ttl, now);
                true
            }
            _ => false,
        }
    }

    /// Atomically read and clear `node`.
    ///
    /// Returns the kind the caller now owns; `Off` when the node was already
    /// dark (or unknown) and nothing was consumed.
    pub fn take(&self, node: &NodeId) -> ContentKind {
        let mut cells = self.cells();
        match cells.get_mut(node) {
            Some(cell) => std::mem::take(cell).kind,
            None => ContentKind::Off,
        }
    }

    /// Clear every node whose expiry is at or before `now`.
    ///
    /// Returns the cleared nodes so the caller can render them dark.
    pub fn sweep_expired(&self, now: Instant) -> Vec<NodeId> {
        let mut cells = self.cells();
        let mut cleared = Vec::new();
        for (node, cell) in cells.iter_mut() {
            if cell.is_expired(now) {
                *cell = ButtonState::OFF;
                cleared.push(node.clone());
            }
        }
        cleared
    }

    /// Clear the whole board, returning the nodes that were lit.
    pub fn flush(&self) -> Vec<NodeId> {
        let mut cells = self.cells();
        let mut cleared = Vec::new();
        for (node, cell) in cells.iter_mut() {
            if cell.kind.is_active() {
                cleared.push(node.clone());
            }
            *cell = ButtonState::OFF;
        }
        cleared
    }

    /// Number of lit nodes.
    pub fn active_count(&self) -> usize {
        self.cells().values().filter(|c| c.kind.is_active()).count()
    }

    /// Every node is lit.
    pub fn is_full(&self) -> bool {
        let cells = self.cells();
        !cells.is_empty() && cells.values().all(|c| c.kind.is_active())
    }

    /// Number of nodes currently showing any of `kinds`.
    pub fn count_kinds(&self, kinds: &[ContentKind]) -> usize {
        self.cells()
            .values()
            .filter(|c| kinds.contains(&c.kind))
            .count()
    }

    /// Dark nodes, in node order, skipping `exclude`.
    pub fn off_nodes(&self, exclude: Option<&NodeId>) -> Vec<NodeId> {
        self.cells()
            .iter()
            .filter(|(node, cell)| !cell.kind.is_active() && Some(*node) != exclude)
            .map(|(node, _)| node.clone())
            .collect()
    }

    /// Full copy of the board.
    pub fn snapshot(&self) -> Vec<(NodeId, ButtonState)> {
        self.cells()
            .iter()
            .map(|(node, cell)| (node.clone(), *cell))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
