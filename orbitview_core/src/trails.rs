//! Per-body bounded position history.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::MAX_TRAIL_LENGTH;
use crate::types::{Body, BodyId, Rgb, Vec2};

/// Position history of one body, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailRecord {
    pub id: BodyId,
    /// Color captured when the record was created
    pub color: Rgb,
    positions: VecDeque<Vec2>,
}

impl TrailRecord {
    fn new(id: BodyId, color: Rgb, capacity: usize) -> Self {
        Self {
            id,
            color,
            positions: VecDeque::with_capacity(capacity),
        }
    }
    
    pub fn positions(&self) -> &VecDeque<Vec2> {
        &self.positions
    }
    
    pub fn len(&self) -> usize {
        self.positions.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
    
    pub fn newest(&self) -> Option<Vec2> {
        self.positions.back().copied()
    }
    
    fn push(&mut self, position: Vec2, max_len: usize) {
        self.positions.push_back(position);
        while self.positions.len() > max_len {
            self.positions.pop_front();
        }
    }
}

/// Trails for every body of the most recent snapshot.
///
/// A record exists exactly for the ids of the last snapshot passed to
/// [`TrailStore::update`]. An id that disappears loses its history; if it
/// comes back it starts over from a single point.
#[derive(Debug, Clone)]
pub struct TrailStore {
    records: HashMap<BodyId, TrailRecord>,
    max_len: usize,
}

impl Default for TrailStore {
    fn default() -> Self {
        Self::new(MAX_TRAIL_LENGTH)
    }
}

impl TrailStore {
    pub fn new(max_len: usize) -> Self {
        Self {
            records: HashMap::new(),
            max_len: max_len.max(1),
        }
    }
    
    /// Appends each body's current position and drops trails of absent ids.
    ///
    /// Returns true if any record was added, extended or removed.
    pub fn update(&mut self, bodies: &[Body]) -> bool {
        let present: HashSet<BodyId> = bodies.iter().map(|b| b.id).collect();
        let before = self.records.len();
        self.records.retain(|id, _| present.contains(id));
        let mut changed = self.records.len() != before;
        
        for body in bodies {
            let max_len = self.max_len;
            let record = self
                .records
                .entry(body.id)
                .or_insert_with(|| TrailRecord::new(body.id, Rgb::from_hex(&body.color), max_len));
            record.push(body.position, max_len);
            changed = true;
        }
        
        changed
    }
    
    pub fn get(&self, id: BodyId) -> Option<&TrailRecord> {
        self.records.get(&id)
    }
    
    pub fn iter(&self) -> impl Iterator<Item = &TrailRecord> {
        self.records.values()
    }
    
    /// Number of tracked bodies.
    pub fn len(&self) -> usize {
        self.records.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    
    /// Total stored positions across all trails.
    pub fn point_count(&self) -> usize {
        self.records.values().map(TrailRecord::len).sum()
    }
    
    pub fn max_len(&self) -> usize {
        self.max_len
    }
    
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
