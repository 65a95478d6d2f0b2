//! Grouping of wire segments into named nets.
//!
//! The resolver works on a borrowed snapshot of one level's segments and
//! returns a fresh [`Resolution`]; it never touches the segments themselves.
//! Names are assigned in four passes, each only considering segments the
//! previous passes left unclassified:
//!
//! 1. global pins (`vdd!`) force their name onto every touching group,
//! 2. hierarchical boundary pins do the same for their own names,
//! 3. user-named segments propagate their name through connectivity,
//! 4. whatever is left gets an automatic `net<N>` name.
//!
//! When one group is pulled towards two names the first one wins and the
//! loser is recorded as a [`NamingConflict`]. Since global seeding runs
//! first, a global net always beats a boundary pin or a user name.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;

use crate::{strip_global, Level, NetSegment, Pin, Point, SegmentId};

/// Default connection tolerance in grid units (the drawn line width).
pub const DEFAULT_TOLERANCE: i64 = 1;

/// Prefix of automatically generated net names.
pub const AUTO_NET_PREFIX: &str = "net";

/// Where a net's name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetOrigin {
    Global,
    Boundary,
    Named,
    Auto,
}

/// A resolved net: a name plus every segment carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Net {
    pub name: String,
    pub origin: NetOrigin,
    pub segments: BTreeSet<SegmentId>,
    /// At least one segment was pulled into this net against another name.
    pub conflicted: bool,
}

/// One segment that was pulled towards two different names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingConflict {
    pub segment: SegmentId,
    /// The name the segment already carried (explicitly or from an earlier pass).
    pub existing: String,
    /// The name that was rejected.
    pub rejected: String,
}

impl fmt::Display for NamingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "segment {} is on net '{}' but is also connected to '{}'",
            self.segment, self.existing, self.rejected
        )
    }
}

/// Resolved state of a single segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentState {
    pub name: String,
    pub name_added: bool,
    pub name_conflict: bool,
}

/// Output of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    nets: IndexMap<String, Net>,
    states: Vec<SegmentState>,
    conflicts: Vec<NamingConflict>,
}

impl Resolution {
    /// Nets in the order they were created.
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn net(&self, name: &str) -> Option<&Net> {
        self.nets.get(name)
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Name of the net a segment ended up on.
    pub fn net_of(&self, id: SegmentId) -> &str {
        &self.states[id.0].name
    }

    pub fn state(&self, id: SegmentId) -> &SegmentState {
        &self.states[id.0]
    }

    pub fn conflicts(&self) -> &[NamingConflict] {
        &self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Write the resolved names and flags back onto the canvas segments the
    /// snapshot was taken from. User-named segments keep their name so a
    /// conflict stays visible on the next pass.
    pub fn apply(&self, segments: &mut [NetSegment]) {
        for (segment, state) in segments.iter_mut().zip(&self.states) {
            if !segment.name_set {
                segment.name = state.name.clone();
            }
            segment.name_added = state.name_added;
            segment.name_conflict = state.name_conflict;
        }
    }

    pub fn into_nets(self) -> IndexMap<String, Net> {
        self.nets
    }
}

/// Groups the segments of one level into named nets.
pub struct ConnectivityResolver<'a> {
    segments: &'a [NetSegment],
    tolerance: i64,
}

impl<'a> ConnectivityResolver<'a> {
    pub fn new(segments: &'a [NetSegment]) -> Self {
        Self {
            segments,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: i64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn segment(&self, id: SegmentId) -> &NetSegment {
        &self.segments[id.0]
    }

    /// Two segments connect when an endpoint of either lies inside the other's
    /// tolerance-expanded bounding region.
    pub fn connected(&self, a: SegmentId, b: SegmentId) -> bool {
        let (sa, sb) = (self.segment(a), self.segment(b));
        let ra = sa.bounds().expand(self.tolerance);
        let rb = sb.bounds().expand(self.tolerance);
        sb.endpoints().iter().any(|p| ra.contains(*p))
            || sa.endpoints().iter().any(|p| rb.contains(*p))
    }

    /// Segments whose tolerance-expanded bounding region covers `point`.
    pub fn touching(&self, point: Point) -> Vec<SegmentId> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, seg)| seg.bounds().expand(self.tolerance).contains(point))
            .map(|(idx, _)| SegmentId(idx))
            .collect()
    }

    /// Resolve a level, seeding from its global pins and its boundary pins.
    pub fn resolve_level(level: &Level, tolerance: i64) -> Resolution {
        ConnectivityResolver::new(&level.segments)
            .with_tolerance(tolerance)
            .resolve(level.global_pins(), level.boundary_pins())
    }

    /// Run the four naming passes.
    pub fn resolve<'p>(
        &self,
        global_pins: impl IntoIterator<Item = &'p Pin>,
        boundary_pins: impl IntoIterator<Item = &'p Pin>,
    ) -> Resolution {
        let mut pass = Pass::new(self.segments.len());

        for pin in global_pins {
            self.seed_from_pin(&mut pass, pin, NetOrigin::Global);
        }
        for pin in boundary_pins {
            self.seed_from_pin(&mut pass, pin, NetOrigin::Boundary);
        }

        for idx in 0..self.segments.len() {
            let id = SegmentId(idx);
            if !pass.remaining.contains(&id) {
                continue;
            }
            let Some(name) = self.segment(id).explicit_name() else {
                continue;
            };
            let name = strip_global(name).to_string();
            let group = self.expand(BTreeSet::from([id]), &mut pass.remaining);
            self.claim(&mut pass, group, &name, NetOrigin::Named);
        }

        for idx in 0..self.segments.len() {
            let id = SegmentId(idx);
            if !pass.remaining.contains(&id) {
                continue;
            }
            let name = pass.next_auto_name();
            let group = self.expand(BTreeSet::from([id]), &mut pass.remaining);
            self.claim(&mut pass, group, &name, NetOrigin::Auto);
        }

        debug!(
            "resolved {} segments into {} nets ({} conflicts)",
            self.segments.len(),
            pass.nets.len(),
            pass.conflicts.len()
        );
        pass.finish(self.segments)
    }

    fn seed_from_pin(&self, pass: &mut Pass, pin: &Pin, origin: NetOrigin) {
        let name = pin.net_name();
        let mut seeds = BTreeSet::new();
        for id in self.touching(pin.location) {
            if pass.remaining.contains(&id) {
                seeds.insert(id);
            } else if let Some(existing) = pass.assigned_name(id) {
                if existing != name {
                    let existing = existing.to_string();
                    pass.conflict(id, existing, name.to_string());
                }
            }
        }
        if seeds.is_empty() {
            return;
        }
        let group = self.expand(seeds, &mut pass.remaining);
        self.claim(pass, group, name, origin);
    }

    /// Assign `name` to a group, flagging members whose explicit name differs.
    fn claim(&self, pass: &mut Pass, group: BTreeSet<SegmentId>, name: &str, origin: NetOrigin) {
        for &id in &group {
            if let Some(explicit) = self.segment(id).explicit_name() {
                let explicit = strip_global(explicit);
                if explicit != name {
                    pass.conflict(id, explicit.to_string(), name.to_string());
                }
            }
        }
        pass.assign(group, name, origin);
    }

    /// Transitive closure of `seeds` over `remaining`.
    ///
    /// Each round absorbs every remaining segment connected to the previous
    /// round's frontier. `remaining` strictly shrinks, so this terminates.
    fn expand(
        &self,
        seeds: BTreeSet<SegmentId>,
        remaining: &mut BTreeSet<SegmentId>,
    ) -> BTreeSet<SegmentId> {
        for id in &seeds {
            remaining.remove(id);
        }
        let mut group = seeds.clone();
        let mut frontier: Vec<SegmentId> = seeds.into_iter().collect();
        while !frontier.is_empty() {
            let absorbed: Vec<SegmentId> = remaining
                .iter()
                .copied()
                .filter(|candidate| frontier.iter().any(|f| self.connected(*f, *candidate)))
                .collect();
            for id in &absorbed {
                remaining.remove(id);
            }
            group.extend(absorbed.iter().copied());
            frontier = absorbed;
        }
        group
    }
}

/// Mutable bookkeeping of a single resolution pass.
struct Pass {
    remaining: BTreeSet<SegmentId>,
    assigned: Vec<Option<String>>,
    flagged: Vec<bool>,
    nets: IndexMap<String, Net>,
    conflicts: Vec<NamingConflict>,
    auto_counter: usize,
}

impl Pass {
    fn new(count: usize) -> Self {
        Self {
            remaining: (0..count).map(SegmentId).collect(),
            assigned: vec![None; count],
            flagged: vec![false; count],
            nets: IndexMap::new(),
            conflicts: Vec::new(),
            auto_counter: 0,
        }
    }

    fn assigned_name(&self, id: SegmentId) -> Option<&str> {
        self.assigned[id.0].as_deref()
    }

    fn conflict(&mut self, id: SegmentId, existing: String, rejected: String) {
        let duplicate = self
            .conflicts
            .iter()
            .any(|c| c.segment == id && c.existing == existing && c.rejected == rejected);
        if duplicate {
            return;
        }
        warn!("naming conflict on segment {id}: '{existing}' vs '{rejected}'");
        self.flagged[id.0] = true;
        self.conflicts.push(NamingConflict {
            segment: id,
            existing,
            rejected,
        });
    }

    fn assign(&mut self, group: BTreeSet<SegmentId>, name: &str, origin: NetOrigin) {
        let conflicted = group.iter().any(|id| self.flagged[id.0]);
        for id in &group {
            self.assigned[id.0] = Some(name.to_string());
        }
        let net = self.nets.entry(name.to_string()).or_insert_with(|| Net {
            name: name.to_string(),
            origin,
            segments: BTreeSet::new(),
            conflicted: false,
        });
        net.segments.extend(group);
        net.conflicted |= conflicted;
    }

    fn next_auto_name(&mut self) -> String {
        loop {
            let name = format!("{AUTO_NET_PREFIX}{}", self.auto_counter);
            self.auto_counter += 1;
            if !self.nets.contains_key(&name) {
                return name;
            }
        }
    }

    fn finish(mut self, segments: &[NetSegment]) -> Resolution {
        // A conflict may be recorded against a segment after its net was built.
        for net in self.nets.values_mut() {
            if net.segments.iter().any(|id| self.flagged[id.0]) {
                net.conflicted = true;
            }
        }
        let states = self
            .assigned
            .into_iter()
            .zip(self.flagged)
            .zip(segments)
            .map(|((name, flagged), segment)| {
                let name = name.unwrap_or_default();
                let user_given = segment.explicit_name().map(strip_global) == Some(name.as_str());
                SegmentState {
                    name_added: !name.is_empty() && !user_given,
                    name,
                    name_conflict: flagged,
                }
            })
            .collect();
        Resolution {
            nets: self.nets,
            states,
            conflicts: self.conflicts,
        }
    }
}
