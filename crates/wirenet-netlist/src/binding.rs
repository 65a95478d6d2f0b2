//! Binding of instance pins to resolved net names.

use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use crate::connectivity::{Resolution, DEFAULT_TOLERANCE};
use crate::{Instance, NetSegment, Pin, Symbol};

/// Prefix of the names given to pins that touch no net.
pub const DEFAULT_NET_PREFIX: &str = "dnet";

/// Pin name to net name, in the order pins appear on the netlist line.
pub type PinNetMap = IndexMap<Symbol, String>;

/// A pin that touched no net and received a synthetic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnconnectedPin {
    /// Index of the instance in the level's instance list.
    pub instance: usize,
    pub instance_name: String,
    pub pin: Symbol,
    pub net: String,
}

impl std::fmt::Display for UnconnectedPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pin {}.{} is not connected to any net, using {}",
            self.instance_name, self.pin, self.net
        )
    }
}

/// Pin bindings of every instance on one level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Binding {
    maps: Vec<PinNetMap>,
    unconnected: Vec<UnconnectedPin>,
}

impl Binding {
    /// Bindings of the instance at `index` in the level's instance list.
    pub fn pin_net_map(&self, index: usize) -> &PinNetMap {
        &self.maps[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PinNetMap> {
        self.maps.iter()
    }

    pub fn unconnected(&self) -> &[UnconnectedPin] {
        &self.unconnected
    }

    /// Unconnected pins belonging to one instance.
    pub fn unconnected_for(&self, index: usize) -> impl Iterator<Item = &UnconnectedPin> {
        self.unconnected.iter().filter(move |u| u.instance == index)
    }
}

/// Finds, for each instance pin, the net whose wires cover the pin location.
pub struct PinNetBinder<'a> {
    segments: &'a [NetSegment],
    resolution: &'a Resolution,
    tolerance: i64,
}

impl<'a> PinNetBinder<'a> {
    pub fn new(segments: &'a [NetSegment], resolution: &'a Resolution) -> Self {
        Self {
            segments,
            resolution,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: i64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Name of the first net (in resolution order) touching `pin`.
    pub fn net_at(&self, pin: &Pin) -> Option<&'a str> {
        let resolution: &'a Resolution = self.resolution;
        resolution
            .nets()
            .find(|net| {
                net.segments.iter().any(|id| {
                    self.segments[id.0]
                        .bounds()
                        .expand(self.tolerance)
                        .contains(pin.location)
                })
            })
            .map(|net| net.name.as_str())
    }

    /// Next `dnet<N>` name that no resolved net already uses.
    fn next_dangling_name(&self, counter: &mut usize) -> String {
        loop {
            let name = format!("{DEFAULT_NET_PREFIX}{counter}");
            *counter += 1;
            if self.resolution.net(&name).is_none() {
                return name;
            }
        }
    }

    /// Bind every pin of every instance. The `dnet` counter is scoped to this call.
    pub fn bind(&self, instances: &[Instance]) -> Binding {
        let mut binding = Binding::default();
        let mut dangling = 0usize;

        for (index, instance) in instances.iter().enumerate() {
            let mut map = PinNetMap::new();
            for (pin_name, pin) in &instance.pins {
                let net = match self.net_at(pin) {
                    Some(net) => net.to_string(),
                    None => {
                        let net = self.next_dangling_name(&mut dangling);
                        let unconnected = UnconnectedPin {
                            instance: index,
                            instance_name: instance.name(),
                            pin: pin_name.clone(),
                            net: net.clone(),
                        };
                        warn!("{unconnected}");
                        binding.unconnected.push(unconnected);
                        net
                    }
                };
                map.insert(pin_name.clone(), net);
            }
            if let Some(order) = instance.pin_order() {
                map = reorder_pins(map, &order);
            }
            binding.maps.push(map);
        }

        binding
    }
}

/// Reorder a pin map to a declared order.
///
/// Declared names come first in declared order; names that are not pins (or
/// repeat) are skipped; pins missing from the declaration follow in their
/// original order.
pub fn reorder_pins(mut map: PinNetMap, order: &[&str]) -> PinNetMap {
    let mut ordered = PinNetMap::with_capacity(map.len());
    for name in order {
        if let Some((pin, net)) = map.shift_remove_entry(*name) {
            ordered.insert(pin, net);
        }
    }
    ordered.extend(map);
    ordered
}
