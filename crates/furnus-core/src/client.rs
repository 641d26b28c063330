use crate::device::DeviceKind;
use crate::id::BlockPos;
use crate::sync::ProgressMessage;
use std::collections::{BTreeMap, HashMap};

/// What a UI client knows about one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceView {
    pub kind: DeviceKind,
    pub burning: bool,
    pub fuel: i32,
    pub max_fuel: i32,
    pub progress: BTreeMap<usize, u32>,
}

impl DeviceView {
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            burning: false,
            fuel: 0,
            max_fuel: 0,
            progress: (0..3).map(|i| (i, 0)).collect(),
        }
    }

    pub fn progress(&self, slot: usize) -> u32 {
        self.progress.get(&slot).copied().unwrap_or(0)
    }

    /// Fraction of the fuel bar to draw, in `0.0..=1.0`.
    pub fn fuel_fraction(&self) -> f64 {
        if self.max_fuel <= 0 {
            0.0
        } else {
            (self.fuel as f64 / self.max_fuel as f64).clamp(0.0, 1.0)
        }
    }
}

/// Presentation-side mirror of the devices a client is watching.
#[derive(Debug, Default)]
pub struct ClientWorld {
    views: HashMap<BlockPos, DeviceView>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start mirroring a device, typically when its UI opens.
    pub fn track(&mut self, pos: BlockPos, kind: DeviceKind) {
        self.views.entry(pos).or_insert_with(|| DeviceView::new(kind));
    }

    pub fn untrack(&mut self, pos: BlockPos) -> Option<DeviceView> {
        self.views.remove(&pos)
    }

    pub fn view(&self, pos: BlockPos) -> Option<&DeviceView> {
        self.views.get(&pos)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Overwrite the mirrored state at the message's position. Returns
    /// `false` when nothing is mirrored there.
    pub fn apply(&mut self, message: &ProgressMessage) -> bool {
        let Some(view) = self.views.get_mut(&message.pos()) else {
            return false;
        };
        view.progress = message.progress.clone();
        view.fuel = message.fuel;
        view.max_fuel = message.max_fuel;
        view.burning = message.burning;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_at(pos: BlockPos) -> ProgressMessage {
        ProgressMessage {
            burning: true,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            fuel: 40,
            max_fuel: 80,
            progress: [(0, 7)].into_iter().collect(),
        }
    }

    #[test]
    fn apply_overwrites_tracked_view() {
        let pos = BlockPos::new(1, 2, 3);
        let mut client = ClientWorld::new();
        client.track(pos, DeviceKind::Furnace);
        assert!(client.apply(&message_at(pos)));

        let view = client.view(pos).unwrap();
        assert!(view.burning);
        assert_eq!(view.progress(0), 7);
        assert_eq!(view.progress(1), 0);
        assert_eq!(view.fuel_fraction(), 0.5);
    }

    #[test]
    fn apply_to_unknown_position_is_noop() {
        let mut client = ClientWorld::new();
        client.track(BlockPos::new(0, 0, 0), DeviceKind::Pulverizer);
        assert!(!client.apply(&message_at(BlockPos::new(9, 9, 9))));
        assert_eq!(client.len(), 1);
        assert!(!client.view(BlockPos::new(0, 0, 0)).unwrap().burning);
    }

    #[test]
    fn empty_fuel_bar_without_max() {
        assert_eq!(DeviceView::new(DeviceKind::Furnace).fuel_fraction(), 0.0);
    }
}
