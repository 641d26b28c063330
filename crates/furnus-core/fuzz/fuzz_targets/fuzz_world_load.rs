#![no_main]
use furnus_core::persist::DeviceRecord;
use furnus_core::test_utils::*;
use furnus_core::world::World;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to World::load and, as text, to the record loader.
    // Must not panic -- returning Err is fine.
    if let Ok(mut world) = World::load(data, test_registry()) {
        world.tick();
    }
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(record) = DeviceRecord::from_json(text) {
            let _ = furnus_core::device::Device::from_record(&record, origin(), test_registry());
        }
    }
});
