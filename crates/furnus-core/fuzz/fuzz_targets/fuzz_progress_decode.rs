#![no_main]
use furnus_core::client::ClientWorld;
use furnus_core::device::DeviceKind;
use furnus_core::sync::ProgressMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary frames must decode to an error or a message, never panic.
    if let Ok(message) = ProgressMessage::decode(data) {
        let mut client = ClientWorld::new();
        client.track(message.pos(), DeviceKind::Furnace);
        client.apply(&message);
    }
});
