use gesture_arm::joints::JointId;
use gesture_arm::protocol::firmware::BOOT_ANGLES;
use gesture_arm::protocol::{Command, FirmwareInterpreter, ServoBank, encode};

#[derive(Default)]
struct Servos {
    angles: [u8; 4],
}

impl ServoBank for Servos {
    fn attach(&mut self, _channel: u8, _pin: u8) {}

    fn write(&mut self, channel: u8, angle: u8) {
        self.angles[usize::from(channel)] = angle;
    }
}

#[test]
fn firmware_applies_host_output_byte_by_byte() {
    let mut firmware = FirmwareInterpreter::new(Servos::default());
    firmware.boot();

    let commands = [
        Command::new(JointId::Shoulder, 12),
        Command::new(JointId::Elbow, 170),
        Command::new(JointId::Wrist, 0),
        Command::new(JointId::Hand, 180),
    ];
    for command in &commands {
        for byte in encode(command).unwrap() {
            firmware.feed_byte(byte);
        }
    }
    assert_eq!(firmware.servos().angles, [12, 170, 0, 180]);
    assert_eq!(firmware.stats().applied, 4);
}

#[test]
fn garbage_between_commands_is_ignored() {
    let mut firmware = FirmwareInterpreter::new(Servos::default());
    firmware.boot();

    firmware.feed(b"\x00\xffnoise\nS7,10\nS2,200\nS2,45\n");
    assert_eq!(firmware.angles(), [BOOT_ANGLES[0], BOOT_ANGLES[1], 45, BOOT_ANGLES[3]]);
    assert_eq!(firmware.stats().discarded, 3);
}
