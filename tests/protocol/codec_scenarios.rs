use gesture_arm::error::{DecodeError, EncodeError};
use gesture_arm::joints::JointId;
use gesture_arm::protocol::{Command, decode, encode};

#[test]
fn elbow_at_ninety_decodes() {
    assert_eq!(
        decode(b"S1,90\n").unwrap(),
        Command {
            joint: JointId::Elbow,
            angle: 90
        }
    );
}

#[test]
fn unknown_servo_id_is_a_decode_error() {
    assert!(matches!(
        decode(b"S9,90\n"),
        Err(DecodeError::InvalidJointId(_))
    ));
}

#[test]
fn all_valid_commands_round_trip() {
    for joint in JointId::ALL {
        for angle in 0..=180_u8 {
            let command = Command::new(joint, angle);
            let bytes = encode(&command).unwrap();
            assert_eq!(bytes.last(), Some(&b'\n'));
            assert_eq!(decode(&bytes).unwrap(), command);
        }
    }
}

#[test]
fn out_of_range_angles_never_encode() {
    for joint in JointId::ALL {
        for angle in 181..=u8::MAX {
            assert_eq!(
                encode(&Command::new(joint, angle)),
                Err(EncodeError::AngleOutOfRange(angle))
            );
        }
    }
}
