//! Property tests for marker decoding and runner framing.

use std::io::Cursor;

use instrument_hooks::protocol::{read_frame, write_frame, Command, MarkerEvent, MAX_FRAME_LEN};
use instrument_hooks::{BackendError, MarkerError, MarkerType};
use proptest::prelude::*;

fn marker_type() -> impl Strategy<Value = MarkerType> {
    prop::sample::select(MarkerType::ALL.to_vec())
}

proptest! {
    #[test]
    fn marker_type_decodes_only_known_values(raw in any::<u8>()) {
        match MarkerType::try_from(raw) {
            Ok(ty) => prop_assert_eq!(ty.as_u8(), raw),
            Err(MarkerError::UnknownType(v)) => {
                prop_assert_eq!(v, raw);
                prop_assert!(raw > 3);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn marker_event_keeps_type_and_timestamp(ty in marker_type(), ts in any::<u64>()) {
        let event = MarkerEvent::new(ty, ts);
        prop_assert_eq!(event.marker_type(), ty);
        prop_assert_eq!(event.timestamp(), ts);
    }

    #[test]
    fn frame_length_prefix_matches_payload(pid in any::<i32>(), uri in ".{0,64}") {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Command::CurrentBenchmark { pid, uri }).unwrap();
        let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        prop_assert_eq!(len, buf.len() - 4);
    }

    #[test]
    fn oversized_length_rejected_before_reading(extra in 1u32..1024) {
        let len = MAX_FRAME_LEN as u32 + extra;
        let mut cursor = Cursor::new(len.to_le_bytes().to_vec());
        let result = read_frame(&mut cursor);
        prop_assert!(
            matches!(result, Err(BackendError::FrameTooLarge(n)) if n == len as usize),
            "unexpected result {:?}",
            result
        );
    }

    #[test]
    fn consecutive_frames_read_back_in_order(
        stamps in prop::collection::vec((marker_type(), any::<u64>()), 1..16)
    ) {
        let mut buf = Vec::new();
        for (ty, ts) in &stamps {
            let command = Command::AddMarker { pid: 1, marker: MarkerEvent::new(*ty, *ts) };
            write_frame(&mut buf, &command).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        for (ty, ts) in &stamps {
            match read_frame(&mut cursor).unwrap() {
                Command::AddMarker { marker, .. } => {
                    prop_assert_eq!(marker, MarkerEvent::new(*ty, *ts));
                }
                other => prop_assert!(false, "unexpected command {:?}", other),
            }
        }
    }
}
