use std::collections::VecDeque;

use xbee::{
    api::{
        commands::{AtCommand, AtResponse, DeliveryStatus, ModemStatus},
        frame::{self, checksum, verify, Frame, FrameType, MAX_PAYLOAD_SIZE},
    },
    device::XBee,
    module::LoRaWan,
    port::{Clock, Port, ReadError, SerialPort},
    Error,
};

use mock::{at_response, frame, MockError, MockPort, Recorder};

fn create_test_device(port: MockPort) -> XBee<MockPort, LoRaWan, Recorder> {
    XBee::new(port, LoRaWan::new(), Recorder::default())
}

#[test]
fn test_checksum() {
    // 0x88 + 0x01 + 'V' + 'R' + 0x00 + 0x12 = 0x143
    let payload = [0x01, 0x56, 0x52, 0x00, 0x12];
    assert_eq!(checksum(0x88, &payload), 0xBC);
    assert!(verify(0x88, &payload, 0xBC));
    assert!(!verify(0x88, &payload, 0xBD));
}

#[test]
fn test_encode_layout() {
    let encoded = frame::encode::<MockError>(0x08, &[0x01, b'A', b'I']).unwrap();
    assert_eq!(encoded.as_slice(), &[0x7E, 0x00, 0x04, 0x08, 0x01, b'A', b'I', 0x6C]);

    let encoded = frame::encode::<MockError>(0x08, &[]).unwrap();
    assert_eq!(encoded.as_slice(), &[0x7E, 0x00, 0x01, 0x08, 0xF7]);
}

#[test]
fn test_encode_rejects_oversize_payload() {
    let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
    assert_eq!(
        frame::encode::<MockError>(0x50, &payload),
        Err(Error::PayloadTooLarge)
    );
    assert!(frame::encode::<MockError>(0x50, &payload[..MAX_PAYLOAD_SIZE]).is_ok());
}

#[test]
fn test_decode_round_trip() {
    for len in [0usize, 1, 17, 120, MAX_PAYLOAD_SIZE] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
        let encoded = frame::encode::<MockError>(0xD0, &payload).unwrap();

        let mut port = MockPort::new();
        port.push_rx(&encoded);
        let decoded = frame::decode(&mut port).unwrap();

        assert_eq!(decoded.frame_type, 0xD0);
        assert_eq!(decoded.payload(), payload.as_slice());
        assert_eq!(decoded.length() as usize, len + 1);
        assert_eq!(decoded.kind(), Some(FrameType::LrRxPacket));
        assert_eq!(port.pending_rx(), 0);
    }
}

#[test]
fn test_decode_rejects_any_corrupted_byte() {
    let encoded = frame(0x88, &[0x01, b'V', b'R', 0x00, 0x12, 0x34]);

    // Flip each byte between the length field and the checksum
    for i in 3..encoded.len() - 1 {
        let mut corrupted = encoded.clone();
        corrupted[i] ^= 0x01;

        let mut port = MockPort::new();
        port.push_rx(&corrupted);
        assert_eq!(frame::decode(&mut port), Err(Error::InvalidChecksum), "byte {}", i);
    }
}

#[test]
fn test_decode_invalid_start_delimiter() {
    let mut port = MockPort::new();
    port.push_rx(&[0x55, 0x00, 0x01, 0x08, 0xF7]);
    assert_eq!(frame::decode(&mut port), Err(Error::InvalidStartDelimiter(0x55)));
}

#[test]
fn test_decode_frame_too_large() {
    let mut port = MockPort::new();
    port.push_rx(&[0x7E, 0x01, 0x01, 0x08]);
    assert_eq!(frame::decode(&mut port), Err(Error::FrameTooLarge(257)));
}

#[test]
fn test_decode_empty_frame() {
    let mut port = MockPort::new();
    port.push_rx(&[0x7E, 0x00, 0x00, 0xFF]);
    assert_eq!(frame::decode(&mut port), Err(Error::EmptyFrame));
}

#[test]
fn test_decode_short_read_is_timeout() {
    let mut port = MockPort::new();
    assert_eq!(frame::decode(&mut port), Err(Error::Timeout));

    let mut port = MockPort::new();
    port.push_rx(&[0x7E, 0x00, 0x06, 0x88, 0x01]);
    assert_eq!(frame::decode(&mut port), Err(Error::Timeout));
}

#[test]
fn test_decode_length_mismatch_times_out() {
    // Length 7 leaves no byte for the checksum
    let mut port = MockPort::new();
    port.push_rx(&[0x7E, 0x00, 0x07, 0x88, 0x01, 0x56, 0x52, 0x00, 0x12, 0x6A]);
    assert_eq!(frame::decode(&mut port), Err(Error::Timeout));
}

#[test]
fn test_frame_new() {
    let frame = Frame::new(0x8A, &[0x02]).unwrap();
    assert!(frame.is(FrameType::ModemStatus));
    assert_eq!(frame.checksum, checksum(0x8A, &[0x02]));
    assert!(Frame::new(0x8A, &[0u8; MAX_PAYLOAD_SIZE + 1]).is_none());
    assert_eq!(Frame::new(0x42, &[]).unwrap().kind(), Some(FrameType::SocketConnect));
    assert_eq!(Frame::new(0x77, &[]).unwrap().kind(), None);
}

#[test]
fn test_at_response_parsing() {
    let reply = AtResponse::from_bytes(&[0x05, b'D', b'B', 0x00, 0x2A]).unwrap();
    assert_eq!(reply.frame_id, 5);
    assert_eq!(&reply.command, b"DB");
    assert_eq!(reply.status, 0);
    assert_eq!(reply.data, &[0x2A]);

    assert!(AtResponse::from_bytes(&[0x05, b'D', b'B']).is_none());
}

#[test]
fn test_status_codes() {
    assert_eq!(ModemStatus::from(0x02), ModemStatus::Joined);
    assert_eq!(ModemStatus::from(0x03), ModemStatus::Disassociated);
    assert_eq!(ModemStatus::from(0x42), ModemStatus::Other(0x42));
    assert_eq!(DeliveryStatus::from(0x00), DeliveryStatus::Success);
    assert_eq!(DeliveryStatus::from(0x01), DeliveryStatus::AckFailed);
    assert_eq!(DeliveryStatus::from(0x22), DeliveryStatus::NotConnected);
    assert_eq!(DeliveryStatus::from(0x74), DeliveryStatus::Other(0x74));
    assert_eq!(AtCommand::VR.mnemonic(), *b"VR");
    assert_eq!(AtCommand::J1.mnemonic(), *b"J1");
}

#[test]
fn test_send_command_and_wait_vr() {
    let mut port = MockPort::new();
    port.reply_next_write(vec![0x7E, 0x00, 0x06, 0x88, 0x01, 0x56, 0x52, 0x00, 0x12, 0xBC]);
    let mut device = create_test_device(port);

    let mut response = [0u8; 4];
    let len = device
        .send_command_and_wait(AtCommand::VR, &[], &mut response, 5000)
        .unwrap();

    assert_eq!(len, 1);
    assert_eq!(response[0], 0x12);
    assert_eq!(
        device.port().writes()[0],
        vec![0x7E, 0x00, 0x04, 0x08, 0x01, b'V', b'R', 0x4E]
    );
}

#[test]
fn test_frame_ids_increase_from_one() {
    let mut device = create_test_device(MockPort::new());
    for _ in 0..10 {
        device.send_command(AtCommand::AI, &[]).unwrap();
    }

    let ids: Vec<u8> = device.port().writes().iter().map(|w| w[4]).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<u8>>());
}

#[test]
fn test_frame_ids_skip_zero_on_wraparound() {
    let mut device = create_test_device(MockPort::new());
    for _ in 0..300 {
        device.send_command(AtCommand::AI, &[]).unwrap();
    }

    let ids: Vec<u8> = device.port().writes().iter().map(|w| w[4]).collect();
    assert!(ids.iter().all(|&id| id != 0));
    assert_eq!(ids[254], 255);
    assert_eq!(ids[255], 1);
    assert_eq!(device.peek_frame_id(), 46);
}

#[test]
fn test_init_resets_frame_id() {
    let mut device = create_test_device(MockPort::new());
    device.send_command(AtCommand::AI, &[]).unwrap();
    device.send_command(AtCommand::AI, &[]).unwrap();
    assert_eq!(device.peek_frame_id(), 3);

    device.init(9600, None).unwrap();
    assert_eq!(device.peek_frame_id(), 1);
    assert_eq!(device.port().opened(), Some(9600));
}

#[test]
fn test_correlator_dispatches_unrelated_frames() {
    let mut port = MockPort::new();
    let mut replies = frame(0x8A, &[0x02]);
    replies.extend(frame(0xD0, &[0x07, 0xAA, 0xBB]));
    replies.extend(at_response(0x01, b"AI", 0x00, &[0x01]));
    port.reply_next_write(replies);
    let mut device = create_test_device(port);

    let mut response = [0u8; 1];
    let len = device
        .send_command_and_wait(AtCommand::AI, &[], &mut response, 5000)
        .unwrap();

    assert_eq!((len, response[0]), (1, 0x01));
    assert_eq!(device.last_modem_status(), Some(ModemStatus::Joined));
    assert_eq!(device.callbacks().received.len(), 1);
    assert_eq!(device.callbacks().received[0].payload, vec![0xAA, 0xBB]);
}

#[test]
fn test_correlator_skips_response_for_other_request() {
    let mut port = MockPort::new();
    let mut replies = at_response(0x09, b"AI", 0x00, &[0x05]);
    replies.extend(at_response(0x01, b"AI", 0x00, &[0x01]));
    port.reply_next_write(replies);
    let mut device = create_test_device(port);

    let mut response = [0u8; 1];
    device
        .send_command_and_wait(AtCommand::AI, &[], &mut response, 5000)
        .unwrap();
    assert_eq!(response[0], 0x01);
}

#[test]
fn test_correlator_survives_garbage() {
    let mut port = MockPort::new();
    let mut replies = vec![0x00, 0x13];
    replies.extend(at_response(0x01, b"HV", 0x00, &[0x12, 0x34]));
    port.reply_next_write(replies);
    let mut device = create_test_device(port);

    assert_eq!(device.hardware_version(), Ok(0x1234));
}

#[test]
fn test_correlator_command_rejected() {
    let mut port = MockPort::new();
    port.auto_reply_status(b"AK", 0x03, &[]);
    let mut device = create_test_device(port);

    assert_eq!(device.set_app_key(&[0x11; 16]), Err(Error::CommandRejected(0x03)));
}

#[test]
fn test_correlator_buffer_too_small() {
    let mut port = MockPort::new();
    port.auto_reply(b"VR", &[0x01, 0x02, 0x03, 0x04]);
    let mut device = create_test_device(port);

    let mut response = [0u8; 2];
    assert_eq!(
        device.send_command_and_wait(AtCommand::VR, &[], &mut response, 5000),
        Err(Error::BufferTooSmall)
    );
}

#[test]
fn test_correlator_timeout() {
    let mut device = create_test_device(MockPort::new());

    let mut response = [0u8; 1];
    assert_eq!(
        device.send_command_and_wait(AtCommand::AI, &[], &mut response, 500),
        Err(Error::ResponseTimeout)
    );
    assert!(device.port().now() >= 500);
    assert!(device.port().now() < 1000);
}

#[test]
fn test_send_command_write_failure() {
    let mut port = MockPort::new();
    port.fail_writes();
    let mut device = create_test_device(port);

    assert_eq!(device.send_command(AtCommand::RE, &[]), Err(Error::Port(MockError::Error)));
}

#[test]
fn test_common_commands() {
    let mut port = MockPort::new();
    port.auto_reply(b"VR", &[0x00, 0x00, 0x11, 0x0B]);
    port.auto_reply(b"HV", &[0x41, 0x2D]);
    port.auto_reply(b"SH", &[0x00, 0x13, 0xA2, 0x00]);
    port.auto_reply(b"SL", &[0x41, 0x5B, 0x3C, 0x01]);
    port.auto_reply(b"DB", &[0x4A]);
    port.auto_reply(b"WR", &[]);
    port.auto_reply(b"AC", &[]);
    port.auto_reply(b"BD", &[]);
    let mut device = create_test_device(port);

    assert_eq!(device.firmware_version(), Ok(0x110B));
    assert_eq!(device.hardware_version(), Ok(0x412D));
    assert_eq!(device.serial_number(), Ok(0x0013_A200_415B_3C01));
    assert_eq!(device.last_rssi(), Ok(-74));
    assert_eq!(device.write_config(), Ok(()));
    assert_eq!(device.apply_changes(), Ok(()));
    assert_eq!(device.set_baud_rate(3), Ok(()));

    let (frame_type, payload) = device.port().written_frame(7);
    assert_eq!(frame_type, 0x08);
    assert_eq!(payload, &[8, b'B', b'D', 3]);
}

#[test]
fn test_common_command_wrong_length() {
    let mut port = MockPort::new();
    port.auto_reply(b"VR", &[0x11, 0x0B]);
    let mut device = create_test_device(port);

    assert_eq!(device.firmware_version(), Err(Error::UnexpectedResponse));
}

#[test]
fn test_process() {
    let mut device = create_test_device(MockPort::new());
    assert_eq!(device.process(), Ok(None));

    device.port_mut().push_rx(&frame(0x8A, &[0x00]));
    assert_eq!(device.process(), Ok(Some(0x8A)));
    assert_eq!(device.last_modem_status(), Some(ModemStatus::HardwareReset));

    device.port_mut().push_rx(&[0x42]);
    assert_eq!(device.process(), Err(Error::InvalidStartDelimiter(0x42)));

    device.port_mut().push_rx(&frame(0x77, &[0x01, 0x02]));
    assert_eq!(device.process(), Ok(Some(0x77)));
}

#[test]
fn test_hard_reset_needs_reset_line() {
    let mut device = create_test_device(MockPort::new());
    assert_eq!(device.hard_reset(), Err(Error::NotSupported));

    let mut device = create_test_device(MockPort::new().with_reset_line());
    assert_eq!(device.hard_reset(), Ok(()));
    assert_eq!(device.port().hard_resets(), 1);
}

/// Fake `embedded-hal` serial peripheral
struct FakeSerial {
    rx: VecDeque<Result<u8, nb::Error<FakeSerialError>>>,
    tx: Vec<u8>,
    flushed: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum FakeSerialError {
    Framing,
}

impl embedded_hal::serial::Read<u8> for FakeSerial {
    type Error = FakeSerialError;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().unwrap_or(Err(nb::Error::WouldBlock))
    }
}

impl embedded_hal::serial::Write<u8> for FakeSerial {
    type Error = FakeSerialError;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.tx.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.flushed = true;
        Ok(())
    }
}

struct FakeDelay;

impl embedded_hal::blocking::delay::DelayMs<u32> for FakeDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}

/// Clock that ticks one millisecond per reading
struct FakeClock(u32);

impl Clock for FakeClock {
    fn millis(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

fn fake_serial(rx: &[u8]) -> FakeSerial {
    FakeSerial {
        rx: rx.iter().map(|&b| Ok(b)).collect(),
        tx: Vec::new(),
        flushed: false,
    }
}

#[test]
fn test_serial_port_write_and_read() {
    let mut port = SerialPort::new(fake_serial(&[0x7E, 0x00, 0x02]), FakeDelay, FakeClock(0));

    assert_eq!(port.write(&[0x01, 0x02, 0x03]), Ok(3));

    let mut buffer = [0u8; 2];
    assert_eq!(port.read(&mut buffer), Ok(2));
    assert_eq!(buffer, [0x7E, 0x00]);

    // Partial read once the timeout passes
    port.set_read_timeout(10);
    let mut buffer = [0u8; 4];
    assert_eq!(port.read(&mut buffer), Ok(1));
    assert_eq!(buffer[0], 0x02);

    // Nothing at all is a timeout
    assert_eq!(port.read(&mut buffer), Err(ReadError::Timeout));

    let (serial, _, _) = port.release();
    assert_eq!(serial.tx, vec![0x01, 0x02, 0x03]);
    assert!(serial.flushed);
}

#[test]
fn test_serial_port_read_error() {
    let mut serial = fake_serial(&[0x7E]);
    serial.rx.push_back(Err(nb::Error::Other(FakeSerialError::Framing)));
    let mut port = SerialPort::new(serial, FakeDelay, FakeClock(0));

    let mut buffer = [0u8; 2];
    assert_eq!(port.read(&mut buffer), Err(ReadError::Other(FakeSerialError::Framing)));
}

#[test]
fn test_serial_port_open_flushes_stale_input() {
    let mut port = SerialPort::new(fake_serial(&[0xAA, 0xBB]), FakeDelay, FakeClock(0));
    port.open(9600, None).unwrap();

    port.set_read_timeout(5);
    let mut buffer = [0u8; 1];
    assert_eq!(port.read(&mut buffer), Err(ReadError::Timeout));
}

#[test]
fn test_device_over_serial_port() {
    let reply = at_response(0x01, b"DB", 0x00, &[0x50]);
    let port = SerialPort::new(fake_serial(&reply), FakeDelay, FakeClock(0));
    let mut device = XBee::new(port, LoRaWan::new(), ());

    assert_eq!(device.last_rssi(), Ok(-80));
}
