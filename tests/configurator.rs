use fc_gnss::config::{GpsConfig, Provider};
use fc_gnss::driver_state::GpsState;
use fc_gnss::serial::LoopbackPort;
use fc_gnss::ubx::packets;
use fc_gnss::GpsDriver;

fn mon_ver_reply(hw_version: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 40];
    payload[30..30 + hw_version.len()].copy_from_slice(hw_version.as_bytes());
    packets::encode(0x0A, 0x04, &payload)
}

/// Cold start at the wrong baud: the configurator must poll MON-VER, get no
/// answer, cycle the baud table, and settle once the module answers.
#[test]
fn cold_start_detects_baud_then_reaches_configure() {
    let config = GpsConfig { provider: Provider::Ublox, ..GpsConfig::default() };
    let mut driver = GpsDriver::new(config);
    let mut port = LoopbackPort::new(9600);

    let mut now = 0u32;
    for _ in 0..10 {
        driver.tick(&mut port, now, 0);
        now += 400;
        if driver.driver_state().state == GpsState::DetectBaud {
            break;
        }
    }
    assert_eq!(driver.driver_state().state, GpsState::DetectBaud);

    // The module answers MON-VER as an M8 once polled, regardless of which
    // baud guess the port is currently on.
    port.feed(&mon_ver_reply("00080000"));
    for _ in 0..5 {
        driver.tick(&mut port, now, 0);
        now += 400;
        if driver.driver_state().state != GpsState::DetectBaud {
            break;
        }
    }
    assert_eq!(driver.driver_state().state, GpsState::ChangeBaud);
}

/// A NAK on the very first CONFIGURE step (DETECT_UNIT) restarts the
/// 21-step sequence from position 0 rather than aborting outright.
#[test]
fn nak_at_detect_unit_restarts_the_configure_sequence() {
    let config = GpsConfig { provider: Provider::Ublox, ..GpsConfig::default() };
    let mut driver = GpsDriver::new(config);
    let mut port = LoopbackPort::new(115_200);

    // Drive straight into CONFIGURE: two ticks (Unknown->Initialized->
    // DetectBaud), feed a MON-VER answer to reach ChangeBaud, then let the
    // baud-change wait elapse into Configure.
    driver.tick(&mut port, 0, 0);
    driver.tick(&mut port, 1, 0);
    port.feed(&mon_ver_reply("00080000"));
    driver.tick(&mut port, 2, 0);
    driver.tick(&mut port, 2000, 0);
    assert_eq!(driver.driver_state().state, GpsState::Configure);

    let entry = 2000 + 1001;
    driver.tick(&mut port, entry, 0); // sends step 0 (poll MON-VER)
    assert_eq!(driver.driver_state().state_position, 1);

    // Inject an ACK-NAK for the step-0 command before it would otherwise
    // time out.
    let nak_payload = [0x0A, 0x04];
    port.feed(&packets::encode(0x05, 0x00, &nak_payload));
    driver.tick(&mut port, entry + 10, 0);
    assert_eq!(driver.driver_state().state_position, 0);
}
