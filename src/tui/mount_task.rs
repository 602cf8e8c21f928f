use std::ops::ControlFlow;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use nexstar_protocol::command::{Axis, Coordinates};
use nexstar_protocol::{DeviceTime, DeviceType, HandControl, NexStarError};
use tokio::sync::mpsc as tokio_mpsc;

use super::message::{DeviceInfo, MountCommand, MountEvent, MountState};

/// Bits per byte on the wire with 8N1 framing (1 start + 8 data + 1 stop).
const BITS_PER_BYTE: u64 = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run the mount polling loop on a blocking thread.
///
/// Probes the device once, then reads mount state every ~250ms and sends
/// updates via `event_tx`. Queued commands run before each polled query, so
/// a stop never waits behind a whole polling pass.
pub fn mount_loop(
    mut hc: HandControl,
    cmd_rx: std_mpsc::Receiver<MountCommand>,
    event_tx: tokio_mpsc::UnboundedSender<MountEvent>,
) {
    let _ = event_tx.send(MountEvent::Connected);
    let _ = event_tx.send(MountEvent::DeviceInfo(probe(&mut hc)));

    let mut last_rate_time = Instant::now();
    let mut last_tx_bytes: u64 = hc.tx_bytes();
    let mut last_rx_bytes: u64 = hc.rx_bytes();
    let mut tx_bits_per_sec: u32 = 0;
    let mut rx_bits_per_sec: u32 = 0;

    loop {
        let Some(poll) = poll_state(&mut hc, |hc| run_commands(hc, &cmd_rx, &event_tx)) else {
            shutdown(&mut hc);
            let _ = event_tx.send(MountEvent::Disconnected);
            return;
        };
        let mut state = poll.state;
        if let Some(e) = poll.error {
            let _ = event_tx.send(MountEvent::Error(format!("polling stopped: {e}")));
        }

        for anomaly in hc.take_anomalies() {
            let _ = event_tx.send(MountEvent::Error(anomaly.to_string()));
        }

        let elapsed = last_rate_time.elapsed();
        if elapsed >= Duration::from_secs(1) {
            tx_bits_per_sec = bits_per_sec(hc.tx_bytes() - last_tx_bytes, elapsed);
            rx_bits_per_sec = bits_per_sec(hc.rx_bytes() - last_rx_bytes, elapsed);
            last_tx_bytes = hc.tx_bytes();
            last_rx_bytes = hc.rx_bytes();
            last_rate_time = Instant::now();
        }
        state.tx_bits_per_sec = tx_bits_per_sec;
        state.rx_bits_per_sec = rx_bits_per_sec;

        if event_tx.send(MountEvent::StateUpdate(state)).is_err() {
            shutdown(&mut hc);
            return;
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Execute every queued command. Breaks when the UI asked to quit or went away.
fn run_commands(
    hc: &mut HandControl,
    cmd_rx: &std_mpsc::Receiver<MountCommand>,
    event_tx: &tokio_mpsc::UnboundedSender<MountEvent>,
) -> ControlFlow<()> {
    loop {
        match cmd_rx.try_recv() {
            Ok(MountCommand::Quit) | Err(std_mpsc::TryRecvError::Disconnected) => {
                return ControlFlow::Break(());
            }
            Ok(cmd) => {
                if let Err(e) = execute_command(hc, &cmd) {
                    let _ = event_tx.send(MountEvent::Error(format!("{e}")));
                } else if cmd == MountCommand::SyncClock {
                    match hc.get_time() {
                        Ok(time) => {
                            let _ = event_tx.send(MountEvent::Time(time));
                        }
                        Err(e) => {
                            let _ = event_tx.send(MountEvent::Error(format!("{e}")));
                        }
                    }
                }
            }
            Err(std_mpsc::TryRecvError::Empty) => return ControlFlow::Continue(()),
        }
    }
}

/// Stop any slew and release the port.
fn shutdown(hc: &mut HandControl) {
    if let Err(e) = hc.slew_stop() {
        warn!("failed to stop slew on exit: {e}");
    }
    let _ = hc.close();
}

pub fn execute_command(hc: &mut HandControl, cmd: &MountCommand) -> nexstar_protocol::Result<()> {
    match cmd {
        MountCommand::Slew(Axis::Azimuth, rate) => hc.slew_azm_fixed(*rate),
        MountCommand::Slew(Axis::Altitude, rate) => hc.slew_alt_fixed(*rate),
        MountCommand::SlewStop => hc.slew_stop(),
        MountCommand::Goto(Coordinates::RaDec, ra, dec) => hc.goto_ra_dec_precise(*ra, *dec),
        MountCommand::Goto(Coordinates::AzmAlt, azm, alt) => hc.goto_azm_alt_precise(*azm, *alt),
        MountCommand::CancelGoto => hc.cancel_goto(),
        MountCommand::SetTrackingMode(mode) => hc.set_tracking_mode(*mode),
        MountCommand::SyncClock => hc.set_time(&DeviceTime::now_local()),
        MountCommand::Quit => Ok(()),
    }
}

/// Read the slowly-changing device details.
///
/// Each field is read independently so one unsupported query does not hide
/// the rest.
pub fn probe(hc: &mut HandControl) -> DeviceInfo {
    let info = DeviceInfo {
        model: hc.get_device_model().ok(),
        azm_version: hc.get_device_version(DeviceType::AzmRaMotor).ok(),
        alt_version: hc.get_device_version(DeviceType::AltDecMotor).ok(),
        location: hc.get_location().ok(),
        time: hc.get_time().ok(),
    };

    if let Some(model) = info.model {
        info!("device model: {model}");
    }
    if let Some((major, minor)) = info.azm_version {
        info!("AZM/RA motor version {major}.{minor}");
    }
    if let Some((major, minor)) = info.alt_version {
        info!("ALT/DEC motor version {major}.{minor}");
    }
    info
}

/// One polling pass.
#[derive(Debug)]
pub struct Poll {
    pub state: MountState,
    /// Set when the device stopped answering and the pass was cut short.
    pub error: Option<NexStarError>,
}

type PollQuery = fn(&mut HandControl, &mut MountState) -> nexstar_protocol::Result<()>;

const POLL_QUERIES: [PollQuery; 5] = [
    poll_ra_dec,
    poll_azm_alt,
    poll_tracking_mode,
    poll_aligned,
    poll_goto_in_progress,
];

fn poll_ra_dec(hc: &mut HandControl, state: &mut MountState) -> nexstar_protocol::Result<()> {
    state.ra_dec = Some(hc.get_position_ra_dec_precise()?);
    Ok(())
}

fn poll_azm_alt(hc: &mut HandControl, state: &mut MountState) -> nexstar_protocol::Result<()> {
    state.azm_alt = Some(hc.get_position_azm_alt_precise()?);
    Ok(())
}

fn poll_tracking_mode(hc: &mut HandControl, state: &mut MountState) -> nexstar_protocol::Result<()> {
    state.tracking_mode = Some(hc.get_tracking_mode()?);
    Ok(())
}

fn poll_aligned(hc: &mut HandControl, state: &mut MountState) -> nexstar_protocol::Result<()> {
    state.aligned = Some(hc.is_aligned()?);
    Ok(())
}

fn poll_goto_in_progress(hc: &mut HandControl, state: &mut MountState) -> nexstar_protocol::Result<()> {
    state.goto_in_progress = Some(hc.is_goto_in_progress()?);
    Ok(())
}

/// Read the polled mount state, calling `before_query` ahead of each query.
///
/// A query that fails to decode leaves its field unset. A timeout ends the
/// pass with whatever was read so far. Returns `None` when `before_query`
/// breaks.
pub fn poll_state(
    hc: &mut HandControl,
    mut before_query: impl FnMut(&mut HandControl) -> ControlFlow<()>,
) -> Option<Poll> {
    let mut state = MountState::default();
    for query in POLL_QUERIES {
        if before_query(hc).is_break() {
            return None;
        }
        match query(hc, &mut state) {
            Ok(()) => {}
            Err(NexStarError::Timeout) => {
                return Some(Poll {
                    state,
                    error: Some(NexStarError::Timeout),
                });
            }
            Err(e) => debug!("poll query failed: {e}"),
        }
    }
    Some(Poll { state, error: None })
}

fn bits_per_sec(bytes: u64, elapsed: Duration) -> u32 {
    (bytes as f64 * BITS_PER_BYTE as f64 / elapsed.as_secs_f64()).round() as u32
}

#[cfg(test)]
mod tests {
    use nexstar_protocol::transport::mock::MockTransport;
    use nexstar_protocol::{DeviceModel, HandControlConfig, TrackingMode};

    use super::*;

    fn connect(mock: MockTransport) -> HandControl {
        connect_with_timeout(mock, Duration::from_millis(20))
    }

    fn connect_with_timeout(mock: MockTransport, timeout: Duration) -> HandControl {
        let config = HandControlConfig {
            timeout,
            ..HandControlConfig::default()
        };
        HandControl::new(mock, config)
    }

    fn poll_all(hc: &mut HandControl) -> Poll {
        poll_state(hc, |_| ControlFlow::Continue(())).unwrap()
    }

    #[test]
    fn test_bits_per_sec() {
        assert_eq!(bits_per_sec(96, Duration::from_secs(1)), 960);
        assert_eq!(bits_per_sec(48, Duration::from_secs(2)), 240);
        assert_eq!(bits_per_sec(0, Duration::from_millis(1500)), 0);
    }

    #[test]
    fn test_poll_state() {
        let mut mock = MockTransport::new();
        mock.expect(b"e", b"40000000,80000000#")
            .expect(b"z", b"80000000,40000000#")
            .expect(b"t", b"\x01#")
            .expect(b"J", b"\x01#")
            .expect(b"L", b"0#");
        let mut hc = connect(mock);

        let poll = poll_all(&mut hc);
        assert!(poll.error.is_none());
        let state = poll.state;
        assert_eq!(state.ra_dec, Some((90.0, 180.0)));
        assert_eq!(state.azm_alt, Some((180.0, 90.0)));
        assert_eq!(state.tracking_mode, Some(TrackingMode::AltAz));
        assert_eq!(state.aligned, Some(true));
        assert_eq!(state.goto_in_progress, Some(false));
    }

    #[test]
    fn test_poll_state_keeps_going_after_a_failure() {
        let mut mock = MockTransport::new();
        mock.expect(b"e", b"4000#")
            .expect(b"z", b"80000000,40000000#")
            .expect(b"t", b"\x09#")
            .expect(b"J", b"\x00#")
            .expect(b"L", b"1#");
        let mut hc = connect(mock);

        let poll = poll_all(&mut hc);
        assert!(poll.error.is_none());
        let state = poll.state;
        assert_eq!(state.ra_dec, None);
        assert_eq!(state.azm_alt, Some((180.0, 90.0)));
        assert_eq!(state.tracking_mode, None);
        assert_eq!(state.aligned, Some(false));
        assert_eq!(state.goto_in_progress, Some(true));
    }

    #[test]
    fn test_poll_state_stops_at_silent_device() {
        let timeout = Duration::from_millis(200);
        let mut mock = MockTransport::new();
        mock.expect(b"e", b"40000000,80000000#")
            .expect(b"z", b"")
            .expect(b"t", b"")
            .expect(b"J", b"")
            .expect(b"L", b"");
        let handle = mock.handle();
        let mut hc = connect_with_timeout(mock, timeout);

        let start = Instant::now();
        let poll = poll_all(&mut hc);
        assert!(start.elapsed() < timeout * 2);

        assert!(matches!(poll.error, Some(NexStarError::Timeout)));
        assert_eq!(poll.state.ra_dec, Some((90.0, 180.0)));
        assert_eq!(poll.state.azm_alt, None);
        assert_eq!(handle.sent().len(), 2);
        assert_eq!(handle.remaining_expectations(), 3);
    }

    #[test]
    fn test_queued_stop_runs_before_next_query() {
        let mut mock = MockTransport::new();
        mock.expect(b"e", b"40000000,80000000#")
            .expect(&[80, 2, 16, 36, 0, 0, 0, 0], b"#")
            .expect(&[80, 2, 17, 36, 0, 0, 0, 0], b"#")
            .expect(b"z", b"80000000,40000000#")
            .expect(b"t", b"\x01#")
            .expect(b"J", b"\x01#")
            .expect(b"L", b"0#");
        let handle = mock.handle();
        let mut hc = connect(mock);

        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let (event_tx, _event_rx) = tokio_mpsc::unbounded_channel();
        let mut queries = 0;
        let poll = poll_state(&mut hc, |hc| {
            // The stop is pressed while the first query is in flight.
            if queries == 1 {
                let _ = cmd_tx.send(MountCommand::SlewStop);
            }
            queries += 1;
            run_commands(hc, &cmd_rx, &event_tx)
        })
        .unwrap();

        assert_eq!(queries, 5);
        assert!(poll.error.is_none());
        assert_eq!(handle.remaining_expectations(), 0);
        assert_eq!(handle.sent()[1], vec![80u8, 2, 16, 36, 0, 0, 0, 0]);
    }

    #[test]
    fn test_quit_interrupts_poll() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let mut hc = connect(mock);

        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let (event_tx, _event_rx) = tokio_mpsc::unbounded_channel();
        cmd_tx.send(MountCommand::Quit).unwrap();

        assert!(poll_state(&mut hc, |hc| run_commands(hc, &cmd_rx, &event_tx)).is_none());
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_run_commands_reports_errors() {
        let mock = MockTransport::new();
        let mut hc = connect(mock);

        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let (event_tx, mut event_rx) = tokio_mpsc::unbounded_channel();
        cmd_tx.send(MountCommand::Slew(Axis::Azimuth, 12)).unwrap();

        assert!(run_commands(&mut hc, &cmd_rx, &event_tx).is_continue());
        assert!(matches!(event_rx.try_recv(), Ok(MountEvent::Error(_))));
    }

    #[test]
    fn test_probe() {
        let mut mock = MockTransport::new();
        mock.expect(b"m", b"\x0b#")
            .expect(&[80, 1, 16, 0xFE, 0, 0, 0, 2], b"\x05\x07#")
            .expect(&[80, 1, 17, 0xFE, 0, 0, 0, 2], b"\x05\x08#")
            .expect(b"w", &[0x30, 0x2e, 0x30, 0x00, 0x78, 0x2e, 0x30, 0x01, b'#'])
            .expect(b"h", b"\x07\x1e\x1c\x04\x0a\x14\x0b\x00#");
        let mut hc = connect(mock);

        let info = probe(&mut hc);
        assert_eq!(info.model, Some(DeviceModel::Se45));
        assert_eq!(info.azm_version, Some((5, 7)));
        assert_eq!(info.alt_version, Some((5, 8)));
        let (lat, lon) = info.location.unwrap();
        assert_eq!(lat.degrees(), 48);
        assert_eq!(lon.degrees(), 120);
        assert_eq!(info.time.unwrap().utc_offset_hours(), 11);
    }

    #[test]
    fn test_execute_slew_and_goto() {
        let mut mock = MockTransport::new();
        mock.expect(&[80, 2, 16, 37, 4, 0, 0, 0], b"#")
            .expect(&[80, 2, 17, 36, 9, 0, 0, 0], b"#")
            .expect(b"J", b"\x01#")
            .expect(b"r40000000,80000000", b"#")
            .expect(b"M", b"#");
        let handle = mock.handle();
        let mut hc = connect(mock);

        execute_command(&mut hc, &MountCommand::Slew(Axis::Azimuth, -4)).unwrap();
        execute_command(&mut hc, &MountCommand::Slew(Axis::Altitude, 9)).unwrap();
        execute_command(&mut hc, &MountCommand::Goto(Coordinates::RaDec, 90.0, 180.0)).unwrap();
        execute_command(&mut hc, &MountCommand::CancelGoto).unwrap();
        assert_eq!(handle.remaining_expectations(), 0);
    }

    #[test]
    fn test_execute_rejects_bad_rate_without_sending() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let mut hc = connect(mock);

        assert!(execute_command(&mut hc, &MountCommand::Slew(Axis::Azimuth, 12)).is_err());
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_shutdown_stops_slew_and_closes() {
        let mut mock = MockTransport::new();
        mock.expect(&[80, 2, 16, 36, 0, 0, 0, 0], b"#")
            .expect(&[80, 2, 17, 36, 0, 0, 0, 0], b"#");
        let handle = mock.handle();
        let mut hc = connect(mock);

        shutdown(&mut hc);
        assert!(!hc.is_open());
        assert!(handle.dropped());
        assert_eq!(handle.remaining_expectations(), 0);
    }
}
