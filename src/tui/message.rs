use nexstar_protocol::command::{Axis, Coordinates};
use nexstar_protocol::{DeviceModel, DeviceTime, LatitudeDms, LongitudeDms, TrackingMode};

/// Commands sent from the TUI to the mount task.
#[derive(Debug, Clone, PartialEq)]
pub enum MountCommand {
    /// Slew one axis at a fixed rate (-9..=9).
    Slew(Axis, i32),
    SlewStop,
    /// Goto a position in decimal degrees.
    Goto(Coordinates, f64, f64),
    CancelGoto,
    SetTrackingMode(TrackingMode),
    /// Set the device clock to the host clock.
    SyncClock,
    Quit,
}

/// Events sent from the mount task to the TUI.
#[derive(Debug)]
pub enum MountEvent {
    StateUpdate(MountState),
    DeviceInfo(DeviceInfo),
    Time(DeviceTime),
    Error(String),
    Connected,
    Disconnected,
}

/// Snapshot of polled mount state. `None` means not yet read or read failed.
#[derive(Debug, Clone, Default)]
pub struct MountState {
    pub ra_dec: Option<(f64, f64)>,
    pub azm_alt: Option<(f64, f64)>,
    pub tracking_mode: Option<TrackingMode>,
    pub aligned: Option<bool>,
    pub goto_in_progress: Option<bool>,
    pub tx_bits_per_sec: u32,
    pub rx_bits_per_sec: u32,
}

/// Details read once after connecting.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub model: Option<DeviceModel>,
    pub azm_version: Option<(u8, u8)>,
    pub alt_version: Option<(u8, u8)>,
    pub location: Option<(LatitudeDms, LongitudeDms)>,
    pub time: Option<DeviceTime>,
}
