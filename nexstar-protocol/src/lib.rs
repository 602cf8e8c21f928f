//! Client-side driver for the Celestron NexStar hand control serial protocol.

pub mod angle;
pub mod command;
pub mod error;
pub mod hand_control;
pub mod location;
pub mod model;
pub mod protocol;
pub mod response;
pub mod time;
pub mod transport;

pub use angle::{Precision, to_dms};
pub use error::{NexStarError, Result};
pub use hand_control::{HandControl, HandControlConfig, ProtocolAnomaly};
pub use location::{LatitudeDirection, LatitudeDms, LongitudeDirection, LongitudeDms};
pub use model::{DeviceModel, DeviceType, TrackingMode};
pub use time::DeviceTime;
