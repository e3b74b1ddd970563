//! Protobuf messages exchanged with the flight controller over the framed autopilot link.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Uplink {
    #[prost(oneof = "UplinkContent", tags = "1, 2, 3, 4")]
    pub content: Option<UplinkContent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Downlink {
    #[prost(oneof = "DownlinkContent", tags = "1, 2, 3, 4, 5")]
    pub content: Option<DownlinkContent>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum UplinkContent {
    #[prost(message, tag = "1")]
    RequestDataStream(RequestDataStream),
    #[prost(message, tag = "2")]
    CommandLong(CommandLong),
    #[prost(message, tag = "3")]
    MissionItemInt(MissionItemInt),
    #[prost(message, tag = "4")]
    SetMode(SetMode),
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum DownlinkContent {
    #[prost(message, tag = "1")]
    Heartbeat(Heartbeat),
    #[prost(message, tag = "2")]
    GlobalPositionInt(GlobalPositionInt),
    #[prost(message, tag = "3")]
    SysStatus(SysStatus),
    #[prost(message, tag = "4")]
    GpsRawInt(GpsRawInt),
    #[prost(message, tag = "5")]
    CommandAck(CommandAck),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum VehicleType {
    Generic = 0,
    FixedWing = 1,
    Quadrotor = 2,
    Hexarotor = 13,
    Octorotor = 14,
    Tricopter = 15,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct RequestDataStream {
    #[prost(uint32, tag = "1")]
    pub target_system: u32,
    #[prost(uint32, tag = "2")]
    pub target_component: u32,
    #[prost(uint32, tag = "3")]
    pub stream_id: u32,
    #[prost(uint32, tag = "4")]
    pub rate_hz: u32,
    #[prost(bool, tag = "5")]
    pub start: bool,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct CommandLong {
    #[prost(uint32, tag = "1")]
    pub target_system: u32,
    #[prost(uint32, tag = "2")]
    pub target_component: u32,
    #[prost(uint32, tag = "3")]
    pub command: u32,
    #[prost(float, tag = "4")]
    pub param1: f32,
    #[prost(float, tag = "5")]
    pub param2: f32,
    #[prost(float, tag = "6")]
    pub param3: f32,
    #[prost(float, tag = "7")]
    pub param4: f32,
    #[prost(float, tag = "8")]
    pub param5: f32,
    #[prost(float, tag = "9")]
    pub param6: f32,
    #[prost(float, tag = "10")]
    pub param7: f32,
}

/// Single guided-mode waypoint, sent as the "current" mission item.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct MissionItemInt {
    #[prost(uint32, tag = "1")]
    pub target_system: u32,
    #[prost(uint32, tag = "2")]
    pub target_component: u32,
    #[prost(uint32, tag = "3")]
    pub seq: u32,
    #[prost(uint32, tag = "4")]
    pub frame: u32,
    #[prost(uint32, tag = "5")]
    pub command: u32,
    #[prost(bool, tag = "6")]
    pub current: bool,
    #[prost(bool, tag = "7")]
    pub autocontinue: bool,
    /// Latitude in degrees * 1e7.
    #[prost(sint32, tag = "8")]
    pub x: i32,
    /// Longitude in degrees * 1e7.
    #[prost(sint32, tag = "9")]
    pub y: i32,
    /// Altitude in meters relative to home.
    #[prost(float, tag = "10")]
    pub z: f32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct SetMode {
    #[prost(uint32, tag = "1")]
    pub target_system: u32,
    #[prost(uint32, tag = "2")]
    pub custom_mode: u32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Heartbeat {
    #[prost(uint32, tag = "1")]
    pub system_id: u32,
    #[prost(uint32, tag = "2")]
    pub component_id: u32,
    #[prost(enumeration = "VehicleType", tag = "3")]
    pub vehicle_type: i32,
    #[prost(uint32, tag = "4")]
    pub custom_mode: u32,
    #[prost(bool, tag = "5")]
    pub armed: bool,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct GlobalPositionInt {
    /// Degrees * 1e7.
    #[prost(sint32, tag = "1")]
    pub lat: i32,
    /// Degrees * 1e7.
    #[prost(sint32, tag = "2")]
    pub lon: i32,
    /// Millimeters above mean sea level.
    #[prost(sint32, tag = "3")]
    pub alt: i32,
    /// Centimeters above home.
    #[prost(sint32, tag = "4")]
    pub relative_alt: i32,
    /// Centimeters per second, north.
    #[prost(sint32, tag = "5")]
    pub vx: i32,
    #[prost(sint32, tag = "6")]
    pub vy: i32,
    /// Centimeters per second, down.
    #[prost(sint32, tag = "7")]
    pub vz: i32,
    /// Centidegrees.
    #[prost(uint32, tag = "8")]
    pub hdg: u32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct SysStatus {
    /// Millivolts.
    #[prost(uint32, tag = "1")]
    pub voltage_battery: u32,
    /// Percent, negative if unknown.
    #[prost(sint32, tag = "2")]
    pub battery_remaining: i32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct GpsRawInt {
    #[prost(uint32, tag = "1")]
    pub fix_type: u32,
    #[prost(uint32, tag = "2")]
    pub satellites_visible: u32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct CommandAck {
    #[prost(uint32, tag = "1")]
    pub command: u32,
    #[prost(uint32, tag = "2")]
    pub result: u32,
}

impl DownlinkContent {
    /// The message kind, used to name what a wait timed out on.
    pub fn kind(&self) -> MessageKind {
        match self {
            DownlinkContent::Heartbeat(_) => MessageKind::Heartbeat,
            DownlinkContent::GlobalPositionInt(_) => MessageKind::GlobalPositionInt,
            DownlinkContent::SysStatus(_) => MessageKind::SysStatus,
            DownlinkContent::GpsRawInt(_) => MessageKind::GpsRawInt,
            DownlinkContent::CommandAck(_) => MessageKind::CommandAck,
        }
    }
}

/// Plain tag for each downlink message type.
#[derive(Debug, strum_macros::Display, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Heartbeat,
    GlobalPositionInt,
    SysStatus,
    GpsRawInt,
    CommandAck,
    /// Heartbeat carrying the requested motor state.
    ArmedConfirmation,
}
