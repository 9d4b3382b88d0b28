//! CAN frame handling for both buses.
//!
//! - `decode`: Inbound dispatch (ECM broadcasts, diagnostic responses,
//!   chassis wheel speeds)
//! - `encode`: Outbound payload construction (cluster gauges, diagnostic
//!   requests)
//!
//! Both buses run 500 kbit/s with 11-bit identifiers. The gateway is not a
//! CAN stack; frames arrive and leave through the [`crate::io::CanTx`]
//! boundary and everything here is pure payload math.

pub mod decode;
pub mod encode;

pub use decode::{afr_from_voltage, decode_chassis_frame, decode_ecm_frame};

// =============================================================================
// Frame identifiers
// =============================================================================

/// ECM coolant temperature broadcast.
pub const ECM_COOLANT_ID: u32 = 0x551;

/// ECM diagnostic responses to our queries.
pub const ECM_DIAG_RESPONSE_ID: u32 = 0x7E8;

/// Functional diagnostic request address the ECM listens on.
pub const ECM_DIAG_REQUEST_ID: u32 = 0x7DF;

/// Chassis individual wheel speed broadcast.
pub const CHASSIS_WHEEL_SPEED_ID: u32 = 0x1F0;

/// Cluster RPM gauge.
pub const CLUSTER_RPM_ID: u32 = 0x316;

/// Cluster coolant temperature gauge.
pub const CLUSTER_TEMP_ID: u32 = 0x329;

/// Cluster warning lights, fuel consumption counter, overtemp lamp.
pub const CLUSTER_MISC_ID: u32 = 0x545;

/// Vehicle speed frames the ECM expects; two identifiers carry the same
/// payload on this protocol revision.
pub const ECM_SPEED_IDS: [u32; 2] = [0x280, 0x284];

// =============================================================================
// Frame type
// =============================================================================

/// One classic CAN frame: identifier plus up to 8 payload bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CanFrame {
    pub id: u32,
    pub len: u8,
    pub data: [u8; 8],
}

impl CanFrame {
    /// Full 8-byte data frame.
    pub const fn new(id: u32, data: [u8; 8]) -> Self {
        Self { id, len: 8, data }
    }

    /// Payload bytes actually carried.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len.min(8))]
    }
}
