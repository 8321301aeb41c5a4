//! CX endpoint service identifiers.
//!
//! ## GATT Service Layout
//!
//! | Entity          | UUID                                   | Perms            |
//! |-----------------|----------------------------------------|------------------|
//! | Primary service | `0a000001-cafe-cafe-cafe-deadbeefcafe` | n/a              |
//! | SEND            | `0a000002-cafe-cafe-cafe-deadbeefcafe` | Notify           |
//! | SEND CCC        | `0x2902`                               | Read + Write     |
//! | RECV            | `0a000003-cafe-cafe-cafe-deadbeefcafe` | Write            |

pub const SERVICE_UUID: u128 = 0x0a000001_cafe_cafe_cafe_deadbeefcafe;
pub const SEND_CHAR_UUID: u128 = 0x0a000002_cafe_cafe_cafe_deadbeefcafe;
pub const RECV_CHAR_UUID: u128 = 0x0a000003_cafe_cafe_cafe_deadbeefcafe;

/// Client Characteristic Configuration descriptor.
pub const CCC_UUID: u128 = uuid16(0x2902);

/// CCC value that enables notifications.
pub const CCC_NOTIFY: u16 = 0x0001;

/// Service UUID in over-the-air (little-endian) order, for the scan response.
pub const SERVICE_UUID_LE: [u8; 16] = SERVICE_UUID.to_le_bytes();

const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Expand a 16-bit assigned number onto the Bluetooth base UUID.
pub const fn uuid16(short: u16) -> u128 {
    BLUETOOTH_BASE_UUID | ((short as u128) << 96)
}
