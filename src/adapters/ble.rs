//! Bluedroid GATT server adapter for the CX endpoint service.
//!
//! Implements [`NotifyTransport`] for the endpoint server and routes GATTS
//! callbacks (connect, disconnect, writes) into it.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Attribute        | UUID                          | Perms        |
//! |------------------|-------------------------------|--------------|
//! | CX endpoint svc  | `0a000001-…-deadbeefcafe`     | n/a          |
//! | SEND             | `0a000002-…-deadbeefcafe`     | Notify       |
//! | SEND CCC         | `0x2902`                      | Read+Write   |
//! | RECV             | `0a000003-…-deadbeefcafe`     | Write        |

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

use log::{debug, info};

use crate::app::channels::ServerEventForwarder;
use crate::app::ports::NotifyTransport;
use crate::endpoint::uuid::{CCC_NOTIFY, CCC_UUID, RECV_CHAR_UUID, SEND_CHAR_UUID};
use crate::endpoint::{ConnectionRef, EndpointServer};
use crate::error::TransportError;

/// Returned by [`BleNotifier`] while no central is connected (ENOTCONN).
pub const ERR_NOT_CONNECTED: i32 = -128;

/// ATT handle 0 is reserved; used here as "not yet assigned".
const NO_HANDLE: u16 = 0;

// ───────────────────────────────────────────────────────────────
// Attribute table state
// ───────────────────────────────────────────────────────────────

/// Handles assigned by the stack plus the current link, shared between the
/// GATTS callback and the notifier.
pub struct GattState {
    gatts_if: AtomicU8,
    connected: AtomicBool,
    conn_id: AtomicU16,
    send: AtomicU16,
    send_ccc: AtomicU16,
    recv: AtomicU16,
}

impl GattState {
    pub const fn new() -> Self {
        Self {
            gatts_if: AtomicU8::new(0),
            connected: AtomicBool::new(false),
            conn_id: AtomicU16::new(0),
            send: AtomicU16::new(NO_HANDLE),
            send_ccc: AtomicU16::new(NO_HANDLE),
            recv: AtomicU16::new(NO_HANDLE),
        }
    }

    pub fn set_interface(&self, gatts_if: u8) {
        self.gatts_if.store(gatts_if, Ordering::Relaxed);
    }

    pub fn interface(&self) -> u8 {
        self.gatts_if.load(Ordering::Relaxed)
    }

    /// Record the handle the stack assigned to `uuid`. Unknown UUIDs are ignored.
    pub fn record_attribute(&self, uuid: u128, handle: u16) -> bool {
        let slot = match uuid {
            SEND_CHAR_UUID => &self.send,
            CCC_UUID => &self.send_ccc,
            RECV_CHAR_UUID => &self.recv,
            _ => return false,
        };
        slot.store(handle, Ordering::Release);
        true
    }

    pub fn send_handle(&self) -> Option<u16> {
        Self::assigned(&self.send)
    }

    pub fn send_ccc_handle(&self) -> Option<u16> {
        Self::assigned(&self.send_ccc)
    }

    pub fn recv_handle(&self) -> Option<u16> {
        Self::assigned(&self.recv)
    }

    /// All three attributes have been added to the table.
    pub fn is_registered(&self) -> bool {
        self.send_handle().is_some() && self.send_ccc_handle().is_some() && self.recv_handle().is_some()
    }

    pub fn connection(&self) -> Option<ConnectionRef> {
        self.connected
            .load(Ordering::Acquire)
            .then(|| ConnectionRef(self.conn_id.load(Ordering::Relaxed)))
    }

    fn set_connection(&self, conn: Option<u16>) {
        match conn {
            Some(id) => {
                self.conn_id.store(id, Ordering::Relaxed);
                self.connected.store(true, Ordering::Release);
            }
            None => self.connected.store(false, Ordering::Release),
        }
    }

    fn assigned(slot: &AtomicU16) -> Option<u16> {
        match slot.load(Ordering::Acquire) {
            NO_HANDLE => None,
            handle => Some(handle),
        }
    }
}

impl Default for GattState {
    fn default() -> Self {
        Self::new()
    }
}

/// Firmware-wide attribute table state.
pub static GATT_STATE: GattState = GattState::new();

// ───────────────────────────────────────────────────────────────
// Notifier (NotifyTransport)
// ───────────────────────────────────────────────────────────────

/// Sends SEND notifications to the connected central.
#[derive(Clone, Copy)]
pub struct BleNotifier<'a> {
    state: &'a GattState,
}

impl<'a> BleNotifier<'a> {
    pub const fn new(state: &'a GattState) -> Self {
        Self { state }
    }
}

impl NotifyTransport for BleNotifier<'_> {
    fn notify(&self, data: &[u8]) -> Result<(), TransportError> {
        let (Some(conn), Some(handle)) = (self.state.connection(), self.state.send_handle()) else {
            return Err(TransportError(ERR_NOT_CONNECTED));
        };
        platform_notify(self.state.interface(), conn.0, handle, data)
    }
}

#[cfg(target_os = "espidf")]
fn platform_notify(gatts_if: u8, conn_id: u16, handle: u16, data: &[u8]) -> Result<(), TransportError> {
    use esp_idf_svc::sys::*;
    // SAFETY: the stack copies `data` into its own PDU before returning.
    let ret = unsafe {
        esp_ble_gatts_send_indicate(
            gatts_if,
            conn_id,
            handle,
            data.len() as u16,
            data.as_ptr().cast_mut(),
            false,
        )
    };
    if ret == ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(TransportError(ret))
    }
}

#[cfg(not(target_os = "espidf"))]
fn platform_notify(_gatts_if: u8, conn_id: u16, handle: u16, data: &[u8]) -> Result<(), TransportError> {
    debug!(
        "BLE(sim): notify conn={} handle={} {:02x?}",
        conn_id, handle, data
    );
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Callback router
// ───────────────────────────────────────────────────────────────

/// Which attribute a GATTS write landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Recv,
    SendCcc,
    Unknown,
}

/// Platform-independent half of the GATTS callback: keeps the attribute
/// state and the endpoint server in step with the stack.
pub struct GattRouter<'a, T: NotifyTransport> {
    state: &'a GattState,
    server: &'a EndpointServer<T>,
    events: ServerEventForwarder<'a>,
}

impl<'a, T: NotifyTransport> GattRouter<'a, T> {
    pub const fn new(
        state: &'a GattState,
        server: &'a EndpointServer<T>,
        events: ServerEventForwarder<'a>,
    ) -> Self {
        Self {
            state,
            server,
            events,
        }
    }

    pub fn on_connect(&self, conn_id: u16) {
        info!("BLE GATTS: central connected (conn_id={})", conn_id);
        self.state.set_connection(Some(conn_id));
        self.events.connected(ConnectionRef(conn_id));
    }

    /// The peer's CCC no longer applies once the link is gone.
    pub fn on_disconnect(&self, conn_id: u16, reason: u8) {
        info!("BLE GATTS: central disconnected (conn_id={}, reason=0x{:02x})", conn_id, reason);
        self.state.set_connection(None);
        self.server.on_subscription_change(false);
        self.events.disconnected(ConnectionRef(conn_id), reason);
    }

    pub fn on_write(&self, handle: u16, data: &[u8]) -> WriteTarget {
        if Some(handle) == self.state.recv_handle() {
            self.server.on_write(data);
            WriteTarget::Recv
        } else if Some(handle) == self.state.send_ccc_handle() {
            self.server.on_ccc_write(ccc_value(data));
            WriteTarget::SendCcc
        } else {
            debug!("BLE GATTS: write to unknown handle {}", handle);
            WriteTarget::Unknown
        }
    }

    /// Current value of the SEND CCC descriptor, for read requests.
    pub fn ccc_value(&self) -> u16 {
        if self.server.is_notify_enabled() {
            CCC_NOTIFY
        } else {
            0
        }
    }
}

/// Decode a CCC write (little-endian u16; short writes zero-extend).
fn ccc_value(data: &[u8]) -> u16 {
    match data {
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
        [lo] => u16::from(*lo),
        [] => 0,
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

pub struct BleServer {
    state: BleState,
    device_name: heapless::String<24>,
}

impl BleServer {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Bring up the stack, register the service table and advertise.
    ///
    /// RECV/CCC writes are routed into `server`; connection changes and
    /// received payloads are queued through `events`.
    pub fn start(
        &mut self,
        server: &'static EndpointServer<BleNotifier<'static>>,
        events: ServerEventForwarder<'static>,
    ) -> Result<(), TransportError> {
        info!("BLE: starting CX endpoint as '{}'", self.device_name);
        match self.platform_start(server, events) {
            Ok(()) => {
                self.state = BleState::Advertising;
                Ok(())
            }
            Err(e) => {
                self.state = BleState::Failed;
                Err(e)
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(
        &mut self,
        server: &'static EndpointServer<BleNotifier<'static>>,
        events: ServerEventForwarder<'static>,
    ) -> Result<(), TransportError> {
        esp::start(&self.device_name, server, events)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(
        &mut self,
        _server: &'static EndpointServer<BleNotifier<'static>>,
        _events: ServerEventForwarder<'static>,
    ) -> Result<(), TransportError> {
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name,
            crate::endpoint::uuid::SERVICE_UUID
        );
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid glue
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures; the router is parked in a static for them.

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::{AtomicU16, Ordering};
    use std::sync::OnceLock;

    use esp_idf_svc::sys::*;
    use log::{error, info, warn};

    use super::{BleNotifier, GattRouter, GATT_STATE};
    use crate::app::channels::ServerEventForwarder;
    use crate::endpoint::uuid::{uuid16, CCC_UUID, RECV_CHAR_UUID, SEND_CHAR_UUID, SERVICE_UUID, SERVICE_UUID_LE};
    use crate::endpoint::EndpointServer;
    use crate::error::TransportError;

    /// Service declaration + SEND (2) + CCC + RECV (2).
    const SERVICE_NUM_HANDLES: u16 = 6;

    static ROUTER: OnceLock<GattRouter<'static, BleNotifier<'static>>> = OnceLock::new();
    static SVC_HANDLE: AtomicU16 = AtomicU16::new(0);

    fn check(ret: esp_err_t, what: &str) -> Result<(), TransportError> {
        if ret == ESP_OK as esp_err_t {
            Ok(())
        } else {
            error!("BLE: {} failed ({})", what, ret);
            Err(TransportError(ret))
        }
    }

    fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
        // SAFETY: esp_bt_uuid_t is a plain C struct; all-zero is valid.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_128 as u16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    fn uuid16_to_esp(short: u16) -> esp_bt_uuid_t {
        // SAFETY: as above.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_16 as u16;
        t.uuid.uuid16 = short;
        t
    }

    fn uuid_from_esp(id: &esp_bt_uuid_t) -> u128 {
        // SAFETY: `len` selects the active union member.
        unsafe {
            match u32::from(id.len) {
                ESP_UUID_LEN_16 => uuid16(id.uuid.uuid16),
                ESP_UUID_LEN_128 => u128::from_le_bytes(id.uuid.uuid128),
                _ => 0,
            }
        }
    }

    unsafe fn add_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
        let mut char_uuid = uuid128_to_esp(uuid);
        // SAFETY: null value/control pointers select stack defaults (response by app).
        unsafe {
            esp_ble_gatts_add_char(
                svc_handle,
                &mut char_uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            );
        }
    }

    unsafe fn start_advertising() {
        let mut adv_params = esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            // SAFETY: remaining fields are plain integers / arrays.
            ..unsafe { core::mem::zeroed() }
        };
        // SAFETY: params are copied by the stack.
        let ret = unsafe { esp_ble_gap_start_advertising(&mut adv_params) };
        if ret != ESP_OK as esp_err_t {
            warn!("BLE GAP: start advertising failed ({})", ret);
        }
    }

    pub(super) fn start(
        device_name: &str,
        server: &'static EndpointServer<BleNotifier<'static>>,
        events: ServerEventForwarder<'static>,
    ) -> Result<(), TransportError> {
        if ROUTER.set(GattRouter::new(&GATT_STATE, server, events)).is_err() {
            warn!("BLE: already started");
            return Ok(());
        }
        let name = std::ffi::CString::new(device_name).map_err(|_| TransportError(ESP_ERR_INVALID_ARG as esp_err_t))?;

        // SAFETY: called once from main() before the event loop; the
        // callbacks registered below only touch atomics and the router.
        unsafe {
            // Release classic BT memory (BLE-only mode).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            check(esp_bt_controller_init(&mut bt_cfg), "bt_controller_init")?;
            check(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE), "bt_controller_enable")?;
            check(esp_bluedroid_init(), "bluedroid_init")?;
            check(esp_bluedroid_enable(), "bluedroid_enable")?;

            check(esp_ble_gap_register_callback(Some(gap_event_handler)), "gap_register_callback")?;
            check(esp_ble_gatts_register_callback(Some(gatts_event_handler)), "gatts_register_callback")?;
            check(esp_ble_gatts_app_register(0), "gatts_app_register")?;

            check(esp_ble_gap_set_device_name(name.as_ptr()), "set_device_name")?;

            // Advertising data: flags + complete name.
            let mut adv_data = esp_ble_adv_data_t {
                set_scan_rsp: false,
                include_name: true,
                flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                ..core::mem::zeroed()
            };
            check(esp_ble_gap_config_adv_data(&mut adv_data), "config_adv_data")?;

            // Scan response: the 128-bit service UUID (copied by the stack).
            let mut svc_uuid = SERVICE_UUID_LE;
            let mut scan_rsp = esp_ble_adv_data_t {
                set_scan_rsp: true,
                service_uuid_len: svc_uuid.len() as u16,
                p_service_uuid: svc_uuid.as_mut_ptr(),
                ..core::mem::zeroed()
            };
            check(esp_ble_gap_config_adv_data(&mut scan_rsp), "config_scan_rsp")?;
        }

        info!("BLE(espidf): Bluedroid stack initialized, advertising as '{}'", device_name);
        Ok(())
    }

    unsafe extern "C" fn gap_event_handler(event: esp_gap_ble_cb_event_t, _param: *mut esp_ble_gap_cb_param_t) {
        match event {
            // Scan response is configured last; advertise once it is in place.
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
                // SAFETY: GAP callback context.
                unsafe { start_advertising() };
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                info!("BLE GAP: advertising started");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("BLE GAP: advertising stopped");
            }
            _ => {}
        }
    }

    unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        let Some(router) = ROUTER.get() else {
            return;
        };
        // SAFETY: `param` is valid for the duration of the callback and the
        // union member read matches `event`.
        unsafe {
            match event {
                esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                    info!("BLE GATTS: app registered (if={})", gatts_if);
                    GATT_STATE.set_interface(gatts_if);
                    let mut svc_id = esp_gatt_srvc_id_t {
                        id: esp_gatt_id_t {
                            uuid: uuid128_to_esp(SERVICE_UUID),
                            inst_id: 0,
                        },
                        is_primary: true,
                    };
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, SERVICE_NUM_HANDLES);
                }
                esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                    let svc_handle = (*param).create.service_handle;
                    SVC_HANDLE.store(svc_handle, Ordering::Relaxed);
                    info!("BLE GATTS: service created (handle={})", svc_handle);
                    esp_ble_gatts_start_service(svc_handle);
                    add_char(svc_handle, SEND_CHAR_UUID, 0, ESP_GATT_CHAR_PROP_BIT_NOTIFY);
                }
                esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                    let p = &(*param).add_char;
                    let uuid = uuid_from_esp(&p.char_uuid);
                    GATT_STATE.record_attribute(uuid, p.attr_handle);
                    if uuid == SEND_CHAR_UUID {
                        info!("BLE GATTS: SEND char (handle={})", p.attr_handle);
                        let mut ccc_uuid = uuid16_to_esp(ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16);
                        esp_ble_gatts_add_char_descr(
                            SVC_HANDLE.load(Ordering::Relaxed),
                            &mut ccc_uuid,
                            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                            core::ptr::null_mut(),
                            core::ptr::null_mut(),
                        );
                    } else if uuid == RECV_CHAR_UUID {
                        info!("BLE GATTS: RECV char (handle={}), table complete", p.attr_handle);
                    }
                }
                esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                    let p = &(*param).add_char_descr;
                    if uuid_from_esp(&p.descr_uuid) == CCC_UUID {
                        GATT_STATE.record_attribute(CCC_UUID, p.attr_handle);
                        info!("BLE GATTS: SEND CCC (handle={})", p.attr_handle);
                        add_char(
                            SVC_HANDLE.load(Ordering::Relaxed),
                            RECV_CHAR_UUID,
                            ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
                        );
                    }
                }
                esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                    router.on_connect((*param).connect.conn_id);
                }
                esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                    let p = &(*param).disconnect;
                    router.on_disconnect(p.conn_id, p.reason as u8);
                    start_advertising();
                }
                esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                    let p = &(*param).write;
                    let data = if p.value.is_null() {
                        &[][..]
                    } else {
                        core::slice::from_raw_parts(p.value, p.len as usize)
                    };
                    router.on_write(p.handle, data);
                    if p.need_rsp {
                        esp_ble_gatts_send_response(
                            gatts_if,
                            p.conn_id,
                            p.trans_id,
                            esp_gatt_status_t_ESP_GATT_OK,
                            core::ptr::null_mut(),
                        );
                    }
                }
                esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                    let p = &(*param).read;
                    if p.need_rsp {
                        let mut rsp: esp_gatt_rsp_t = core::mem::zeroed();
                        rsp.attr_value.handle = p.handle;
                        let status = if Some(p.handle) == GATT_STATE.send_ccc_handle() {
                            let value = router.ccc_value().to_le_bytes();
                            rsp.attr_value.len = 2;
                            rsp.attr_value.value[..2].copy_from_slice(&value);
                            esp_gatt_status_t_ESP_GATT_OK
                        } else {
                            esp_gatt_status_t_ESP_GATT_READ_NOT_PERMIT
                        };
                        esp_ble_gatts_send_response(gatts_if, p.conn_id, p.trans_id, status, &mut rsp);
                    }
                }
                _ => {}
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
