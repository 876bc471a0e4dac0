/*!
 # ELK-BLEDOM Bluetooth LED Strip Driver

 A Rust library for writing command frames to ELK-BLEDOM Bluetooth LED strips.
 The strip is reached at a known address; its command characteristic is
 resolved once and every command is a single nine byte write.

 ## Features

 * Power on/off control
 * RGB color control
 * White temperature mode
 * Brightness adjustment
 * Effect modes (static, jump, crossfade, blink)
 * Effect speed control

 ## Example

 ```no_run
 use elk_bledom::*;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Initialize tracing for logs
     tracing_subscriber::fmt::init();

     // Bring up the BLE host stack once for the whole process
     let host = BtleHost::init(HostConfig::default()).await?;

     // Connect and resolve the command characteristic
     let config = DeviceConfig::new("BE:FF:20:00:1A:2B", "fff0", "fff3")?;
     let device = DeviceController::try_new(host.clone(), config).await?;

     // Basic operations
     device.set_power(true).await?;
     device.set_color_for_rgb_mode(255, 0, 0).await?; // Set to red
     device.set_brightness(80).await?;                // 80% brightness

     device.close().await
 }
 ```
*/

use std::time::Duration;

use btleplug::api::BDAddr;
use thiserror::Error;
use uuid::Uuid;

/// Custom error types for the ELK-BLEDOM driver
#[derive(Error, Debug)]
pub enum Error {
    /// No Bluetooth adapters found
    #[error("No Bluetooth adapters found")]
    NoBluetoothAdapters,

    /// The host stack has no client slot left
    #[error("Could not create BLE client: limit of {0} clients reached")]
    ClientLimitReached(usize),

    /// The peripheral never showed up
    #[error("Device {0} not found")]
    DeviceNotFound(BDAddr),

    /// Connecting took longer than allowed
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Failed to find the configured GATT service
    #[error("Could not find BLE service: {0}")]
    ServiceNotFound(Uuid),

    /// Failed to find the configured GATT characteristic
    #[error("Could not find BLE characteristic: {0}")]
    CharacteristicNotFound(Uuid),

    /// A command was sent through a controller that never connected
    #[error("Controller is not initialized")]
    NotInitialized,

    /// Malformed hardware address
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    /// Malformed UUID
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// BLE communication error
    #[error("BLE communication error: {0}")]
    BleError(String),

    /// Error from btleplug
    #[error(transparent)]
    BtlePlugError(#[from] btleplug::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod ble;
pub mod device;
pub mod effects;
pub mod frame;
pub mod host;

// Re-export key types
pub use ble::{parse_address, parse_uuid, BleClient, BleHost};
pub use device::{
    DeviceConfig, DeviceController, DEFAULT_CHARACTERISTIC_UUID, DEFAULT_SERVICE_UUID,
};
pub use effects::{Effects, EFFECTS, EFFECT_FIRST, EFFECT_LAST, TEMPERATURE_COLD, TEMPERATURE_WARM};
pub use frame::{hex_string_to_bytes, CommandFrame};
pub use host::{BtleHost, HostConfig, DEFAULT_TX_POWER_DBM};
