/*!
 # BLE host-stack seam

 [`DeviceController`](crate::DeviceController) talks to the radio only
 through these traits. [`BtleHost`](crate::BtleHost) implements them on top
 of btleplug.
*/

use btleplug::api::bleuuid::{uuid_from_u16, uuid_from_u32};
use btleplug::api::BDAddr;
use std::future::Future;
use uuid::Uuid;

use crate::{Error, Result};

/// Process-wide BLE host stack that hands out clients
pub trait BleHost: Send + Sync {
    type Client: BleClient;

    /// Allocates a new client. Fails when the stack has no client slot left.
    fn create_client(&self) -> impl Future<Output = Result<Self::Client>> + Send;

    /// Destroys a client, disconnecting it first if it is still connected
    fn delete_client(&self, client: Self::Client);
}

/// A GATT client bound to at most one peripheral
pub trait BleClient: Send {
    type Service: Send + Sync;
    type Characteristic: Send + Sync;

    fn connect(&mut self, address: BDAddr) -> impl Future<Output = Result<()>> + Send;

    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Looks up a primary service on the connected peripheral
    fn service(&mut self, uuid: Uuid)
        -> impl Future<Output = Result<Option<Self::Service>>> + Send;

    fn characteristic(&self, service: &Self::Service, uuid: Uuid)
        -> Option<Self::Characteristic>;

    fn write(
        &self,
        characteristic: &Self::Characteristic,
        data: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Parses a UUID in 16-bit (`"fff0"`), 32-bit or full 128-bit form.
/// Short forms are placed on the Bluetooth base UUID.
pub fn parse_uuid(value: &str) -> Result<Uuid> {
    let value = value.trim();
    let value = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let invalid = || Error::InvalidUuid(value.to_string());

    match value.len() {
        4 => u16::from_str_radix(value, 16)
            .map(uuid_from_u16)
            .map_err(|_| invalid()),
        8 => u32::from_str_radix(value, 16)
            .map(uuid_from_u32)
            .map_err(|_| invalid()),
        _ => Uuid::parse_str(value).map_err(|_| invalid()),
    }
}

/// Parses a colon-separated hardware address such as `"FF:FF:FF:FF:FF:FF"`
pub fn parse_address(value: &str) -> Result<BDAddr> {
    value
        .trim()
        .parse::<BDAddr>()
        .map_err(|_| Error::InvalidAddress(value.to_string()))
}
