use btleplug::api::BDAddr;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::ble::{parse_address, parse_uuid, BleClient, BleHost};
use crate::effects::{is_known_effect, is_known_temperature};
use crate::frame::CommandFrame;
use crate::{Error, Result};

/// Service most ELK-BLEDOM strips expose their command characteristic on
pub const DEFAULT_SERVICE_UUID: &str = "fff0";
/// Command characteristic of ELK-BLEDOM strips
pub const DEFAULT_CHARACTERISTIC_UUID: &str = "fff3";

/// Where to find the strip and its command characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Hardware address of the strip
    pub address: BDAddr,
    /// Service holding the command characteristic
    pub service_uuid: Uuid,
    /// Characteristic command frames are written to
    pub characteristic_uuid: Uuid,
}

impl DeviceConfig {
    /// Builds a config from strings.
    ///
    /// # Arguments
    ///
    /// * `address` - Address of the strip (e.g. "FF:FF:FF:FF:FF:FF")
    /// * `service_uuid` - Service UUID (e.g. "fff0", or a full 128-bit UUID)
    /// * `characteristic_uuid` - Characteristic UUID (e.g. "fff3")
    pub fn new(address: &str, service_uuid: &str, characteristic_uuid: &str) -> Result<Self> {
        Ok(Self {
            address: parse_address(address)?,
            service_uuid: parse_uuid(service_uuid)?,
            characteristic_uuid: parse_uuid(characteristic_uuid)?,
        })
    }

    /// Config for a strip using the usual ELK-BLEDOM service and characteristic
    pub fn with_defaults(address: &str) -> Result<Self> {
        Self::new(address, DEFAULT_SERVICE_UUID, DEFAULT_CHARACTERISTIC_UUID)
    }
}

/// Sends command frames to one ELK-BLEDOM strip.
///
/// Holds the client and the resolved command characteristic. The
/// characteristic is present exactly when construction fully succeeded, see
/// [`DeviceController::is_initialized`].
pub struct DeviceController<H: BleHost> {
    host: H,
    client: Option<H::Client>,
    characteristic: Option<<H::Client as BleClient>::Characteristic>,
    config: DeviceConfig,
}

impl<H: BleHost> DeviceController<H> {
    /// Connects to the strip and resolves its command characteristic.
    ///
    /// Never fails: if any step goes wrong the cause is logged and an
    /// uninitialized controller is returned. Use [`DeviceController::try_new`]
    /// to get the error instead.
    pub async fn new(host: H, config: DeviceConfig) -> Self {
        let mut controller = Self::unconnected(host, config);
        if let Err(e) = controller.initialize().await {
            warn!(
                "Controller for {} left uninitialized: {}",
                controller.config.address, e
            );
        }
        controller
    }

    /// Connects to the strip and resolves its command characteristic,
    /// reporting which step failed.
    pub async fn try_new(host: H, config: DeviceConfig) -> Result<Self> {
        let mut controller = Self::unconnected(host, config);
        controller.initialize().await?;
        Ok(controller)
    }

    fn unconnected(host: H, config: DeviceConfig) -> Self {
        Self {
            host,
            client: None,
            characteristic: None,
            config,
        }
    }

    #[instrument(skip(self), fields(address = %self.config.address))]
    async fn initialize(&mut self) -> Result<()> {
        let mut client = self.host.create_client().await?;

        match Self::resolve(&mut client, &self.config).await {
            Ok(characteristic) => {
                self.client = Some(client);
                self.characteristic = Some(characteristic);
                info!("Controller ready");
                Ok(())
            }
            Err(e) => {
                // Every failure after allocation releases the client here.
                if let Err(disconnect_err) = client.disconnect().await {
                    debug!("Disconnect after failed setup: {}", disconnect_err);
                }
                self.host.delete_client(client);
                Err(e)
            }
        }
    }

    async fn resolve(
        client: &mut H::Client,
        config: &DeviceConfig,
    ) -> Result<<H::Client as BleClient>::Characteristic> {
        client.connect(config.address).await?;

        let service = client
            .service(config.service_uuid)
            .await?
            .ok_or(Error::ServiceNotFound(config.service_uuid))?;
        debug!("Found service: {}", config.service_uuid);

        let characteristic = client
            .characteristic(&service, config.characteristic_uuid)
            .ok_or(Error::CharacteristicNotFound(config.characteristic_uuid))?;
        debug!("Found characteristic: {}", config.characteristic_uuid);

        Ok(characteristic)
    }

    /// Whether construction connected and resolved the characteristic
    pub fn is_initialized(&self) -> bool {
        self.characteristic.is_some()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Writes a frame to the command characteristic
    #[instrument(skip(self, frame), fields(frame = %frame))]
    pub async fn send_command(&self, frame: &CommandFrame) -> Result<()> {
        let (Some(client), Some(characteristic)) = (&self.client, &self.characteristic) else {
            warn!("Command dropped, controller is not initialized");
            return Err(Error::NotInitialized);
        };

        trace!("Writing {} bytes", frame.len());
        client.write(characteristic, frame.as_bytes()).await
    }

    /// Encodes hex text with [`crate::hex_string_to_bytes`] and writes it
    #[instrument(skip(self))]
    pub async fn send_hex(&self, command: &str) -> Result<()> {
        self.send_command(&CommandFrame::from_hex(command)).await
    }

    /// Sets the brightness level
    ///
    /// # Arguments
    ///
    /// * `brightness` - 0-100 (0x00-0x64)
    #[instrument(skip(self))]
    pub async fn set_brightness(&self, brightness: u8) -> Result<()> {
        if brightness > 100 {
            warn!("Brightness {} out of range (0-100), sending as is", brightness);
        }
        self.send_command(&CommandFrame::brightness(brightness)).await?;
        info!("Brightness set to {}%", brightness);
        Ok(())
    }

    /// Sets the effect speed
    ///
    /// # Arguments
    ///
    /// * `speed` - 0-100 (0x00-0x64)
    #[instrument(skip(self))]
    pub async fn set_effect_speed(&self, speed: u8) -> Result<()> {
        if speed > 100 {
            warn!("Effect speed {} out of range (0-100), sending as is", speed);
        }
        self.send_command(&CommandFrame::effect_speed(speed)).await?;
        info!("Effect speed set to {}", speed);
        Ok(())
    }

    /// Switches to white temperature mode
    ///
    /// # Arguments
    ///
    /// * `temperature` - 0x80-0x8a, cold to warm (see [`crate::TEMPERATURE_COLD`])
    #[instrument(skip(self))]
    pub async fn set_mode_temperature(&self, temperature: u8) -> Result<()> {
        if !is_known_temperature(temperature) {
            warn!(
                "Temperature {:#04x} out of range (0x80-0x8a), sending as is",
                temperature
            );
        }
        self.send_command(&CommandFrame::mode_temperature(temperature))
            .await?;
        info!("Temperature mode set to {:#04x}", temperature);
        Ok(())
    }

    /// Switches to an effect mode
    ///
    /// # Arguments
    ///
    /// * `effect` - Effect code, 0x80-0x9c (use the EFFECTS constant)
    #[instrument(skip(self))]
    pub async fn set_mode_effect(&self, effect: u8) -> Result<()> {
        if !is_known_effect(effect) {
            warn!("Effect {:#04x} out of range (0x80-0x9c), sending as is", effect);
        }
        self.send_command(&CommandFrame::mode_effect(effect)).await?;
        info!("Effect mode set to {:#04x}", effect);
        Ok(())
    }

    /// Turns the strip on (`true`) or off (`false`)
    #[instrument(skip(self))]
    pub async fn set_power(&self, is_on: bool) -> Result<()> {
        self.send_command(&CommandFrame::power(is_on)).await?;
        info!("LED strip powered {}", if is_on { "on" } else { "off" });
        Ok(())
    }

    /// Sets the color in RGB mode
    #[instrument(skip(self))]
    pub async fn set_color_for_rgb_mode(&self, red: u8, green: u8, blue: u8) -> Result<()> {
        self.send_command(&CommandFrame::rgb_color(red, green, blue))
            .await?;
        info!("Color set to RGB({}, {}, {})", red, green, blue);
        Ok(())
    }

    /// Disconnects and releases the client.
    ///
    /// Dropping the controller releases it too, but cannot wait for the
    /// disconnect to finish.
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        self.characteristic = None;
        let Some(mut client) = self.client.take() else {
            return Ok(());
        };

        let result = client.disconnect().await;
        self.host.delete_client(client);
        debug!("Controller for {} closed", self.config.address);
        result
    }
}

impl<H: BleHost> Drop for DeviceController<H> {
    fn drop(&mut self) {
        self.characteristic = None;
        if let Some(client) = self.client.take() {
            self.host.delete_client(client);
        }
    }
}
