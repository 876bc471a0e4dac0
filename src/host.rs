use btleplug::api::{
    BDAddr, Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    Service, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::ble::{BleClient, BleHost};
use crate::{Error, Result};

/// Transmit power requested from the controller, in dBm
pub const DEFAULT_TX_POWER_DBM: i8 = 9;

static HOST: OnceCell<BtleHost> = OnceCell::const_new();

/// Settings applied once when the host stack is brought up
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Requested radio transmit power in dBm
    pub tx_power_dbm: i8,
    /// Number of clients that may be alive at once
    pub max_clients: usize,
    /// How long to wait for the peripheral to show up and accept a connection,
    /// both steps together
    pub connect_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
            max_clients: 3,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Bounded count of live clients
#[derive(Debug)]
pub struct ClientSlots {
    live: AtomicUsize,
    max: usize,
}

impl ClientSlots {
    pub fn new(max: usize) -> Self {
        Self {
            live: AtomicUsize::new(0),
            max,
        }
    }

    /// Takes a slot, failing with [`Error::ClientLimitReached`] when all are in use
    pub fn acquire(&self) -> Result<()> {
        let max = self.max;
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                warn!("Client limit of {} reached", max);
                Error::ClientLimitReached(max)
            })
    }

    /// Gives a slot back. Never drops below zero.
    pub fn release(&self) {
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Awaits `work`, then `stop` no matter how `work` ended. The error of
/// `work` wins over the error of `stop`.
async fn run_then_stop<T, E>(
    work: impl Future<Output = Result<T>>,
    stop: impl Future<Output = std::result::Result<(), E>>,
) -> Result<T>
where
    Error: From<E>,
{
    let result = work.await;
    let stopped = stop.await;
    let value = result?;
    stopped?;
    Ok(value)
}

/// Gets the default Bluetooth adapter
#[instrument(skip(manager))]
async fn get_central(manager: &Manager) -> Result<Adapter> {
    debug!("Getting default Bluetooth adapter");
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            error!("No Bluetooth adapters found");
            Error::NoBluetoothAdapters
        })?;
    debug!("Using Bluetooth adapter");
    Ok(adapter)
}

/// btleplug backed host stack
#[derive(Clone)]
pub struct BtleHost {
    // Keeps the platform session alive for the adapter.
    _manager: Manager,
    adapter: Adapter,
    connect_timeout: Duration,
    slots: Arc<ClientSlots>,
}

impl BtleHost {
    /// Brings up the host stack for this process.
    ///
    /// Only the first call does any work; later calls get the same host back
    /// and their `config` is ignored.
    #[instrument]
    pub async fn init(config: HostConfig) -> Result<&'static BtleHost> {
        HOST.get_or_try_init(|| Self::start(config)).await
    }

    async fn start(config: HostConfig) -> Result<BtleHost> {
        info!("Initializing BLE host stack");
        let manager = Manager::new().await?;
        let adapter = get_central(&manager).await?;

        // btleplug does not expose radio power; the request is recorded so the
        // platform stack can be configured to match.
        debug!(
            "Requested transmit power {:+} dBm (left to the platform stack)",
            config.tx_power_dbm
        );

        Ok(BtleHost {
            _manager: manager,
            adapter,
            connect_timeout: config.connect_timeout,
            slots: Arc::new(ClientSlots::new(config.max_clients)),
        })
    }

    /// Number of clients currently allocated
    pub fn client_count(&self) -> usize {
        self.slots.live()
    }
}

impl BleHost for BtleHost {
    type Client = BtleClient;

    async fn create_client(&self) -> Result<BtleClient> {
        self.slots.acquire()?;
        trace!("Allocated BLE client ({} alive)", self.client_count());
        Ok(BtleClient {
            adapter: self.adapter.clone(),
            connect_timeout: self.connect_timeout,
            peripheral: None,
        })
    }

    fn delete_client(&self, mut client: BtleClient) {
        self.slots.release();
        trace!("Released BLE client ({} alive)", self.client_count());

        let Some(peripheral) = client.peripheral.take() else {
            return;
        };
        // Dropped without close(); the disconnect has to run on the runtime.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = peripheral.disconnect().await {
                        warn!("Disconnect of released client failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("No tokio runtime to disconnect released client"),
        }
    }
}

/// A single GATT connection made through btleplug
pub struct BtleClient {
    adapter: Adapter,
    connect_timeout: Duration,
    /// Set from the first connection attempt until disconnect
    peripheral: Option<Peripheral>,
}

impl BtleClient {
    /// Finds the peripheral with `address`, waiting until `deadline` for the
    /// adapter to see it if it is not known yet.
    async fn find_peripheral(&self, address: BDAddr, deadline: Instant) -> Result<Peripheral> {
        if let Some(p) = self.known_peripheral(address).await? {
            return Ok(p);
        }

        debug!("{} not known to the adapter yet, listening for it", address);
        self.adapter.start_scan(ScanFilter::default()).await?;

        let found = run_then_stop(
            self.wait_for_peripheral(address, deadline),
            self.adapter.stop_scan(),
        )
        .await?;

        found.ok_or_else(|| {
            error!(
                "{} not seen within {} seconds",
                address,
                self.connect_timeout.as_secs()
            );
            Error::DeviceNotFound(address)
        })
    }

    async fn wait_for_peripheral(
        &self,
        address: BDAddr,
        deadline: Instant,
    ) -> Result<Option<Peripheral>> {
        loop {
            if let Some(p) = self.known_peripheral(address).await? {
                return Ok(Some(p));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            time::sleep(Duration::from_millis(500)).await;
        }
    }

    async fn known_peripheral(&self, address: BDAddr) -> Result<Option<Peripheral>> {
        let peripherals = self.adapter.peripherals().await?;
        trace!("Adapter knows {} peripherals", peripherals.len());
        Ok(peripherals.into_iter().find(|p| p.address() == address))
    }
}

impl BleClient for BtleClient {
    type Service = Service;
    type Characteristic = Characteristic;

    async fn connect(&mut self, address: BDAddr) -> Result<()> {
        let deadline = Instant::now() + self.connect_timeout;
        let peripheral = self.find_peripheral(address, deadline).await?;

        // Held before connecting so a failed or timed out attempt is still
        // torn down by disconnect().
        self.peripheral = Some(peripheral.clone());

        info!("Connecting to {}...", address);
        if peripheral.is_connected().await? {
            warn!(
                "{} already has a link this client did not open; releasing the client will close it",
                address
            );
        } else {
            time::timeout_at(deadline, peripheral.connect())
                .await
                .map_err(|_| Error::ConnectTimeout(self.connect_timeout))??;
        }

        debug!("Discovering services...");
        peripheral.discover_services().await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(peripheral) = self.peripheral.take() {
            debug!("Disconnecting from {}", peripheral.address());
            peripheral.disconnect().await?;
        }
        Ok(())
    }

    async fn service(&mut self, uuid: Uuid) -> Result<Option<Service>> {
        let peripheral = self
            .peripheral
            .as_ref()
            .ok_or_else(|| Error::BleError("client is not connected".to_string()))?;
        Ok(peripheral.services().into_iter().find(|s| s.uuid == uuid))
    }

    fn characteristic(&self, service: &Service, uuid: Uuid) -> Option<Characteristic> {
        service
            .characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
    }

    async fn write(&self, characteristic: &Characteristic, data: &[u8]) -> Result<()> {
        let peripheral = self
            .peripheral
            .as_ref()
            .ok_or_else(|| Error::BleError("client is not connected".to_string()))?;

        // Prefer WriteWithResponse when supported so failures are reported
        let write_type = if characteristic.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        peripheral.write(characteristic, data, write_type).await?;
        Ok(())
    }
}
