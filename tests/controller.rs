use btleplug::api::BDAddr;
use elk_bledom::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::span;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

const ADDRESS: &str = "BE:FF:20:00:1A:2B";

/// Step at which the fake stack fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fail {
    Nothing,
    Allocate,
    Connect,
    /// The link comes up only after the connect attempt gave up
    LateConnect,
    Service,
    Characteristic,
    Write,
}

#[derive(Debug, Default)]
struct Record {
    created: usize,
    deleted: usize,
    connected: bool,
    disconnects: usize,
    writes: Vec<Vec<u8>>,
}

#[derive(Clone)]
struct FakeHost {
    fail: Fail,
    record: Arc<Mutex<Record>>,
}

impl FakeHost {
    fn new(fail: Fail) -> Self {
        Self {
            fail,
            record: Arc::default(),
        }
    }

    fn created(&self) -> usize {
        self.record.lock().unwrap().created
    }

    fn deleted(&self) -> usize {
        self.record.lock().unwrap().deleted
    }

    fn disconnects(&self) -> usize {
        self.record.lock().unwrap().disconnects
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.record.lock().unwrap().writes.clone()
    }
}

struct FakeClient {
    fail: Fail,
    record: Arc<Mutex<Record>>,
}

impl BleHost for FakeHost {
    type Client = FakeClient;

    async fn create_client(&self) -> Result<FakeClient> {
        if self.fail == Fail::Allocate {
            return Err(Error::ClientLimitReached(0));
        }
        self.record.lock().unwrap().created += 1;
        Ok(FakeClient {
            fail: self.fail,
            record: self.record.clone(),
        })
    }

    fn delete_client(&self, _client: FakeClient) {
        self.record.lock().unwrap().deleted += 1;
    }
}

impl BleClient for FakeClient {
    type Service = Uuid;
    type Characteristic = Uuid;

    async fn connect(&mut self, address: BDAddr) -> Result<()> {
        if self.fail == Fail::Connect {
            return Err(Error::DeviceNotFound(address));
        }
        self.record.lock().unwrap().connected = true;
        if self.fail == Fail::LateConnect {
            return Err(Error::ConnectTimeout(Duration::from_secs(30)));
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        if record.connected {
            record.connected = false;
            record.disconnects += 1;
        }
        Ok(())
    }

    async fn service(&mut self, uuid: Uuid) -> Result<Option<Uuid>> {
        Ok((self.fail != Fail::Service).then_some(uuid))
    }

    fn characteristic(&self, _service: &Uuid, uuid: Uuid) -> Option<Uuid> {
        (self.fail != Fail::Characteristic).then_some(uuid)
    }

    async fn write(&self, _characteristic: &Uuid, data: &[u8]) -> Result<()> {
        if self.fail == Fail::Write {
            return Err(Error::BleError("write rejected".to_string()));
        }
        self.record.lock().unwrap().writes.push(data.to_vec());
        Ok(())
    }
}

fn config() -> DeviceConfig {
    DeviceConfig::with_defaults(ADDRESS).unwrap()
}

/// Collects the names of every span opened while installed
#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

impl<S> Layer<S> for SpanNames
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, _id: &span::Id, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(attrs.metadata().name());
    }
}

async fn connected(host: &FakeHost) -> DeviceController<FakeHost> {
    let device = DeviceController::new(host.clone(), config()).await;
    assert!(device.is_initialized());
    device
}

#[tokio::test]
async fn resolves_characteristic_and_holds_client() {
    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    assert_eq!(host.created(), 1);
    assert_eq!(host.deleted(), 0);
    assert_eq!(device.config().address, parse_address(ADDRESS).unwrap());
}

#[tokio::test]
async fn failed_resolution_releases_client_once() {
    for fail in [Fail::Connect, Fail::Service, Fail::Characteristic] {
        let host = FakeHost::new(fail);
        let device = DeviceController::new(host.clone(), config()).await;

        assert!(!device.is_initialized(), "{fail:?}");
        assert_eq!(host.created(), 1, "{fail:?}");
        assert_eq!(host.deleted(), 1, "{fail:?}");

        // Dropping the inert controller must not release anything again.
        drop(device);
        assert_eq!(host.deleted(), 1, "{fail:?}");
    }
}

#[tokio::test]
async fn timed_out_connect_is_torn_down() {
    let host = FakeHost::new(Fail::LateConnect);
    let err = DeviceController::try_new(host.clone(), config())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::ConnectTimeout(_)));
    assert_eq!(host.disconnects(), 1);
    assert_eq!(host.deleted(), 1);
}

#[tokio::test]
async fn lookup_failures_disconnect() {
    for fail in [Fail::Service, Fail::Characteristic] {
        let host = FakeHost::new(fail);
        let _device = DeviceController::new(host.clone(), config()).await;
        assert_eq!(host.disconnects(), 1, "{fail:?}");
    }
}

#[tokio::test]
async fn try_new_reports_failed_step() {
    let err = DeviceController::try_new(FakeHost::new(Fail::Allocate), config())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::ClientLimitReached(_)));

    let err = DeviceController::try_new(FakeHost::new(Fail::Connect), config())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::DeviceNotFound(_)));

    let err = DeviceController::try_new(FakeHost::new(Fail::Service), config())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::ServiceNotFound(uuid) if uuid == config().service_uuid));

    let err = DeviceController::try_new(FakeHost::new(Fail::Characteristic), config())
        .await
        .err()
        .unwrap();
    assert!(
        matches!(err, Error::CharacteristicNotFound(uuid) if uuid == config().characteristic_uuid)
    );
}

#[tokio::test]
async fn allocation_failure_holds_nothing() {
    let host = FakeHost::new(Fail::Allocate);
    let device = DeviceController::new(host.clone(), config()).await;

    assert!(!device.is_initialized());
    assert_eq!(host.created(), 0);
    drop(device);
    assert_eq!(host.deleted(), 0);
}

#[tokio::test]
async fn uninitialized_controller_refuses_commands() {
    let host = FakeHost::new(Fail::Service);
    let device = DeviceController::new(host.clone(), config()).await;

    assert!(matches!(
        device.set_power(true).await,
        Err(Error::NotInitialized)
    ));
    assert!(host.writes().is_empty());
}

#[tokio::test]
async fn setters_write_expected_frames() {
    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    device.set_power(true).await.unwrap();
    device.set_power(false).await.unwrap();
    device.set_brightness(100).await.unwrap();
    device.set_color_for_rgb_mode(255, 0, 128).await.unwrap();
    device.set_effect_speed(10).await.unwrap();
    device.set_mode_temperature(TEMPERATURE_WARM).await.unwrap();
    device.set_mode_effect(EFFECTS.blink_red).await.unwrap();

    assert_eq!(
        host.writes(),
        vec![
            vec![0x7e, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0xef],
            vec![0x7e, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xef],
            vec![0x7e, 0x00, 0x01, 0x64, 0x00, 0x00, 0x00, 0x00, 0xef],
            vec![0x7e, 0x00, 0x05, 0x03, 0xff, 0x00, 0x80, 0x00, 0xef],
            vec![0x7e, 0x00, 0x02, 0x0a, 0x00, 0x00, 0x00, 0x00, 0xef],
            vec![0x7e, 0x00, 0x03, 0x8a, 0x02, 0x00, 0x00, 0x00, 0xef],
            vec![0x7e, 0x00, 0x03, 0x96, 0x03, 0x00, 0x00, 0x00, 0xef],
        ]
    );
}

#[tokio::test]
async fn out_of_range_values_are_sent_unchanged() {
    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    device.set_brightness(200).await.unwrap();
    device.set_mode_effect(0x10).await.unwrap();

    let writes = host.writes();
    assert_eq!(writes[0][3], 200);
    assert_eq!(writes[1][3], 0x10);
}

#[tokio::test]
async fn raw_hex_is_written_as_parsed() {
    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    device.send_hex("7e0004").await.unwrap();
    device.send_hex("7e0").await.unwrap();

    assert_eq!(host.writes(), vec![vec![0x7e, 0x00, 0x04], vec![0x7e, 0x00]]);
}

#[tokio::test]
async fn write_failures_surface() {
    let host = FakeHost::new(Fail::Write);
    let device = connected(&host).await;

    assert!(matches!(
        device.set_brightness(50).await,
        Err(Error::BleError(_))
    ));
}

#[tokio::test]
async fn close_disconnects_and_releases() {
    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    device.close().await.unwrap();
    assert_eq!(host.disconnects(), 1);
    assert_eq!(host.deleted(), 1);
}

#[tokio::test]
async fn drop_releases_connected_client() {
    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    drop(device);
    assert_eq!(host.created(), 1);
    assert_eq!(host.deleted(), 1);
}

#[test]
fn default_config_targets_fff0_fff3() {
    assert_eq!(
        DeviceConfig::with_defaults(ADDRESS).unwrap(),
        DeviceConfig::new(
            ADDRESS,
            "0000fff0-0000-1000-8000-00805f9b34fb",
            "0000fff3-0000-1000-8000-00805f9b34fb"
        )
        .unwrap()
    );
}

#[tokio::test]
async fn every_command_opens_its_own_span() {
    let names = SpanNames::default();
    let _guard = tracing_subscriber::registry()
        .with(names.clone())
        .set_default();

    let host = FakeHost::new(Fail::Nothing);
    let device = connected(&host).await;

    device.set_power(true).await.unwrap();
    device.set_brightness(10).await.unwrap();
    device.set_effect_speed(10).await.unwrap();
    device.set_mode_temperature(TEMPERATURE_COLD).await.unwrap();
    device.set_mode_effect(EFFECTS.red).await.unwrap();
    device.set_color_for_rgb_mode(1, 2, 3).await.unwrap();
    device.send_hex("7e00").await.unwrap();
    device.close().await.unwrap();

    let opened = names.0.lock().unwrap().clone();
    for name in [
        "set_power",
        "set_brightness",
        "set_effect_speed",
        "set_mode_temperature",
        "set_mode_effect",
        "set_color_for_rgb_mode",
        "send_hex",
        "send_command",
        "close",
    ] {
        assert!(opened.contains(&name), "no span for {name}: {opened:?}");
    }
}
