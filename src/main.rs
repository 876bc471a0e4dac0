use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use elk_bledom::*;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, trace};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of the LED strip (e.g. BE:FF:20:00:1A:2B)
    #[arg(short, long, env = "BLEDOM_ADDRESS")]
    address: String,

    /// Service UUID holding the command characteristic [default: fff0]
    #[arg(long)]
    service: Option<String>,

    /// Command characteristic UUID [default: fff3]
    #[arg(long)]
    characteristic: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum, Debug)]
enum EffectType {
    /// Crossfade through red, green, blue, yellow, cyan, magenta, white
    Rainbow,
    /// Jump between red, green, blue
    Jump,
    /// Jump through red, green, blue, yellow, cyan, magenta, white
    JumpAll,
    /// Crossfade red
    CrossfadeRed,
    /// Crossfade green
    CrossfadeGreen,
    /// Crossfade blue
    CrossfadeBlue,
    /// Crossfade through red, green, blue
    CrossfadeRgb,
    /// Blink through red, green, blue, yellow, cyan, magenta, white
    Blink,
    /// Blink red
    BlinkRed,
    /// Blink green
    BlinkGreen,
    /// Blink blue
    BlinkBlue,
}

impl EffectType {
    fn code(&self) -> u8 {
        match self {
            EffectType::Rainbow => EFFECTS.crossfade_red_green_blue_yellow_cyan_magenta_white,
            EffectType::Jump => EFFECTS.jump_red_green_blue,
            EffectType::JumpAll => EFFECTS.jump_red_green_blue_yellow_cyan_magenta_white,
            EffectType::CrossfadeRed => EFFECTS.crossfade_red,
            EffectType::CrossfadeGreen => EFFECTS.crossfade_green,
            EffectType::CrossfadeBlue => EFFECTS.crossfade_blue,
            EffectType::CrossfadeRgb => EFFECTS.crossfade_red_green_blue,
            EffectType::Blink => EFFECTS.blink_red_green_blue_yellow_cyan_magenta_white,
            EffectType::BlinkRed => EFFECTS.blink_red,
            EffectType::BlinkGreen => EFFECTS.blink_green,
            EffectType::BlinkBlue => EFFECTS.blink_blue,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Demonstration of LED features
    Demo {
        /// Duration of each demo step in seconds
        #[arg(short, long, default_value_t = 5)]
        duration: u64,
    },
    /// Turn LED strip on
    On,
    /// Turn LED strip off
    Off,
    /// Set brightness
    Brightness {
        /// Brightness level (0-100)
        level: u8,
    },
    /// Set effect speed
    Speed {
        /// Effect speed (0-100)
        value: u8,
    },
    /// Switch to white temperature mode
    Temperature {
        /// 128 (cold) to 138 (warm)
        value: u8,
    },
    /// Set effect
    Effect {
        /// Effect type (available options shown in description)
        #[arg(short, long, value_enum, default_value_t = EffectType::Rainbow)]
        effect_type: EffectType,
        /// Effect speed (0-100)
        #[arg(short, long)]
        speed: Option<u8>,
    },
    /// Set custom RGB color
    Color {
        /// Red value (0-255)
        red: u8,
        /// Green value (0-255)
        green: u8,
        /// Blue value (0-255)
        blue: u8,
    },
    /// Send a raw hex frame (e.g. 7e00040100000000ef)
    Raw {
        /// Frame as hex text
        hex: String,
    },
}

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    // Initialize tracing with pretty colors
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("elk_bledom=info")),
        )
        .compact()
        .init();

    // Initialize color-eyre for pretty error reporting
    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    let config = match (cli.service.as_deref(), cli.characteristic.as_deref()) {
        (None, None) => DeviceConfig::with_defaults(&cli.address)?,
        (service, characteristic) => DeviceConfig::new(
            &cli.address,
            service.unwrap_or(DEFAULT_SERVICE_UUID),
            characteristic.unwrap_or(DEFAULT_CHARACTERISTIC_UUID),
        )?,
    };
    let host = BtleHost::init(HostConfig::default()).await?;

    let device = match DeviceController::try_new(host.clone(), config).await {
        Ok(dev) => dev,
        Err(e) => {
            error!("Failed to initialize device: {}", e);
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Commands::Demo { duration: 5 }) {
        Commands::Demo { duration } => run_demo(&device, duration).await?,
        Commands::On => device.set_power(true).await?,
        Commands::Off => device.set_power(false).await?,
        Commands::Brightness { level } => device.set_brightness(level).await?,
        Commands::Speed { value } => device.set_effect_speed(value).await?,
        Commands::Temperature { value } => device.set_mode_temperature(value).await?,
        Commands::Effect { effect_type, speed } => {
            let code = effect_type.code();
            debug!("Using effect code: {:#04x}", code);
            device.set_mode_effect(code).await?;
            if let Some(speed) = speed {
                device.set_effect_speed(speed).await?;
            }
        }
        Commands::Color { red, green, blue } => {
            device.set_color_for_rgb_mode(red, green, blue).await?
        }
        Commands::Raw { hex } => {
            info!("Sending {}", CommandFrame::from_hex(&hex));
            device.send_hex(&hex).await?;
        }
    }

    device.close().await?;
    Ok(())
}

/// Sleep for specified number of seconds
#[instrument]
async fn sleep(seconds: u64) {
    trace!("Sleeping for {}s", seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
}

/// Run a demonstration of various LED strip features
#[instrument(skip(device))]
async fn run_demo<H: BleHost>(device: &DeviceController<H>, duration: u64) -> Result<()> {
    info!("Running LED strip demo with {}s intervals", duration);

    info!("Turning LEDs on");
    device.set_power(true).await?;
    sleep(duration).await;

    for (name, (r, g, b)) in [
        ("red", (255, 0, 0)),
        ("green", (0, 255, 0)),
        ("blue", (0, 0, 255)),
    ] {
        info!("Setting color to {}", name);
        device.set_color_for_rgb_mode(r, g, b).await?;
        sleep(duration).await;
    }

    info!("Setting brightness to 50%");
    device.set_brightness(50).await?;
    sleep(duration).await;

    info!("Setting brightness to 100%");
    device.set_brightness(100).await?;
    sleep(duration).await;

    info!("Setting cold white");
    device.set_mode_temperature(TEMPERATURE_COLD).await?;
    sleep(duration).await;

    info!("Setting warm white");
    device.set_mode_temperature(TEMPERATURE_WARM).await?;
    sleep(duration).await;

    info!("Setting rainbow crossfade effect");
    device
        .set_mode_effect(EFFECTS.crossfade_red_green_blue_yellow_cyan_magenta_white)
        .await?;
    sleep(duration).await;

    info!("Setting effect speed to slow (20)");
    device.set_effect_speed(20).await?;
    sleep(duration).await;

    info!("Setting effect speed to fast (80)");
    device.set_effect_speed(80).await?;
    sleep(duration).await;

    info!("Turning LEDs off to end demo");
    device.set_power(false).await?;

    info!("Demo completed!");
    Ok(())
}
