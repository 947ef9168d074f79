mod catalog;
mod codec;
mod config;
mod error;
mod mqtt;
mod poll;
mod publish;
mod reader;
mod render;
mod reset;
mod transport;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::{Datelike, Local, Timelike};
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use config::Config;
use error::{Error, Result};
use mqtt::MqttPublisher;
use poll::{PollDriver, PollLoop};
use publish::publish_all;
use reader::RegisterReader;
use reset::ResetState;
use transport::{RtuTransport, Transport};

#[derive(Parser, Debug)]
#[command(author, version, about = "SDM72D energy meter monitor")]
struct Args {
    /// Register address to print once (0xNN or decimal); omit to print
    /// the whole catalog
    address: Option<String>,

    /// Poll registers every 5 s and publish them to the broker; without
    /// a configured broker the values go to stdout
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Do not open the serial line; registers read as zero
    #[arg(short = 'n', long = "no-modbus")]
    no_modbus: bool,

    /// Reset the resettable total energy counter before anything else
    #[arg(short = 'r', long)]
    reset: bool,

    /// Serial device, overrides the configuration file
    #[arg(short = 'D', long)]
    dev: Option<String>,

    /// Modbus slave id, overrides the configuration file
    #[arg(short = 'i', long)]
    id: Option<u8>,
}

fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install error hooks: {err}");
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::load()?;
    let device = args.dev.clone().or_else(|| config.device.clone());
    let slave = args.id.unwrap_or(config.slave_id);
    let address = args.address.as_deref().map(parse_address).transpose()?;

    let mut transport = if args.no_modbus {
        None
    } else {
        let device = device.ok_or_else(|| {
            Error::Config("no serial device configured (set device= or pass -D)".into())
        })?;
        info!(
            device = %device,
            slave,
            stopbits = config.stopbits,
            "connecting to modbus slave"
        );
        Some(RtuTransport::connect(&device, config.baudrate, slave)?)
    };

    if args.reset
        && let Some(transport) = transport.as_mut()
    {
        transport.reset_energy_counter()?;
        info!("energy counter reset");
    }

    let catalog = Catalog::active();

    if args.daemon {
        return run_daemon(&config, catalog, transport);
    }

    let mut reader = RegisterReader::new(transport.as_mut().map(|t| t as &mut dyn Transport));
    match address {
        Some(address) => render::print_register(&mut reader, &catalog, address),
        None => render::print_all_registers(&mut reader, &catalog),
    }
}

fn run_daemon(config: &Config, catalog: Catalog, transport: Option<RtuTransport>) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&cancel))?;
    }

    let publisher = config.mqtt.as_ref().map(MqttPublisher::connect).transpose()?;
    if publisher.is_none() {
        info!("no broker configured, publishing to stdout");
    }

    let mut daemon = Daemon {
        catalog,
        transport,
        publisher,
        rules: config.publish.clone(),
        reset: ResetState::new(config.reset_hour, config.reset_minute, Local::now().day()),
    };

    PollLoop::new(cancel).run(&mut daemon)
}

struct Daemon {
    catalog: Catalog,
    transport: Option<RtuTransport>,
    publisher: Option<MqttPublisher>,
    rules: Vec<String>,
    reset: ResetState,
}

impl PollDriver for Daemon {
    fn pump(&mut self) -> Result<()> {
        match self.publisher.as_mut() {
            Some(publisher) => publisher.pump(),
            None => Ok(()),
        }
    }

    fn tick(&mut self) {
        let mut reader =
            RegisterReader::new(self.transport.as_mut().map(|t| t as &mut dyn Transport));
        if let Err(err) = publish_all(
            &self.rules,
            &self.catalog,
            &mut reader,
            self.publisher.as_mut(),
        ) {
            error!("publish pass failed: {err}");
        }

        let now = Local::now();
        if let Err(err) = self.reset.check(
            self.transport.as_mut().map(|t| t as &mut dyn Transport),
            now.day(),
            now.hour(),
            now.minute(),
        ) {
            error!("energy counter reset failed: {err}");
        }
    }
}

fn parse_address(text: &str) -> Result<u16> {
    let parsed = if let Some(hex) = text.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|_| Error::Config(format!("invalid register address {text:?}")))
}
