//! Query a Fatek FBs PLC on Port 0 and publish input (X) and output (Y)
//! states as JSON lines.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use fatek_port0::recorder::{
    JsonLinesPublisher, Overrides, PayloadFormat, Poller, RecorderConfig, handle_commands,
};
use fatek_port0::{
    Discrete, DiscreteAction, Link, SharedStream, control_discrete, open_link,
    read_discrete_states,
};

/// Fatek FBs Port 0 flight recorder
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    loglevel: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device or socket://host:port
    #[arg(short, long, value_name = "URL")]
    port: Option<String>,

    /// PLC station number
    #[arg(long)]
    station: Option<String>,

    /// Response timeout per attempt, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Frames written before a transaction gives up
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds between poll cycles
    #[arg(long)]
    period_secs: Option<u64>,

    /// Topic prefix
    #[arg(long)]
    topic: Option<String>,

    /// Payload encoding
    #[arg(long, value_enum)]
    format: Option<PayloadFormat>,

    /// Send single-digit checksums unpadded
    #[arg(long)]
    unpadded_checksum: bool,

    /// Reject responses with a bad checksum
    #[arg(long)]
    verify_checksum: bool,

    /// Reject responses from another station
    #[arg(long)]
    verify_station: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll inputs and outputs forever (default)
    Poll {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Read `<discrete> <action>` commands from stdin while polling;
        /// polling stops when stdin closes
        #[arg(long)]
        accept_commands: bool,
    },
    /// Read consecutive discretes once
    Read {
        /// First discrete, e.g. X0
        start: Discrete,
        /// How many to read
        count: u8,
    },
    /// Set, reset, enable or disable one discrete
    Set {
        /// Discrete, e.g. Y0
        discrete: Discrete,
        /// set, reset, enable or disable
        action: DiscreteAction,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port.clone(),
            station: self.station.clone(),
            timeout_ms: self.timeout_ms,
            retransmit_count: self.retries,
            query_period_secs: self.period_secs,
            topic: self.topic.clone(),
            payload_format: self.format,
            unpadded_checksum: self.unpadded_checksum,
            verify_checksum: self.verify_checksum,
            verify_station: self.verify_station,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.loglevel))
        .init();

    let mut config = match &args.config {
        Some(path) => RecorderConfig::from_file(path)?,
        None => RecorderConfig::default(),
    };
    config.apply(args.overrides());

    let command = args.command.unwrap_or(Command::Poll {
        once: false,
        accept_commands: false,
    });
    if let Command::Config = command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    config.validate().context("invalid configuration")?;
    debug!("configuration dump: {config:?}");
    let config = Arc::new(config);
    let station = config.station()?;

    info!("using serial port {}", config.port);
    let link = open_link(&config.port, &config.serial)
        .with_context(|| format!("cannot open {}", config.port))?;
    let stream = SharedStream::new(link, config.driver_config());

    match command {
        Command::Poll {
            once,
            accept_commands,
        } => poll(stream, config, once, accept_commands)?,
        Command::Read { start, count } => {
            for (discrete, on) in read_discrete_states(&stream, station, start, count)? {
                println!("{discrete} {}", u8::from(on));
            }
        }
        Command::Set { discrete, action } => {
            control_discrete(&stream, station, discrete, action)?;
            println!("{discrete} {action:?}");
        }
        Command::Config => {}
    }

    Ok(())
}

fn poll(
    stream: SharedStream<Box<dyn Link>>,
    config: Arc<RecorderConfig>,
    once: bool,
    accept_commands: bool,
) -> Result<()> {
    let station = config.station()?;
    let shutdown = Arc::new(AtomicBool::new(false));
    if accept_commands {
        let stream = stream.clone();
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("commands".to_owned())
            .spawn(move || {
                let stdin = io::stdin().lock();
                let applied = handle_commands(&stream, station, stdin, &shutdown);
                info!("command input closed after {applied} command(s), stopping");
                shutdown.store(true, Ordering::Relaxed);
            })
            .context("cannot start command thread")?;
    }

    let poller = Poller::new(stream, config)?;
    let mut publisher = JsonLinesPublisher::new(io::stdout().lock());
    if once {
        let report = poller.poll_once(&mut publisher);
        info!("{report:?}");
    } else {
        poller.run(&mut publisher, &shutdown);
    }
    Ok(())
}
