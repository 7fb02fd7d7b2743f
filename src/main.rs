//! mkcii - generate cloud-init cidata ISO images
//!
//! Writes `user-data`, `meta-data` and `network-config` for a single user
//! (and optionally a statically configured interface) to an ISO 9660 image
//! that cloud-init's NoCloud datasource picks up on first boot.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use time::OffsetDateTime;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mkcii::iso9660::{CIDATA_LABEL, ImageOptions, IsoImageBuilder};
use mkcii::output::Destination;
use mkcii::{SeedError, UserOptions, assemble, build_ethernet, build_user_with, write_seed_image};

#[derive(Parser)]
#[command(name = "mkcii")]
#[command(author, version, about = "Generate cloud-init cidata iso", long_about = None)]
struct Cli {
    /// Output file (default: stdout, unless it is a terminal)
    #[arg(short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Local hostname
    #[arg(short = 'H', value_name = "HOSTNAME")]
    hostname: String,

    /// Account name
    #[arg(short = 'u', value_name = "USERNAME")]
    username: String,

    /// Supplementary group (repeatable)
    #[arg(short = 'g', value_name = "GROUP")]
    group: Vec<String>,

    /// Plaintext or pre-hashed password
    #[arg(short = 'p', value_name = "PASSWD", env = "MKCII_PASSWORD", hide_env_values = true)]
    passwd: String,

    /// Login shell
    #[arg(long, value_name = "PATH", default_value = mkcii::config::DEFAULT_SHELL)]
    shell: String,

    /// Lock the account password
    #[arg(long)]
    lock_passwd: bool,

    /// Ethernet interface to configure statically
    #[arg(short = 'e', value_name = "IFACE")]
    ethernet: Option<String>,

    /// Interface address (repeatable, required with -e)
    #[arg(short = 'i', value_name = "IPV4/NN")]
    cidr: Vec<String>,

    /// Default gateway
    #[arg(short = 'd', value_name = "GATEWAY")]
    gateway: Option<String>,

    /// Nameserver (repeatable)
    #[arg(short = 'n', value_name = "NAMESERVER")]
    nameserver: Vec<String>,

    /// Timestamp for the image, in seconds since the Unix epoch
    #[arg(long, value_name = "SECONDS", env = "SOURCE_DATE_EPOCH", hide = true)]
    source_date_epoch: Option<i64>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Checks clap cannot express
    fn validate(&self) -> Result<(), SeedError> {
        if self.ethernet.is_some() && self.cidr.is_empty() {
            return Err(SeedError::usage("-e requires -i to be set"));
        }
        if self.ethernet.is_none()
            && (!self.cidr.is_empty() || self.gateway.is_some() || !self.nameserver.is_empty())
        {
            warn!("-i, -d and -n are ignored without -e");
        }
        Ok(())
    }

    fn image_options(&self) -> Result<ImageOptions, SeedError> {
        let options = ImageOptions::new(CIDATA_LABEL);
        match self.source_date_epoch {
            Some(seconds) => {
                let timestamp = OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| {
                    SeedError::usage(format!("invalid SOURCE_DATE_EPOCH {seconds}: {e}"))
                })?;
                Ok(options.with_timestamp(timestamp))
            }
            None => Ok(options),
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // stdout may carry the image, so logs always go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn run(cli: Cli) -> Result<(), SeedError> {
    cli.validate()?;
    let destination = Destination::from_path(cli.output.clone())?;
    let options = cli.image_options()?;

    let user = build_user_with(
        &cli.username,
        &cli.passwd,
        &cli.group,
        &UserOptions {
            shell: cli.shell.clone(),
            locked: cli.lock_passwd,
        },
    );

    let ethernet = match &cli.ethernet {
        Some(iface) => {
            let nameservers = (!cli.nameserver.is_empty()).then_some(cli.nameserver.as_slice());
            Some(build_ethernet(
                iface,
                &cli.cidr,
                cli.gateway.as_deref(),
                nameservers,
            )?)
        }
        None => None,
    };

    let documents = assemble(&cli.hostname, user, ethernet)?;
    debug!(
        "Assembled documents for {} ({} interfaces)",
        cli.hostname,
        documents.network_config.ethernets.len()
    );

    let image = write_seed_image::<IsoImageBuilder>(&documents, options)?;
    destination.write(&image)?;

    info!("Wrote cidata image for {}", cli.hostname);
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mkcii: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
