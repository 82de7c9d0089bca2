use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nvs_provision::flash::{
    Flasher,
    DEFAULT_CHIP,
    DEFAULT_ESPTOOL,
    DEFAULT_OFFSET,
    DEFAULT_PORT,
};
use nvs_provision::{
    DeviceConfig,
    NvsPartition,
    DEFAULT_PARTITION_SIZE,
    FLASH_SECTOR_SIZE,
};
use tracing_subscriber::EnvFilter;

/// Generate an NVS partition image from a JSON device configuration
#[derive(Parser)]
#[command(name = "nvs-provision")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    config: PathBuf,

    /// Output binary file path
    #[arg(short, long, default_value = "nvs_config.bin")]
    output: PathBuf,

    /// Partition size in bytes (must be multiple of 4096)
    #[arg(long, value_parser = parse_number::<usize>, default_value_t = DEFAULT_PARTITION_SIZE)]
    size: usize,

    /// Also write the entries as an nvs_partition_gen CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Flash the partition after generation
    #[arg(long)]
    flash: bool,

    /// Serial port for flashing
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    /// Flash offset of the NVS partition
    #[arg(long, value_parser = parse_number::<u32>, default_value_t = DEFAULT_OFFSET)]
    offset: u32,

    /// Chip passed to esptool
    #[arg(long, default_value = DEFAULT_CHIP)]
    chip: String,

    /// esptool executable
    #[arg(long, default_value = DEFAULT_ESPTOOL)]
    esptool: PathBuf,
}

fn parse_number<T>(s: &str) -> Result<T, String>
where
    T: TryFrom<u64>,
{
    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| e.to_string())?
    } else {
        s.parse::<u64>().map_err(|e| e.to_string())?
    };
    T::try_from(value).map_err(|_| format!("{s} is out of range"))
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), nvs_provision::Error> {
    println!("Reading configuration: {}", cli.config.display());
    let config = DeviceConfig::from_file(&cli.config)?;
    let partition = NvsPartition::from_config(&config)?;
    println!("Found {} entries", partition.entries.len());

    if let Some(csv) = &cli.csv {
        partition.to_csv_file(csv)?;
        println!("Wrote CSV: {}", csv.display());
    }

    println!("Generating partition binary...");
    partition.generate_partition_file(&cli.output, cli.size)?;

    println!("============================================================");
    println!("Config file:    {}", cli.config.display());
    println!("Output file:    {}", cli.output.display());
    println!(
        "Partition size: {} bytes ({} pages)",
        cli.size,
        cli.size / FLASH_SECTOR_SIZE
    );
    println!("============================================================");

    if cli.flash {
        let flasher = Flasher {
            esptool: cli.esptool,
            chip: cli.chip,
            port: cli.port,
            offset: cli.offset,
        };
        println!(
            "Flashing {} to {} at {:#x}...",
            cli.output.display(),
            flasher.port,
            flasher.offset
        );
        flasher.flash(&cli.output)?;
        println!("Successfully flashed NVS partition");
    }

    Ok(())
}
