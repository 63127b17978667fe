mod calculator;
mod cds;
mod config;
mod detect;
mod grid;
mod output;
mod readers;
mod region;

use std::path::PathBuf;

use chrono::Datelike;
use clap::{Args, Parser, Subcommand};

use calculator::AsliCalculator;
use cds::{CdsClient, DataAcquirer};
use config::Config;
use region::Region;

#[derive(Parser, Debug)]
#[command(name = "asli")]
#[command(about = "Calculates the Amundsen Sea Low from mean sea level pressure fields.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ASL detection over downloaded pressure fields
    Calc(CalcArgs),
    /// Download ERA5 monthly averaged fields from the Climate Data Store
    DataEra5(DataEra5Args),
    /// Download the ERA5 land-sea mask from the Climate Data Store
    DataLsm(DataLsmArgs),
}

#[derive(Args, Debug)]
struct CalcArgs {
    /// JSON configuration file; command-line options override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the data directory
    #[arg(short, long)]
    datadir: Option<PathBuf>,

    /// Land-sea mask file path relative to the data directory
    #[arg(short, long)]
    mask: Option<String>,

    /// Output CSV file path, relative to the data directory
    #[arg(short, long)]
    output: Option<String>,

    /// Also write every detected low to this CSV, relative to the data directory
    #[arg(long)]
    all_lows: Option<String>,

    /// Number of worker threads for the parallel calculation (0 = all cores)
    #[arg(short, long)]
    numjobs: Option<usize>,

    /// Calculate on quarterly (seasonal) means instead of the native time axis
    #[arg(long)]
    seasonal: bool,

    /// Path or glob pattern relative to the data directory for the file(s)
    /// containing mean sea level pressure
    msl_pattern: Option<String>,
}

#[derive(Args, Debug)]
struct DownloadArea {
    /// Bounding coordinates for the download: N W S E
    #[arg(short, long, num_args = 4, value_names = ["N", "W", "S", "E"])]
    area: Option<Vec<f64>>,

    /// Additional border around the area, in degrees
    #[arg(short, long)]
    border: Option<f64>,

    /// Download the entire earth, overriding any area
    #[arg(short = 'e', long)]
    whole_earth: bool,
}

#[derive(Args, Debug)]
struct DataEra5Args {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data")]
    datadir: PathBuf,

    /// Comma-separated variables to download: msl, tas, uas, vas
    #[arg(short, long, value_delimiter = ',', default_value = "msl")]
    vars: Vec<String>,

    /// Earliest year to download
    #[arg(short, long, default_value_t = 1979)]
    start: i32,

    /// Latest year to download (defaults to the current year)
    #[arg(short = 'n', long, default_value_t = chrono::Utc::now().year())]
    end: i32,

    #[command(flatten)]
    area: DownloadArea,
}

#[derive(Args, Debug)]
struct DataLsmArgs {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data")]
    datadir: PathBuf,

    /// Filename for the mask once downloaded
    #[arg(short, long, default_value = "era5_lsm.nc")]
    filename: String,

    #[command(flatten)]
    area: DownloadArea,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Calc(args) => run_calc(args),
        Command::DataEra5(args) => run_data_era5(args),
        Command::DataLsm(args) => run_data_lsm(args),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run_calc(args: CalcArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(datadir) = args.datadir {
        config.set_data_dir(datadir);
    }
    if let Some(mask) = args.mask {
        config.set_mask_filename(mask);
    }
    if let Some(pattern) = args.msl_pattern {
        config.set_msl_pattern(pattern);
    }
    if let Some(numjobs) = args.numjobs {
        config.set_n_jobs(numjobs);
    }

    let n_jobs = config.n_jobs();
    let mut calc = AsliCalculator::new(config);

    calc.read_mask_data()?;
    calc.read_msl_data()?;
    let report = calc.calculate(n_jobs, args.seasonal)?;

    println!(
        "Detected ASL rows: {}, candidate lows: {}, failed time steps: {}",
        report.asl_rows.len(),
        report.all_lows.len(),
        report.failed_steps.len()
    );

    if let Some(output) = &args.output {
        calc.write_asl_csv(output)?;
    }
    if let Some(all_lows) = &args.all_lows {
        calc.write_all_lows_csv(all_lows)?;
    }

    Ok(())
}

/// `-e` wins over `-a`; no flags at all means the Amundsen Sea sector.
fn download_region(area: &DownloadArea) -> Result<Option<Region>, Box<dyn std::error::Error>> {
    if area.whole_earth {
        log::info!("'-e' flag specified, downloading whole earth");
        return Ok(None);
    }

    match &area.area {
        Some(bounds) => {
            let region = Region::new(bounds[1], bounds[3], bounds[2], bounds[0])?;
            Ok(Some(region))
        }
        None => Ok(Some(Region::amundsen_sea())),
    }
}

fn run_data_era5(args: DataEra5Args) -> Result<(), Box<dyn std::error::Error>> {
    let region = download_region(&args.area)?;
    let area = cds::request_area(region.as_ref(), args.area.border);

    let request = cds::era5_monthly_request(&args.vars, args.start, args.end, area);

    let client = CdsClient::from_env()?;
    let path = client.retrieve(&request, &args.datadir)?;
    println!("Downloaded {}", path.display());

    Ok(())
}

fn run_data_lsm(args: DataLsmArgs) -> Result<(), Box<dyn std::error::Error>> {
    let region = download_region(&args.area)?;
    let area = cds::request_area(region.as_ref(), args.area.border);

    let request = cds::land_sea_mask_request(&args.filename, area);

    let client = CdsClient::from_env()?;
    let path = client.retrieve(&request, &args.datadir)?;
    println!("Downloaded {}", path.display());

    Ok(())
}
