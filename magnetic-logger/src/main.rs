use anyhow::{bail, Context, Result};
use log::{info, warn};
use magnetic_core::{
    constants::SECTOR_COUNT,
    modules::{calibration, dataset},
    utils::logger,
    Acquisition, CalibrationModel, Collector, Config, ReadSource, ReceiveError,
};
use std::{
    env,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const USAGE: &str = "usage: magnetic-logger <device> [name=value,...]\n       magnetic-logger fit <dataset> [name=value,...]";

enum Mode<'a> {
    /// Log readings from a device, optionally collecting a calibration.
    Record(&'a str),
    /// Fit a calibration from a saved dataset.
    Fit(&'a str),
}

fn load_config(overrides: Option<&str>) -> Result<Config> {
    let mut config = match env::var("MAGNETIC_CONFIG") {
        Ok(path) => {
            let json = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?;
            Config::from_json(&json).with_context(|| format!("failed to parse {}", path))?
        }
        Err(_) => Config::default(),
    };

    if let Some(overrides) = overrides {
        config.parse_overrides(overrides)?;
    }
    Ok(config)
}

fn save_model(config: &Config, model: &CalibrationModel, points: &[(f64, f64)]) -> Result<()> {
    let report = File::create(&config.report_path)
        .with_context(|| format!("failed to create {}", config.report_path))?;
    dataset::write_report(BufWriter::new(report), model, points)?;

    fs::write(&config.model_path, serde_json::to_string_pretty(model)?)
        .with_context(|| format!("failed to write {}", config.model_path))?;

    info!("Wrote {} and {}", config.report_path, config.model_path);
    Ok(())
}

fn fit_dataset(config: &Config, path: &str) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path))?;
    let points = dataset::read_points(BufReader::new(file))?;
    let model = calibration::fit(&points)?;

    save_model(config, &model, &points)
}

/// Reads from `device` must not block forever: an idle read has to surface as
/// `TimedOut` or `WouldBlock` (e.g. a tty opened `O_NONBLOCK`). A tty read
/// timeout set with `stty time` returns zero bytes, which counts as closed.
/// A read that blocks forever makes shutdown wait out `stop_timeout_ms`.
fn record(config: &Config, device: &str) -> Result<()> {
    let file = File::open(device).with_context(|| format!("failed to open {}", device))?;
    let acquisition = Acquisition::start(ReadSource::new(BufReader::new(file)))?;
    let receiver = acquisition.receiver();
    let mut collector = Collector::new();
    let mut count = 0;
    let mut stdout = io::stdout().lock();

    loop {
        let reading = match receiver.receive(config.receive_timeout()) {
            Ok(reading) => reading,
            Err(ReceiveError::NoData) => continue,
            Err(ReceiveError::Transport) => {
                warn!("Device closed after {} readings", count);
                break;
            }
        };
        count += 1;

        let reading = if config.level_fields {
            reading.leveled()
        } else {
            reading
        };
        writeln!(stdout, "{}", reading.to_row())?;

        if config.calibrate {
            let progress = collector.progress();
            collector.offer_reading(&reading);

            if collector.progress() != progress {
                info!("Calibration {}/{}", collector.progress(), SECTOR_COUNT);
            }
            if collector.is_complete() {
                break;
            }
        }

        if config.samples != 0 && count >= config.samples {
            break;
        }
    }

    if let Err(err) = acquisition.stop(config.stop_timeout()) {
        warn!("{}", err);
    }

    if !config.calibrate {
        return Ok(());
    }

    if !config.dataset_path.is_empty() {
        let file = File::create(&config.dataset_path)
            .with_context(|| format!("failed to create {}", config.dataset_path))?;
        dataset::write_points(BufWriter::new(file), collector.points())?;
    }

    let model = collector.fit()?;
    save_model(config, &model, collector.points())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let (mode, rest) = match args.as_slice() {
        [mode, path, rest @ ..] if mode == "fit" => (Mode::Fit(path), rest),
        [device, rest @ ..] => (Mode::Record(device), rest),
        [] => bail!(USAGE),
    };
    let config = load_config(rest.first().map(String::as_str))?;

    logger::init(config.level_filter()?)?;
    info!(
        "Starting {} {} ({} build, {})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::PROFILE,
        built_info::RUSTC_VERSION
    );

    match mode {
        Mode::Record(device) => record(&config, device),
        Mode::Fit(path) => fit_dataset(&config, path),
    }
}
