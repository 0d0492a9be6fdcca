use std::path::PathBuf;

use clap::{Parser, Subcommand};
use egui::Vec2;

use pitwall::PitwallError;
use pitwall::session::SessionPreset;
use pitwall::ui::{LoadSource, ReplayApp};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a session from the OpenF1 API and replay it
    Replay {
        /// Session key of the session to replay (defaults to the Singapore
        /// 2023 race)
        #[arg(short, long)]
        session: Option<i32>,

        /// Session key to pull car and location telemetry from, when it is
        /// published separately from the timing data
        #[arg(short, long)]
        telemetry_session: Option<i32>,

        /// Driver number to follow
        #[arg(short, long)]
        driver: Option<i32>,

        /// Initial playback rate
        #[arg(short, long)]
        rate: Option<f64>,

        /// Archive the fetched session to a JSONL file for offline replay
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay a previously archived session
    Load {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn replay(
    preset: SessionPreset,
    rate: Option<f64>,
    output: Option<PathBuf>,
) -> Result<(), PitwallError> {
    let driver_number = preset.driver_number;
    run_app(
        LoadSource::Api { preset, output },
        driver_number,
        rate,
    );
    Ok(())
}

fn load(input: &PathBuf) -> Result<(), PitwallError> {
    if !input.exists() {
        return Err(PitwallError::InvalidArchiveFile {
            path: input.display().to_string(),
        });
    }
    run_app(
        LoadSource::Archive {
            path: input.clone(),
        },
        0,
        None,
    );
    Ok(())
}

fn run_app(source: LoadSource, driver_number: i32, rate: Option<f64>) {
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(1100., 640.));

    eframe::run_native(
        "Pitwall",
        native_options,
        Box::new(move |cc| Ok(Box::new(ReplayApp::new(source, driver_number, rate, cc)))),
    )
    .expect("could not start app");
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    match &cli.command {
        Commands::Replay {
            session,
            telemetry_session,
            driver,
            rate,
            output,
        } => {
            let preset = match session {
                Some(session_key) => {
                    SessionPreset::for_session(*session_key, *telemetry_session, driver.unwrap_or(1))
                }
                None => {
                    let mut preset = SessionPreset::singapore_race();
                    if let Some(telemetry_session_key) = telemetry_session {
                        preset.telemetry_session_key = *telemetry_session_key;
                    }
                    if let Some(driver_number) = driver {
                        preset.driver_number = *driver_number;
                    }
                    preset
                }
            };
            replay(preset, *rate, output.clone()).expect("Error while replaying session");
        }
        Commands::Load { input } => {
            load(input).expect("Error while replaying archived session");
        }
    };
}
