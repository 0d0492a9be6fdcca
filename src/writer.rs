use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::info;

use crate::{
    PitwallError,
    session::{ArchiveRecord, RawSession},
};

/// Write a fetched session to a JSONL archive, one record per line, preset
/// header first. The archive replays offline through the `load` command.
pub fn write_archive(file: &Path, raw: &RawSession) -> Result<(), PitwallError> {
    let archive_file =
        File::create(file).map_err(|e| PitwallError::ArchiveWriteError { source: e })?;
    let mut writer = BufWriter::new(archive_file);

    write_record(&mut writer, &ArchiveRecord::Preset(raw.preset.clone()))?;
    if let Some(session) = &raw.session {
        write_record(&mut writer, &ArchiveRecord::Session(session.clone()))?;
    }
    for driver in &raw.drivers {
        write_record(&mut writer, &ArchiveRecord::Driver(driver.clone()))?;
    }
    for sample in &raw.cars {
        write_record(&mut writer, &ArchiveRecord::Car(sample.clone()))?;
    }
    for sample in &raw.locations {
        write_record(&mut writer, &ArchiveRecord::Location(sample.clone()))?;
    }
    for sample in &raw.positions {
        write_record(&mut writer, &ArchiveRecord::Position(sample.clone()))?;
    }
    for sample in &raw.laps {
        write_record(&mut writer, &ArchiveRecord::Lap(sample.clone()))?;
    }
    for sample in &raw.stints {
        write_record(&mut writer, &ArchiveRecord::Stint(sample.clone()))?;
    }
    for sample in &raw.pits {
        write_record(&mut writer, &ArchiveRecord::Pit(sample.clone()))?;
    }
    for sample in &raw.weather {
        write_record(&mut writer, &ArchiveRecord::Weather(sample.clone()))?;
    }
    for message in &raw.race_control {
        write_record(&mut writer, &ArchiveRecord::RaceControl(message.clone()))?;
    }
    for sample in &raw.team_radio {
        write_record(&mut writer, &ArchiveRecord::TeamRadio(sample.clone()))?;
    }
    for sample in &raw.intervals {
        write_record(&mut writer, &ArchiveRecord::Interval(sample.clone()))?;
    }

    writer
        .flush()
        .map_err(|e| PitwallError::ArchiveWriteError { source: e })?;
    info!("archived session to {}", file.display());
    Ok(())
}

fn write_record(writer: &mut impl Write, record: &ArchiveRecord) -> Result<(), PitwallError> {
    let line = serde_json::to_string(record)
        .map_err(|e| PitwallError::ArchiveSerializeError { source: e })?;
    writeln!(writer, "{line}").map_err(|e| PitwallError::ArchiveWriteError { source: e })
}
