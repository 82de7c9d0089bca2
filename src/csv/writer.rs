use std::path::Path;

use csv::Writer;

use crate::error::Error;
use crate::NvsPartition;

/// Serialize a partition to an `nvs_partition_gen` CSV file at `output_path`.
pub(crate) fn write_csv<P: AsRef<Path>>(
    partition: &NvsPartition,
    output_path: P,
) -> Result<(), Error> {
    let mut wtr = Writer::from_path(output_path)?;
    write_records(&mut wtr, partition)
}

/// Serialize a partition to CSV and return the content as a `String`.
pub(crate) fn write_csv_content(partition: &NvsPartition) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(Vec::new());
    write_records(&mut wtr, partition)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidConfiguration(format!("CSV output is not valid UTF-8: {e}")))
}

fn write_records<W: std::io::Write>(
    wtr: &mut Writer<W>,
    partition: &NvsPartition,
) -> Result<(), Error> {
    wtr.write_record(["key", "type", "encoding", "value"])?;
    wtr.write_record([partition.namespace.name(), "namespace", "", ""])?;

    for entry in &partition.entries {
        let value = entry.value.to_string();
        wtr.write_record([
            entry.key.as_str(),
            "data",
            entry.value.encoding_str(),
            value.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
