use crate::error::*;
use crate::records::TraceData;
use std::io::prelude::*;
use tracing::info;

/// One row per time sample: the sample time in ms, then one value per
/// trace.
pub fn write_traces_csv<P: AsRef<std::path::Path>>(
    data: &TraceData,
    dt: f64,
    path: &P,
) -> Result<()> {
    info!("Writing: {:?}", path.as_ref());
    let mut output = std::io::BufWriter::new(std::fs::File::create(path)?);

    for (i, row) in data.row_iter().enumerate() {
        write!(output, "{}", i as f64 * dt)?;
        for v in row.iter() {
            write!(output, ", {v}")?;
        }
        writeln!(output)?;
    }
    output.flush()?;
    Ok(())
}
