//! Population ingest.
//!
//! The population is a CSV file with one event per row and a header naming the
//! parameter columns (`mass_1`, `mass_2`, `luminosity_distance`, `ra`, `dec`,
//! `psi`, `theta_jn`, `geocent_time`, `phase`, and optionally `redshift`).
//! Extra columns are ignored. Rows are kept in file order; row `k` is event `k`.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::info;

use crate::domain::{Event, Parameter, Population};
use crate::error::CbcError;

/// Load every row of `path` as an event.
///
/// Any unreadable row is fatal: silently dropping rows would shift event
/// indices.
pub fn load_population(path: &Path) -> Result<Population, CbcError> {
    let file = File::open(path)
        .map_err(|e| CbcError::Population(format!("Failed to open '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| CbcError::Population(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = resolve_columns(&headers)?;

    let mut events = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based line numbers, plus the header line.
        let line = idx + 2;
        let record =
            result.map_err(|e| CbcError::Population(format!("line {line}: CSV parse error: {e}")))?;
        let event = parse_event(&record, &columns)
            .map_err(|e| CbcError::Population(format!("line {line}: {e}")))?;
        events.push(event);
    }

    if events.is_empty() {
        return Err(CbcError::Population(format!(
            "'{}' contains no events.",
            path.display()
        )));
    }

    info!(path = %path.display(), events = events.len(), "population loaded");
    Ok(Population::new(events))
}

fn resolve_columns(headers: &StringRecord) -> Result<HashMap<Parameter, usize>, CbcError> {
    let by_name: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect();

    let mut columns = HashMap::new();
    let mut missing = Vec::new();
    for param in Parameter::ALL {
        match by_name.get(param.name()) {
            Some(&i) => {
                columns.insert(param, i);
            }
            None if param.is_optional() => {}
            None => missing.push(param.name()),
        }
    }

    if !missing.is_empty() {
        return Err(CbcError::Population(format!(
            "Missing required column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(columns)
}

fn parse_event(record: &StringRecord, columns: &HashMap<Parameter, usize>) -> Result<Event, String> {
    let value = |param: Parameter| -> Result<f64, String> {
        let Some(&idx) = columns.get(&param) else {
            return Ok(0.0);
        };
        let raw = record
            .get(idx)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing value for `{param}`"))?;
        raw.parse::<f64>()
            .map_err(|_| format!("invalid number '{raw}' for `{param}`"))
    };

    Ok(Event {
        mass_1: value(Parameter::Mass1)?,
        mass_2: value(Parameter::Mass2)?,
        redshift: value(Parameter::Redshift)?,
        luminosity_distance: value(Parameter::LuminosityDistance)?,
        ra: value(Parameter::Ra)?,
        dec: value(Parameter::Dec)?,
        psi: value(Parameter::Psi)?,
        theta_jn: value(Parameter::ThetaJn)?,
        geocent_time: value(Parameter::GeocentTime)?,
        phase: value(Parameter::Phase)?,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const HEADER: &str = "mass_1,mass_2,luminosity_distance,ra,dec,psi,theta_jn,geocent_time,phase";

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn loads_rows_in_order_with_default_redshift() {
        let file = write_csv(&format!(
            "{HEADER},snr_label\n36,29,410,1.95,-1.27,0.82,2.6,1126259462.4,1.3,x\n10, 8, 900, 0.1, 0.2, 0.3, 0.4, 1300000000, 0.5,y\n"
        ));
        let pop = load_population(file.path()).unwrap();
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.events[0].mass_1, 36.0);
        assert_eq!(pop.events[0].redshift, 0.0);
        assert_eq!(pop.events[1].luminosity_distance, 900.0);
    }

    #[test]
    fn redshift_column_is_read_when_present() {
        let file = write_csv(&format!("{HEADER},redshift\n36,29,410,1.95,-1.27,0.82,2.6,1126259462.4,1.3,0.09\n"));
        let pop = load_population(file.path()).unwrap();
        assert_eq!(pop.events[0].redshift, 0.09);
    }

    #[test]
    fn missing_columns_are_listed() {
        let file = write_csv("mass_1,mass_2\n1,2\n");
        let err = load_population(file.path()).unwrap_err().to_string();
        assert!(err.contains("luminosity_distance"));
        assert!(err.contains("geocent_time"));
    }

    #[test]
    fn bad_rows_report_their_line() {
        let file = write_csv(&format!("{HEADER}\n36,29,410,1.95,-1.27,0.82,2.6,1126259462.4,1.3\n36,abc,410,1.95,-1.27,0.82,2.6,1126259462.4,1.3\n"));
        let err = load_population(file.path()).unwrap_err().to_string();
        assert!(err.contains("line 3"), "{err}");
        assert!(err.contains("mass_2"), "{err}");
    }

    #[test]
    fn empty_population_is_an_error() {
        let file = write_csv(&format!("{HEADER}\n"));
        assert!(load_population(file.path()).is_err());
    }
}
