use crate::core::models::zone::ZoneState;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV output error for '{target}': {source}")]
    Csv { target: String, source: csv::Error },
    #[error("File I/O error for '{target}': {source}")]
    Io {
        target: String,
        source: std::io::Error,
    },
}

/// One row of the run history, written once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesRow {
    pub cycle: usize,
    pub time_microsec: f64,
    pub dt_microsec: f64,
    pub substeps: usize,
    /// Initial internal plus kinetic energy and the fission energy released so far.
    #[serde(rename = "QP_1e12_erg")]
    pub total_energy: f64,
    pub power_relative: f64,
    pub alpha_1_microsec: f64,
    pub k_eff: f64,
    #[serde(rename = "W_dimensionless")]
    pub w: f64,
    #[serde(rename = "W_cfl")]
    pub w_cfl: f64,
    #[serde(rename = "W_visc")]
    pub w_visc: f64,
    #[serde(rename = "TOTKE_1e12_erg")]
    pub kinetic_energy: f64,
    #[serde(rename = "TOTIE_1e12_erg")]
    pub internal_energy: f64,
    #[serde(rename = "CHECK")]
    pub energy_check: f64,
    pub outer_radius_cm: f64,
    pub transport_iterations: usize,
    pub transport_converged: bool,
}

/// One zone of a spatial snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    pub cycle: usize,
    pub time_microsec: f64,
    pub zone_index: usize,
    pub radius_cm: f64,
    pub density_g_cm3: f64,
    pub velocity_cm_microsec: f64,
    pub pressure_megabars: f64,
    pub viscous_pressure_megabars: f64,
    #[serde(rename = "temperature_keV")]
    pub temperature_kev: f64,
    pub internal_energy: f64,
    pub fission_density: f64,
}

impl ProfileRow {
    /// Builds one row per zone. Radius and velocity are taken at the zone's outer boundary.
    pub fn snapshot(
        cycle: usize,
        time: f64,
        zones: &ZoneState,
        fission_density: &[f64],
    ) -> Vec<ProfileRow> {
        (0..zones.num_zones())
            .map(|i| ProfileRow {
                cycle,
                time_microsec: time,
                zone_index: i + 1,
                radius_cm: zones.radius[i + 1],
                density_g_cm3: zones.density[i],
                velocity_cm_microsec: zones.velocity[i + 1],
                pressure_megabars: zones.pressure[i],
                viscous_pressure_megabars: zones.viscous_pressure[i],
                temperature_kev: zones.temperature[i],
                internal_energy: zones.internal_energy[i],
                fission_density: fission_density.get(i).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

/// Serialises rows of type `R` to CSV with a header derived from the row's fields.
pub struct CsvSink<W: Write> {
    target: String,
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self, OutputError> {
        let target = path.to_string_lossy().to_string();
        let writer = csv::Writer::from_path(path).map_err(|e| OutputError::Csv {
            target: target.clone(),
            source: e,
        })?;
        Ok(Self { target, writer })
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(target: &str, inner: W) -> Self {
        Self {
            target: target.to_string(),
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn write<R: Serialize>(&mut self, row: &R) -> Result<(), OutputError> {
        self.writer.serialize(row).map_err(|e| OutputError::Csv {
            target: self.target.clone(),
            source: e,
        })
    }

    pub fn write_all<R: Serialize>(&mut self, rows: &[R]) -> Result<(), OutputError> {
        for row in rows {
            self.write(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush().map_err(|e| OutputError::Io {
            target: self.target.clone(),
            source: e,
        })
    }

    pub fn into_inner(self) -> Result<W, OutputError> {
        let target = self.target;
        self.writer.into_inner().map_err(|e| OutputError::Io {
            target,
            source: e.into_error(),
        })
    }
}
