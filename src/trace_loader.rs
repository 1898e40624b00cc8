use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use csv::ReaderBuilder;

use crate::types::AccelSample;

/// Carga una traza de acelerómetro grabada en formato CSV `tick,x,y,z`
///
/// Los ticks deben empezar en 0 y ser consecutivos: una traza con huecos no
/// representa el flujo real del sensor.
pub fn load_trace_from_csv(path: impl AsRef<Path>) -> Result<Vec<AccelSample>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let mut samples = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;
        if record.len() < 4 {
            bail!("La fila {} no tiene 4 columnas", row_idx + 1);
        }

        let tick: usize = record[0]
            .parse()
            .with_context(|| format!("tick inválido en fila {}", row_idx + 1))?;
        ensure!(
            tick == samples.len(),
            "Tick {} fuera de secuencia (se esperaba {}) en fila {}",
            tick,
            samples.len(),
            row_idx + 1
        );

        let axis = |col: usize, name: &str| -> Result<i32> {
            record[col]
                .parse()
                .with_context(|| format!("{} inválido en fila {}", name, row_idx + 1))
        };
        samples.push(AccelSample::new(axis(1, "x")?, axis(2, "y")?, axis(3, "z")?));
    }

    if samples.is_empty() {
        return Err(anyhow!("El CSV {:?} no contiene datos", path));
    }

    Ok(samples)
}
