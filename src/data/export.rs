use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::MortalityRow;

/// Write rows to `path`, format chosen by extension (`.csv`, `.parquet`/`.pq`).
pub fn export_rows<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a MortalityRow>,
) -> Result<usize> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let rows: Vec<&MortalityRow> = rows.into_iter().collect();

    match ext.as_str() {
        "csv" => write_csv(path, &rows)?,
        "parquet" | "pq" => write_parquet(path, &rows)?,
        other => bail!("Unsupported export extension: .{other}"),
    }
    log::info!("exported {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn write_csv(path: &Path, rows: &[&MortalityRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[&MortalityRow]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Country", DataType::Utf8, false),
        Field::new("Year", DataType::Int32, false),
        Field::new("Cancer", DataType::Utf8, false),
        Field::new("Age", DataType::Utf8, false),
        Field::new("Sex", DataType::Utf8, false),
        Field::new("Deaths", DataType::Float64, false),
        Field::new("Pop", DataType::Float64, false),
        Field::new("Rate", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.country.as_str()))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.cancer.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.age.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.sex.code()))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.deaths))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.pop))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.rate))),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{AgeBand, Sex};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn rows() -> Vec<MortalityRow> {
        vec![
            MortalityRow::new(
                "Spain".into(),
                2012,
                "Leukaemia".into(),
                AgeBand::new("Age <5"),
                Sex::Male,
                4.0,
                80_000.0,
            )
            .unwrap(),
            MortalityRow::new(
                "Sweden".into(),
                2012,
                "Leukaemia".into(),
                AgeBand::new("Age >64"),
                Sex::Male,
                30.0,
                1_000_000.0,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn csv_export_has_header_and_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.csv");
        let rows = rows();
        assert_eq!(export_rows(&path, &rows).unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Country,Year,Cancer,Age,Sex,Deaths,Pop,Rate"));
        let first = lines.next().unwrap();
        assert!(first.starts_with("Spain,2012,Leukaemia,Age <5,M,4.0,80000.0,"));
    }

    #[test]
    fn parquet_export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.parquet");
        export_rows(&path, &rows()).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let total: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_rows(&dir.path().join("view.xlsx"), &rows()).is_err());
    }
}
