use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Row, RowAccessor};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::model::{CanonicalRow, Cumulative, FrontBack, Measure, RoundInfo, TransformedRow};
use crate::reshape::WideTable;

const BASE_COLUMNS: [&str; 17] = [
    "TEGNum", "Round", "Hole", "PAR", "SI", "Pl", "Sc", "TEG", "HC", "HoleID", "FrontBack",
    "Player", "HCStrokes", "GrossVP", "Net", "NetVP", "Stableford",
];

/// Reads any wide sheet. Short rows are padded with blanks.
pub fn load_wide_table(path: &Path) -> Result<WideTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| PipelineError::csv(path, err))?;
    let headers = reader
        .headers()
        .map_err(|err| PipelineError::csv(path, err))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| PipelineError::csv(path, err))?;
        let mut cells = record.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        cells.resize(headers.len().max(cells.len()), String::new());
        rows.push(cells);
    }
    Ok(WideTable::new(headers, rows))
}

/// Loads the flat score store. A missing file is an error, never an empty store.
pub fn load_scores(path: &Path) -> Result<Vec<TransformedRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| PipelineError::csv(path, err))?;
    let mut out = Vec::new();
    for row in reader.deserialize::<TransformedRow>() {
        out.push(row.map_err(|err| PipelineError::csv(path, err))?);
    }
    info!(path = %path.display(), rows = out.len(), "score store loaded");
    Ok(out)
}

/// Whole-file overwrite through a temp file.
pub fn save_scores(path: &Path, rows: &[TransformedRow]) -> Result<()> {
    ensure_parent(path);
    let tmp = tmp_path(path);
    write_scores(&tmp, rows)?;
    commit(&[(tmp.as_path(), path)])?;
    info!(path = %path.display(), rows = rows.len(), "score store saved");
    Ok(())
}

fn write_scores(path: &Path, rows: &[TransformedRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|err| PipelineError::csv(path, err))?;
    if rows.is_empty() {
        writer
            .write_record(BASE_COLUMNS)
            .map_err(|err| PipelineError::csv(path, err))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| PipelineError::csv(path, err))?;
    }
    writer.flush().map_err(|err| PipelineError::io(path, err))
}

pub fn load_round_info(path: &Path) -> Result<Vec<RoundInfo>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| PipelineError::csv(path, err))?;
    let mut out = Vec::new();
    for row in reader.deserialize::<RoundInfo>() {
        out.push(row.map_err(|err| PipelineError::csv(path, err))?);
    }
    Ok(out)
}

/// Column order shared by the Parquet file and its CSV mirror.
pub fn canonical_columns() -> Vec<String> {
    let mut cols = BASE_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    cols.push("Date".to_string());
    cols.push("Course".to_string());
    cols.push("Hole Order Ever".to_string());
    for m in Measure::ALL {
        for scope in ["Round", "TEG", "Career"] {
            cols.push(format!("{} Cum {scope}", m.column()));
        }
    }
    cols.push("TEG Count".to_string());
    cols.push("Career Count".to_string());
    for m in Measure::ALL {
        for scope in ["Round", "TEG", "Career"] {
            cols.push(format!("{} {scope} Avg", m.column()));
        }
    }
    cols
}

/// Writes both canonical files in full. Both temp files are written before
/// either is swapped in, so a failure leaves the previous pair intact.
pub fn save_canonical(parquet_path: &Path, csv_path: &Path, rows: &[CanonicalRow]) -> Result<()> {
    ensure_parent(parquet_path);
    ensure_parent(csv_path);
    let parquet_tmp = tmp_path(parquet_path);
    let csv_tmp = tmp_path(csv_path);
    write_canonical(&parquet_tmp, &csv_tmp, rows)?;
    commit(&[
        (parquet_tmp.as_path(), parquet_path),
        (csv_tmp.as_path(), csv_path),
    ])?;
    info!(
        parquet = %parquet_path.display(),
        csv = %csv_path.display(),
        rows = rows.len(),
        "canonical data saved"
    );
    Ok(())
}

/// Destination files for one full save of the score store and the canonical pair.
#[derive(Debug, Clone, Copy)]
pub struct StoreFiles<'a> {
    pub scores: &'a Path,
    pub parquet: &'a Path,
    pub csv: &'a Path,
}

/// Stages all three files before renaming any, so the score store is never
/// ahead of the canonical data when a write fails.
pub fn save_stores(
    files: StoreFiles<'_>,
    scores: &[TransformedRow],
    canonical: &[CanonicalRow],
) -> Result<()> {
    for path in [files.scores, files.parquet, files.csv] {
        ensure_parent(path);
    }
    let scores_tmp = tmp_path(files.scores);
    let parquet_tmp = tmp_path(files.parquet);
    let csv_tmp = tmp_path(files.csv);

    let staged = write_scores(&scores_tmp, scores)
        .and_then(|()| write_canonical(&parquet_tmp, &csv_tmp, canonical));
    if let Err(err) = staged {
        discard(&[scores_tmp.as_path(), parquet_tmp.as_path(), csv_tmp.as_path()]);
        return Err(err);
    }
    commit(&[
        (parquet_tmp.as_path(), files.parquet),
        (csv_tmp.as_path(), files.csv),
        (scores_tmp.as_path(), files.scores),
    ])?;
    info!(
        scores = %files.scores.display(),
        parquet = %files.parquet.display(),
        score_rows = scores.len(),
        canonical_rows = canonical.len(),
        "stores saved"
    );
    Ok(())
}

fn write_canonical(parquet_path: &Path, csv_path: &Path, rows: &[CanonicalRow]) -> Result<()> {
    let batch = canonical_batch(rows)?;
    let file =
        fs::File::create(parquet_path).map_err(|err| PipelineError::io(parquet_path, err))?;
    let parquet_err = |source: ParquetError| PipelineError::Parquet {
        path: parquet_path.to_path_buf(),
        source,
    };
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).map_err(parquet_err)?;
    writer.write(&batch).map_err(parquet_err)?;
    writer.close().map_err(parquet_err)?;

    let mut writer =
        csv::Writer::from_path(csv_path).map_err(|err| PipelineError::csv(csv_path, err))?;
    writer
        .write_record(canonical_columns())
        .map_err(|err| PipelineError::csv(csv_path, err))?;
    for row in rows {
        writer
            .write_record(csv_record(row))
            .map_err(|err| PipelineError::csv(csv_path, err))?;
    }
    writer.flush().map_err(|err| PipelineError::io(csv_path, err))
}

/// Renames staged files into place in order. Staged files not yet renamed are
/// removed on failure.
fn commit(moves: &[(&Path, &Path)]) -> Result<()> {
    for (idx, (tmp, dest)) in moves.iter().enumerate() {
        if let Err(err) = fs::rename(tmp, dest) {
            let pending = moves[idx..].iter().map(|(t, _)| *t).collect::<Vec<_>>();
            discard(&pending);
            return Err(PipelineError::io(*dest, err));
        }
    }
    Ok(())
}

fn discard(paths: &[&Path]) {
    for path in paths {
        if path.is_file() {
            let _ = fs::remove_file(path);
        }
    }
}

pub fn load_canonical(path: &Path) -> Result<Vec<CanonicalRow>> {
    let file = fs::File::open(path).map_err(|err| PipelineError::io(path, err))?;
    let parquet_err = |source: ParquetError| PipelineError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let reader = SerializedFileReader::new(file).map_err(parquet_err)?;
    let index = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| (col.name().to_string(), idx))
        .collect::<HashMap<_, _>>();
    let cols = ColumnIndex { path, index };

    let mut out = Vec::new();
    for row in reader.get_row_iter(None).map_err(parquet_err)? {
        let row = row.map_err(parquet_err)?;
        out.push(cols.decode(&row)?);
    }
    info!(path = %path.display(), rows = out.len(), "canonical data loaded");
    Ok(out)
}

struct ColumnIndex<'a> {
    path: &'a Path,
    index: HashMap<String, usize>,
}

impl ColumnIndex<'_> {
    fn idx(&self, name: &str) -> Result<usize> {
        self.index.get(name).copied().ok_or_else(|| {
            PipelineError::malformed(
                self.path.display().to_string(),
                format!("missing column {name}"),
            )
        })
    }

    fn int(&self, row: &Row, name: &str) -> Result<i64> {
        let idx = self.idx(name)?;
        if let Ok(v) = row.get_int(idx) {
            return Ok(i64::from(v));
        }
        if let Ok(v) = row.get_long(idx) {
            return Ok(v);
        }
        Err(self.bad(name, "integer"))
    }

    fn uint(&self, row: &Row, name: &str) -> Result<u32> {
        u32::try_from(self.int(row, name)?).map_err(|_| self.bad(name, "non-negative integer"))
    }

    fn i32(&self, row: &Row, name: &str) -> Result<i32> {
        i32::try_from(self.int(row, name)?).map_err(|_| self.bad(name, "32-bit integer"))
    }

    fn float(&self, row: &Row, name: &str) -> Result<f64> {
        row.get_double(self.idx(name)?)
            .map_err(|_| self.bad(name, "float"))
    }

    fn string(&self, row: &Row, name: &str) -> Result<String> {
        row.get_string(self.idx(name)?)
            .map(|s| s.to_string())
            .map_err(|_| self.bad(name, "string"))
    }

    fn opt_string(&self, row: &Row, name: &str) -> Result<Option<String>> {
        Ok(row.get_string(self.idx(name)?).ok().map(|s| s.to_string()))
    }

    fn bad(&self, name: &str, want: &str) -> PipelineError {
        PipelineError::malformed(
            self.path.display().to_string(),
            format!("column {name} is not a {want}"),
        )
    }

    fn decode(&self, row: &Row) -> Result<CanonicalRow> {
        let front_back = self.string(row, "FrontBack")?;
        let base = TransformedRow {
            teg_num: self.uint(row, "TEGNum")?,
            round: self.uint(row, "Round")?,
            hole: self.uint(row, "Hole")?,
            par: self.i32(row, "PAR")?,
            si: self.uint(row, "SI")?,
            pl: self.string(row, "Pl")?,
            sc: self.i32(row, "Sc")?,
            teg: self.string(row, "TEG")?,
            hc: self.float(row, "HC")?,
            hole_id: self.string(row, "HoleID")?,
            front_back: FrontBack::parse(&front_back)
                .ok_or_else(|| self.bad("FrontBack", "Front/Back value"))?,
            player: self.string(row, "Player")?,
            hc_strokes: self.i32(row, "HCStrokes")?,
            gross_vp: self.i32(row, "GrossVP")?,
            net: self.i32(row, "Net")?,
            net_vp: self.i32(row, "NetVP")?,
            stableford: self.i32(row, "Stableford")?,
        };
        let mut cumulative = [Cumulative::default(); 4];
        for m in Measure::ALL {
            let c = m.column();
            cumulative[m.index()] = Cumulative {
                cum_round: self.int(row, &format!("{c} Cum Round"))?,
                cum_teg: self.int(row, &format!("{c} Cum TEG"))?,
                cum_career: self.int(row, &format!("{c} Cum Career"))?,
                round_avg: self.float(row, &format!("{c} Round Avg"))?,
                teg_avg: self.float(row, &format!("{c} TEG Avg"))?,
                career_avg: self.float(row, &format!("{c} Career Avg"))?,
            };
        }
        Ok(CanonicalRow {
            base,
            date: self.opt_string(row, "Date")?,
            course: self.opt_string(row, "Course")?,
            hole_order_ever: self.uint(row, "Hole Order Ever")?,
            teg_count: self.uint(row, "TEG Count")?,
            career_count: self.uint(row, "Career Count")?,
            cumulative,
        })
    }
}

fn canonical_batch(rows: &[CanonicalRow]) -> Result<RecordBatch> {
    let mut columns: Vec<(ArrayRef, bool)> = vec![
        (int_col(rows, |r| r.base.teg_num.into()), false),
        (int_col(rows, |r| r.base.round.into()), false),
        (int_col(rows, |r| r.base.hole.into()), false),
        (int_col(rows, |r| r.base.par.into()), false),
        (int_col(rows, |r| r.base.si.into()), false),
        (text_col(rows, |r| r.base.pl.as_str()), false),
        (int_col(rows, |r| r.base.sc.into()), false),
        (text_col(rows, |r| r.base.teg.as_str()), false),
        (float_col(rows, |r| r.base.hc), false),
        (text_col(rows, |r| r.base.hole_id.as_str()), false),
        (text_col(rows, |r| r.base.front_back.as_str()), false),
        (text_col(rows, |r| r.base.player.as_str()), false),
        (int_col(rows, |r| r.base.hc_strokes.into()), false),
        (int_col(rows, |r| r.base.gross_vp.into()), false),
        (int_col(rows, |r| r.base.net.into()), false),
        (int_col(rows, |r| r.base.net_vp.into()), false),
        (int_col(rows, |r| r.base.stableford.into()), false),
        (opt_text_col(rows, |r| r.date.as_deref()), true),
        (opt_text_col(rows, |r| r.course.as_deref()), true),
        (int_col(rows, |r| r.hole_order_ever.into()), false),
    ];
    for m in Measure::ALL {
        columns.push((long_col(rows, |r| r.cumulative(m).cum_round), false));
        columns.push((long_col(rows, |r| r.cumulative(m).cum_teg), false));
        columns.push((long_col(rows, |r| r.cumulative(m).cum_career), false));
    }
    columns.push((int_col(rows, |r| r.teg_count.into()), false));
    columns.push((int_col(rows, |r| r.career_count.into()), false));
    for m in Measure::ALL {
        columns.push((float_col(rows, |r| r.cumulative(m).round_avg), false));
        columns.push((float_col(rows, |r| r.cumulative(m).teg_avg), false));
        columns.push((float_col(rows, |r| r.cumulative(m).career_avg), false));
    }

    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = canonical_columns()
        .into_iter()
        .zip(columns)
        .map(|(name, (array, nullable))| {
            (Field::new(name, array.data_type().clone(), nullable), array)
        })
        .unzip();
    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).map_err(|source| PipelineError::Arrow {
        what: "canonical record batch",
        source,
    })
}

fn int_col(rows: &[CanonicalRow], f: impl Fn(&CanonicalRow) -> i64) -> ArrayRef {
    Arc::new(Int32Array::from(
        rows.iter().map(|r| f(r) as i32).collect::<Vec<_>>(),
    ))
}

fn long_col(rows: &[CanonicalRow], f: impl Fn(&CanonicalRow) -> i64) -> ArrayRef {
    Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn float_col(rows: &[CanonicalRow], f: impl Fn(&CanonicalRow) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn text_col<'a>(rows: &'a [CanonicalRow], f: impl Fn(&'a CanonicalRow) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn opt_text_col<'a>(
    rows: &'a [CanonicalRow],
    f: impl Fn(&'a CanonicalRow) -> Option<&'a str>,
) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn csv_record(row: &CanonicalRow) -> Vec<String> {
    let b = &row.base;
    let mut out = vec![
        b.teg_num.to_string(),
        b.round.to_string(),
        b.hole.to_string(),
        b.par.to_string(),
        b.si.to_string(),
        b.pl.clone(),
        b.sc.to_string(),
        b.teg.clone(),
        b.hc.to_string(),
        b.hole_id.clone(),
        b.front_back.as_str().to_string(),
        b.player.clone(),
        b.hc_strokes.to_string(),
        b.gross_vp.to_string(),
        b.net.to_string(),
        b.net_vp.to_string(),
        b.stableford.to_string(),
        row.date.clone().unwrap_or_default(),
        row.course.clone().unwrap_or_default(),
        row.hole_order_ever.to_string(),
    ];
    for m in Measure::ALL {
        let c = row.cumulative(m);
        out.extend([c.cum_round, c.cum_teg, c.cum_career].map(|v| v.to_string()));
    }
    out.push(row.teg_count.to_string());
    out.push(row.career_count.to_string());
    for m in Measure::ALL {
        let c = row.cumulative(m);
        out.extend([c.round_avg, c.teg_avg, c.career_avg].map(|v| v.to_string()));
    }
    out
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
}
