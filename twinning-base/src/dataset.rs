use crate::{pointset::check_finite, types::Matrix};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::info;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

/// A dataset stored on disk.
///
/// Two formats are understood, based on the file name:
///
///  - `*.msgpack.gz`: a gzip-compressed MessagePack array of rows
///  - anything else: one point per line, coordinates separated by commas,
///    tabs or spaces; gzip-compressed if the name ends in `.gz`
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
}

impl Dataset {
    pub fn new<I: Into<PathBuf>>(path: I) -> Self {
        Self { path: path.into() }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn is_msgpack(&self) -> bool {
        self.file_name().ends_with(".msgpack.gz")
    }

    fn is_compressed(&self) -> bool {
        self.file_name().ends_with(".gz")
    }

    pub fn to_matrix(&self) -> Result<Matrix> {
        let file = BufReader::new(
            std::fs::File::open(&self.path)
                .with_context(|| format!("opening dataset {:?}", self.path))?,
        );
        let matrix = if self.is_msgpack() {
            read_msgpack(GzDecoder::new(file))
        } else if self.is_compressed() {
            read_text(BufReader::new(GzDecoder::new(file)))
        } else {
            read_text(file)
        }
        .with_context(|| format!("reading dataset {:?}", self.path))?;
        check_finite(&matrix)?;
        info!(
            "loaded {} points with {} dimensions from {:?}",
            matrix.num_rows(),
            matrix.num_cols(),
            self.path
        );
        Ok(matrix)
    }
}

pub fn read_msgpack<R: Read>(input: R) -> Result<Matrix> {
    rmp_serde::from_read(input).context("decoding msgpack rows")
}

pub fn read_text<R: BufRead>(input: R) -> Result<Matrix> {
    let mut rows = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<f64>()
                    .with_context(|| format!("line {}: cannot parse {:?}", lineno + 1, tok))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(Matrix::from_rows(rows)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pointset::PointSet;
    use flate2::{write::GzEncoder, Compression};
    use std::io::{Cursor, Write};

    #[test]
    fn test_read_text() {
        let input = "# header\n1.0, 2.0\n3 4\n\n5.5\t-6\n";
        let m = read_text(Cursor::new(input)).unwrap();
        assert_eq!(m.num_rows(), 3);
        assert_eq!(m.num_cols(), 2);
        assert_eq!(m.point(2), &[5.5, -6.0]);
    }

    #[test]
    fn test_read_text_ragged() {
        let input = "1.0, 2.0\n3.0\n";
        assert!(read_text(Cursor::new(input)).is_err());
    }

    #[test]
    fn test_read_text_garbage() {
        let input = "1.0, two\n";
        let err = read_text(Cursor::new(input)).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }

    #[test]
    fn test_read_msgpack() {
        let rows = vec![vec![1.0f64, 2.0], vec![3.0, 4.0]];
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(&rmp_serde::to_vec(&rows).unwrap()).unwrap();
        let bytes = enc.finish().unwrap();
        let m = read_msgpack(GzDecoder::new(Cursor::new(bytes))).unwrap();
        assert_eq!(m, Matrix::from_rows(rows).unwrap());
    }
}
