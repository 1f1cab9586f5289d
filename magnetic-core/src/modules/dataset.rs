//! Comma separated import and export of calibration data.

use crate::modules::calibration::CalibrationModel;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("line {line}: expected `x,y`, found {content:?}")]
    Malformed { line: usize, content: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn write_points<W: Write>(mut writer: W, points: &[(f64, f64)]) -> io::Result<()> {
    for (x, y) in points {
        writeln!(writer, "{},{}", x, y)?;
    }
    writer.flush()
}

/// Reads `x,y` rows. Blank lines are skipped.
pub fn read_points<R: BufRead>(reader: R) -> Result<Vec<(f64, f64)>, DatasetError> {
    let mut points = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let point = trimmed
            .split_once(',')
            .and_then(|(x, y)| Some((x.trim().parse::<f64>().ok()?, y.trim().parse::<f64>().ok()?)));
        match point {
            Some(point) => points.push(point),
            None => {
                return Err(DatasetError::Malformed {
                    line: index + 1,
                    content: line,
                })
            }
        }
    }

    Ok(points)
}

/// Writes every point next to its corrected value as `x,y,xc,yc`.
pub fn write_report<W: Write>(
    mut writer: W,
    model: &CalibrationModel,
    points: &[(f64, f64)],
) -> io::Result<()> {
    for &(x, y) in points {
        let (xc, yc) = model.correct(x, y);
        writeln!(writer, "{},{},{},{}", x, y, xc, yc)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::calibration::fit;
    use std::io::Cursor;

    #[test]
    fn test_write_then_read() {
        let points = vec![(1.5, -2.25), (0., 3.), (-7.125, 0.5)];
        let mut buffer = Vec::new();

        write_points(&mut buffer, &points).unwrap();
        assert_eq!(String::from_utf8(buffer.clone()).unwrap(), "1.5,-2.25\n0,3\n-7.125,0.5\n");
        assert_eq!(read_points(Cursor::new(buffer)).unwrap(), points);
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let input = "1,2\n\n  3 , 4 \n\n";

        assert_eq!(read_points(input.as_bytes()).unwrap(), vec![(1., 2.), (3., 4.)]);
    }

    #[test]
    fn test_read_malformed() {
        let input = "1,2\n3;4\n";

        match read_points(input.as_bytes()) {
            Err(DatasetError::Malformed { line, content }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "3;4");
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            read_points("1,x\n".as_bytes()),
            Err(DatasetError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_write_report() {
        let points = [(11., 0.), (-9., 0.), (1., 10.), (1., -10.)];
        let model = fit(&points).unwrap();
        let mut buffer = Vec::new();

        write_report(&mut buffer, &model, &points).unwrap();
        let report = String::from_utf8(buffer).unwrap();
        let rows: Vec<Vec<f64>> = report
            .lines()
            .map(|line| line.split(',').map(|value| value.parse().unwrap()).collect())
            .collect();

        assert_eq!(rows.len(), 4);
        for (row, &(x, y)) in rows.iter().zip(&points) {
            assert_eq!(row.len(), 4);
            assert_eq!((row[0], row[1]), (x, y));
            let (xc, yc) = model.correct(x, y);
            assert_eq!((row[2], row[3]), (xc, yc));
        }
    }
}
