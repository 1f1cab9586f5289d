use crate::{
    constants::{SECTOR_COUNT, SECTOR_WIDTH},
    hardware::Reading,
    modules::calibration::{self, CalibrationError, CalibrationModel},
    utils::normalize_heading,
};
use heapless::FnvIndexSet;
use log::{debug, info};

/// Gathers horizontal field samples until every heading sector was visited.
///
/// The dataset only grows while the collection is incomplete. The sample
/// that visits the last sector is the final one kept.
#[derive(Clone, Debug, Default)]
pub struct Collector {
    sectors: FnvIndexSet<u8, 64>,
    points: Vec<(f64, f64)>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, heading: f64, x: f64, y: f64) {
        if !heading.is_finite() || !x.is_finite() || !y.is_finite() {
            debug!("Ignoring non-finite sample at heading {}", heading);
            return;
        }
        if self.is_complete() {
            return;
        }

        let sector = sector(heading);
        // capacity is above the sector count
        if let Ok(true) = self.sectors.insert(sector) {
            debug!("Visited sector {} ({}/{})", sector, self.progress(), SECTOR_COUNT);
            if self.is_complete() {
                info!("Collected all sectors with {} points", self.points.len() + 1);
            }
        }
        self.points.push((x, y));
    }

    pub fn offer_reading(&mut self, reading: &Reading) {
        self.offer(reading.heading, reading.corrected.0, reading.corrected.1);
    }

    pub fn is_complete(&self) -> bool {
        self.sectors.len() == SECTOR_COUNT
    }

    /// Number of distinct sectors visited so far.
    pub fn progress(&self) -> usize {
        self.sectors.len()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn clear(&mut self) {
        self.sectors.clear();
        self.points.clear();
    }

    pub fn fit(&self) -> Result<CalibrationModel, CalibrationError> {
        if !self.is_complete() {
            return Err(CalibrationError::Incomplete {
                progress: self.progress(),
            });
        }

        calibration::fit(&self.points)
    }
}

fn sector(heading: f64) -> u8 {
    ((normalize_heading(heading) / SECTOR_WIDTH).floor() as usize % SECTOR_COUNT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(collector: &mut Collector, sectors: core::ops::Range<usize>) {
        for i in sectors {
            let heading = i as f64 * SECTOR_WIDTH + 5.;
            let (sin, cos) = heading.to_radians().sin_cos();
            collector.offer(heading, 20. * cos, 20. * sin);
        }
    }

    #[test]
    fn test_sector() {
        assert_eq!(sector(0.), 0);
        assert_eq!(sector(9.99), 0);
        assert_eq!(sector(10.), 1);
        assert_eq!(sector(359.9), 35);
        assert_eq!(sector(360.), 0);
        assert_eq!(sector(-5.), 35);
        assert_eq!(sector(725.), 0);
    }

    #[test]
    fn test_completes_on_last_sector() {
        let mut collector = Collector::new();

        sweep(&mut collector, 0..35);
        assert!(!collector.is_complete());
        assert_eq!(collector.progress(), 35);

        sweep(&mut collector, 35..36);
        assert!(collector.is_complete());
        assert_eq!(collector.progress(), 36);
        assert_eq!(collector.points().len(), 36);
    }

    #[test]
    fn test_completes_on_sector_boundaries() {
        let mut collector = Collector::new();

        for i in 0..36 {
            assert!(!collector.is_complete());
            assert_eq!(collector.progress(), i);
            collector.offer(i as f64 * SECTOR_WIDTH, i as f64, -(i as f64));
        }

        assert!(collector.is_complete());
        assert_eq!(collector.points().len(), 36);
        assert_eq!(collector.points()[35], (35., -35.));
    }

    #[test]
    fn test_duplicates_do_not_advance() {
        let mut collector = Collector::new();

        for _ in 0..5 {
            collector.offer(42., 1., 2.);
        }

        assert_eq!(collector.progress(), 1);
        assert_eq!(collector.points().len(), 5);
    }

    #[test]
    fn test_frozen_when_complete() {
        let mut collector = Collector::new();
        sweep(&mut collector, 0..36);

        collector.offer(15., 100., 100.);
        collector.offer(-90., 100., 100.);

        assert_eq!(collector.points().len(), 36);
        assert!(!collector.points().contains(&(100., 100.)));
    }

    #[test]
    fn test_ignores_non_finite() {
        let mut collector = Collector::new();

        collector.offer(f64::NAN, 1., 1.);
        collector.offer(10., f64::INFINITY, 1.);
        collector.offer(10., 1., f64::NAN);

        assert_eq!(collector.progress(), 0);
        assert!(collector.points().is_empty());
    }

    #[test]
    fn test_offer_reading() {
        let mut collector = Collector::new();
        let reading = Reading {
            heading: 123.,
            raw: (9., 9., 9.),
            corrected: (3., -4., 5.),
            ..Default::default()
        };

        collector.offer_reading(&reading);

        assert_eq!(collector.progress(), 1);
        assert_eq!(collector.points(), &[(3., -4.)]);
    }

    #[test]
    fn test_fit_requires_completion() {
        let mut collector = Collector::new();
        sweep(&mut collector, 0..20);

        assert_eq!(
            collector.fit(),
            Err(CalibrationError::Incomplete { progress: 20 })
        );

        sweep(&mut collector, 20..36);
        assert!(collector.fit().is_ok());
    }

    #[test]
    fn test_clear() {
        let mut collector = Collector::new();
        sweep(&mut collector, 0..36);

        collector.clear();

        assert_eq!(collector.progress(), 0);
        assert!(collector.into_points().is_empty());
    }
}
