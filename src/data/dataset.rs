//! Labelled feature datasets
//!
//! Chronological splits, z-score normalization fitted on training data only,
//! and CSV export for external model training.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::features::schema::{feature_names, FEATURE_DIM, SCHEMA_VERSION};
use crate::pipeline::Sample;
use crate::{Label, MatchupError, Result};

/// Samples in the order the pipeline emitted them (chronological)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureDataset {
    samples: Vec<Sample>,
}

/// Train / validation / test partitions, in time order
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: FeatureDataset,
    pub validation: FeatureDataset,
    pub test: FeatureDataset,
}

/// Class balance of a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub home_wins: usize,
    pub away_wins: usize,
    pub draws: usize,
}

impl FeatureDataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        FeatureDataset { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Feature rows in sample order
    pub fn feature_rows(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.features.to_vec()).collect()
    }

    /// Label classes in sample order
    pub fn labels(&self) -> Vec<u8> {
        self.samples.iter().map(|s| s.label.class()).collect()
    }

    pub fn label_counts(&self) -> LabelCounts {
        let mut counts = LabelCounts::default();
        for sample in &self.samples {
            match sample.label {
                Label::HomeWin => counts.home_wins += 1,
                Label::AwayWin => counts.away_wins += 1,
                Label::Draw => counts.draws += 1,
            }
        }
        counts
    }

    /// Split by position: the earliest `train_frac` of samples train, the next
    /// `val_frac` validate, the rest test. No shuffling, so later games never
    /// inform earlier ones.
    pub fn split_chronological(&self, train_frac: f64, val_frac: f64) -> Result<DatasetSplit> {
        if !(0.0..=1.0).contains(&train_frac)
            || !(0.0..=1.0).contains(&val_frac)
            || train_frac + val_frac > 1.0
        {
            return Err(MatchupError::Config(format!(
                "invalid split fractions: train={} validation={}",
                train_frac, val_frac
            )));
        }

        let n = self.samples.len();
        let train_end = (n as f64 * train_frac).round() as usize;
        let val_end = ((n as f64 * (train_frac + val_frac)).round() as usize).clamp(train_end, n);

        Ok(DatasetSplit {
            train: FeatureDataset::new(self.samples[..train_end].to_vec()),
            validation: FeatureDataset::new(self.samples[train_end..val_end].to_vec()),
            test: FeatureDataset::new(self.samples[val_end..].to_vec()),
        })
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_file(path.as_ref(), None)
    }

    /// Export with every feature column normalized by `scaler`
    pub fn write_scaled_csv<P: AsRef<Path>>(&self, path: P, scaler: &FeatureScaler) -> Result<()> {
        self.write_file(path.as_ref(), Some(scaler))
    }

    fn write_file(&self, path: &Path, scaler: Option<&FeatureScaler>) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_rows(file, true, scaler)?;
        log::info!("Wrote {} samples to {}", self.len(), path.display());
        Ok(())
    }

    /// Append rows to an existing export, writing the header only for a new file
    pub fn append_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        if is_new {
            return self.write_csv(path);
        }
        let file = std::fs::OpenOptions::new().append(true).open(path)?;
        self.write_rows(file, false, None)?;
        log::info!("Appended {} samples to {}", self.len(), path.display());
        Ok(())
    }

    /// Header: `game_id,start_time,home_team_id,away_team_id,<features...>,label`
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        self.write_rows(writer, true, None)
    }

    fn write_rows<W: Write>(
        &self,
        writer: W,
        header: bool,
        scaler: Option<&FeatureScaler>,
    ) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        if header {
            let mut names = vec!["game_id", "start_time", "home_team_id", "away_team_id"];
            names.extend(feature_names());
            names.push("label");
            wtr.write_record(&names)?;
        }

        let rows = match scaler {
            Some(scaler) => scaler.transform_dataset(self),
            None => self.feature_rows(),
        };
        for (sample, row) in self.samples.iter().zip(rows) {
            let mut record = vec![
                sample.game_id.clone(),
                sample.start_time.to_rfc3339(),
                sample.home_team.0.to_string(),
                sample.away_team.0.to_string(),
            ];
            record.extend(row.iter().map(|v| v.to_string()));
            record.push(sample.label.class().to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl DatasetSplit {
    /// Scaler fitted on the training partition only
    pub fn fit_scaler(&self) -> Result<FeatureScaler> {
        FeatureScaler::fit(&self.train)
    }

    /// Write `<stem>.train.csv`, `<stem>.validation.csv` and `<stem>.test.csv` beside
    /// `base`, every partition normalized with the same training-fitted scaler
    pub fn write_scaled_csv<P: AsRef<Path>>(
        &self,
        base: P,
        scaler: &FeatureScaler,
    ) -> Result<Vec<PathBuf>> {
        let base = base.as_ref();
        let mut paths = Vec::with_capacity(3);
        for (name, part) in [
            ("train", &self.train),
            ("validation", &self.validation),
            ("test", &self.test),
        ] {
            let path = base.with_extension(format!("{}.csv", name));
            part.write_scaled_csv(&path, scaler)?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Per-feature z-score parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub schema_version: u32,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl FeatureScaler {
    /// Fit on a (training) dataset. Constant columns get std 1 so they map to 0.
    pub fn fit(dataset: &FeatureDataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(MatchupError::Config(
                "cannot fit a scaler on an empty dataset".to_string(),
            ));
        }

        let n = dataset.len() as f64;
        let mut mean = vec![0.0; FEATURE_DIM];
        for sample in dataset.samples() {
            for (m, v) in mean.iter_mut().zip(sample.features.as_slice()) {
                *m += v;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut std = vec![0.0; FEATURE_DIM];
        for sample in dataset.samples() {
            for ((s, v), m) in std.iter_mut().zip(sample.features.as_slice()).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        for s in std.iter_mut() {
            *s = (*s / n).sqrt();
            if *s < 1e-12 {
                *s = 1.0;
            }
        }

        Ok(FeatureScaler {
            schema_version: SCHEMA_VERSION,
            mean,
            std,
        })
    }

    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Normalized feature rows for a whole dataset
    pub fn transform_dataset(&self, dataset: &FeatureDataset) -> Vec<Vec<f64>> {
        dataset
            .samples()
            .iter()
            .map(|s| self.transform(s.features.as_slice()))
            .collect()
    }
}
