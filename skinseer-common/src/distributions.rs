use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Allowed distance of the frequency sum from 1.0.
pub const FREQUENCY_SUM_TOLERANCE: f32 = 0.001;

/// Number of CLI values describing one distribution entry.
pub const VALUES_PER_DISTRIBUTION: usize = 7;

/// Size statistics for one class of lesion, plus how often it is drawn.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LesionDistribution {
    /// Mean lesion width; zero means "no lesion" for this entry.
    pub width_mean: f64,
    pub width_sigma: f64,
    pub height_mean: f64,
    pub height_sigma: f64,
    /// Mean depth of the lesion's surface edge below the top of the epidermis.
    pub depth_mean: f64,
    pub depth_sigma: f64,
    pub frequency: f32,
}

impl LesionDistribution {
    /// Builds an entry from the seven positional CLI values
    /// `<width mean> <width sigma> <height mean> <height sigma> <depth mean> <depth sigma> <frequency>`.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.len() != VALUES_PER_DISTRIBUTION {
            anyhow::bail!(
                "A nevus distribution needs {} values, got {}",
                VALUES_PER_DISTRIBUTION,
                values.len()
            );
        }
        let entry = LesionDistribution {
            width_mean: values[0],
            width_sigma: values[1],
            height_mean: values[2],
            height_sigma: values[3],
            depth_mean: values[4],
            depth_sigma: values[5],
            frequency: values[6] as f32,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// True if samples drawn from this entry carry a lesion.
    pub fn has_lesion(&self) -> bool {
        self.width_mean != 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.width_mean < 0.0 {
            anyhow::bail!("Invalid nevus width mean: {}", self.width_mean);
        }
        if self.width_mean > 0.0 && self.width_sigma < 0.0 {
            anyhow::bail!("Invalid nevus width sigma: {}", self.width_sigma);
        }
        if self.height_mean < 0.0 {
            anyhow::bail!("Invalid nevus height mean: {}", self.height_mean);
        }
        if self.height_mean > 0.0 && self.height_sigma < 0.0 {
            anyhow::bail!("Invalid nevus height sigma: {}", self.height_sigma);
        }
        if self.depth_mean < 0.0 {
            anyhow::bail!("Invalid nevus epidermis depth mean: {}", self.depth_mean);
        }
        if self.depth_sigma < 0.0 {
            anyhow::bail!("Invalid nevus epidermis depth sigma: {}", self.depth_sigma);
        }
        if !(0.0..=1.0).contains(&self.frequency) {
            anyhow::bail!("Invalid nevus distribution frequency: {}", self.frequency);
        }
        Ok(())
    }
}

/// Weighted list of lesion distributions used by dataset generation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DistributionSet {
    #[serde(rename = "distribution")]
    pub entries: Vec<LesionDistribution>,
}

impl DistributionSet {
    /// Validates and wraps a list of entries.
    pub fn new(entries: Vec<LesionDistribution>) -> Result<Self> {
        let set = DistributionSet { entries };
        set.validate()?;
        Ok(set)
    }

    /// Loads `[[distribution]]` tables from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let text = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read distributions file '{}': {}", path_ref.display(), e))?;
        let set: DistributionSet = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            anyhow::bail!("At least one nevus distribution is required.");
        }
        for entry in &self.entries {
            entry.validate()?;
        }
        let sum: f32 = self.entries.iter().map(|e| e.frequency).sum();
        if (sum - 1.0).abs() > FREQUENCY_SUM_TOLERANCE {
            anyhow::bail!("Sum of distribution frequencies must equal 1 (got {})", sum);
        }
        Ok(())
    }

    /// Index of the first entry whose cumulative frequency exceeds `draw`.
    ///
    /// `draw` is a uniform value in `[0, 1)`. Falls back to the first entry
    /// when rounding leaves the cumulative sum at or below the draw.
    pub fn select(&self, draw: f32) -> usize {
        let mut accum = 0.0f32;
        for (idx, entry) in self.entries.iter().enumerate() {
            accum += entry.frequency;
            if draw < accum {
                return idx;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(width_mean: f64, frequency: f32) -> LesionDistribution {
        LesionDistribution {
            width_mean,
            width_sigma: 5.0,
            height_mean: 80.0,
            height_sigma: 10.0,
            depth_mean: 20.0,
            depth_sigma: 2.0,
            frequency,
        }
    }

    #[test]
    fn selection_uses_cumulative_frequency() {
        let set = DistributionSet::new(vec![entry(0.0, 0.3), entry(40.0, 0.7)]).unwrap();
        assert_eq!(set.select(0.95), 1);
        assert_eq!(set.select(0.1), 0);
        assert_eq!(set.select(0.3), 1);
    }

    #[test]
    fn selection_falls_back_to_first_entry() {
        let set = DistributionSet {
            entries: vec![entry(0.0, 0.4995), entry(40.0, 0.4995)],
        };
        assert_eq!(set.select(0.9995), 0);
    }

    #[test]
    fn frequency_sum_is_checked_with_tolerance() {
        assert!(DistributionSet::new(vec![entry(0.0, 0.5), entry(40.0, 0.5005)]).is_ok());
        assert!(DistributionSet::new(vec![entry(0.0, 0.5), entry(40.0, 0.45)]).is_err());
        assert!(DistributionSet::new(Vec::new()).is_err());
    }

    #[test]
    fn zero_width_mean_means_no_lesion() {
        assert!(!entry(0.0, 1.0).has_lesion());
        assert!(entry(60.0, 1.0).has_lesion());
    }

    #[test]
    fn cli_values_are_validated() {
        let ok = LesionDistribution::from_values(&[60.0, 5.0, 120.0, 10.0, 20.0, 2.0, 1.0]).unwrap();
        assert_eq!(ok.height_mean, 120.0);
        assert!(LesionDistribution::from_values(&[-1.0, 5.0, 120.0, 10.0, 20.0, 2.0, 1.0]).is_err());
        assert!(LesionDistribution::from_values(&[60.0, 5.0, 120.0, 10.0, 20.0, -2.0, 1.0]).is_err());
        assert!(LesionDistribution::from_values(&[60.0, 5.0, 120.0, 10.0, 20.0, 2.0, 1.5]).is_err());
        assert!(LesionDistribution::from_values(&[60.0, 5.0]).is_err());
    }

    #[test]
    fn loads_toml_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nevi.toml");
        std::fs::write(
            &path,
            r#"
[[distribution]]
width_mean = 0.0
width_sigma = 0.0
height_mean = 0.0
height_sigma = 0.0
depth_mean = 0.0
depth_sigma = 0.0
frequency = 0.75

[[distribution]]
width_mean = 60.0
width_sigma = 5.0
height_mean = 120.0
height_sigma = 10.0
depth_mean = 20.0
depth_sigma = 2.0
frequency = 0.25
"#,
        )
        .unwrap();
        let set = DistributionSet::load(&path).unwrap();
        assert_eq!(set.entries.len(), 2);
        assert!(!set.entries[0].has_lesion());
        assert_eq!(set.select(0.8), 1);
    }
}
