use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading or validating a parameter file.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("Failed to read parameter file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parameter on line {line}: '{text}' (expected NAME=VALUE)")]
    Malformed { line: usize, text: String },

    #[error("Invalid value '{value}' for {name} on line {line}")]
    BadValue {
        line: usize,
        name: String,
        value: String,
    },

    #[error("Invalid parameter set: {0}")]
    Invalid(String),
}

/// Optical coefficients of one tissue region.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerOptics {
    pub absorption_probability: f32,
    pub scatter_probability: f32,
    pub scatter_angle_mean: f64,
    pub scatter_angle_sigma: f64,
}

/// Scanner, tissue, lesion and photon settings for one simulation instance.
///
/// Key names in the parameter file are the upper-case field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Scanner
    pub scanner_width: u32,
    pub scanner_height: u32,
    pub scanner_speed: f32,

    // Epidermis
    pub epidermis_thickness: f32,
    pub epidermis_photon_absorption_probability: f32,
    pub epidermis_photon_scatter_probability: f32,
    pub epidermis_photon_scatter_angle_zero_mean: f64,
    pub epidermis_photon_scatter_angle_sigma: f64,

    // Dermis
    pub dermis_thickness: f32,
    pub dermis_photon_absorption_probability: f32,
    pub dermis_photon_scatter_probability: f32,
    pub dermis_photon_scatter_angle_zero_mean: f64,
    pub dermis_photon_scatter_angle_sigma: f64,

    // Nevus
    pub nevus_valid: bool,
    pub nevus_width: f32,
    pub nevus_height: f32,
    pub nevus_x: f32,
    pub nevus_epidermis_depth: f32,
    pub nevus_photon_absorption_probability: f32,
    pub nevus_photon_scatter_probability: f32,
    pub nevus_photon_scatter_angle_zero_mean: f64,
    pub nevus_photon_scatter_angle_sigma: f64,

    // Photon source and detector
    pub photon_source_x: f32,
    pub photon_source_radius: f32,
    pub photon_emission_rate: u32,
    pub photon_radius: f32,
    pub photon_min_emission_angle: f32,
    pub photon_max_emission_angle: f32,
    pub photon_speed: f32,
    pub photon_detector_x: f32,
    pub photon_detector_width: f32,
    pub num_photon_counters: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            scanner_width: 450,
            scanner_height: 250,
            scanner_speed: 0.0,
            epidermis_thickness: 100.0,
            epidermis_photon_absorption_probability: 0.0,
            epidermis_photon_scatter_probability: 0.0,
            epidermis_photon_scatter_angle_zero_mean: 100.0,
            epidermis_photon_scatter_angle_sigma: 50.0,
            dermis_thickness: 75.0,
            dermis_photon_absorption_probability: 0.0,
            dermis_photon_scatter_probability: 1.0,
            dermis_photon_scatter_angle_zero_mean: -100.0,
            dermis_photon_scatter_angle_sigma: 25.0,
            nevus_valid: true,
            nevus_width: 60.0,
            nevus_height: 120.0,
            nevus_x: 200.0,
            nevus_epidermis_depth: 20.0,
            nevus_photon_absorption_probability: 1.0,
            nevus_photon_scatter_probability: 0.0,
            nevus_photon_scatter_angle_zero_mean: 100.0,
            nevus_photon_scatter_angle_sigma: 50.0,
            photon_source_x: 10.0,
            photon_source_radius: 30.0,
            photon_emission_rate: 1,
            photon_radius: 2.0,
            photon_min_emission_angle: 270.0,
            photon_max_emission_angle: 360.0,
            photon_speed: 1.0,
            photon_detector_x: 150.0,
            photon_detector_width: 15.0,
            num_photon_counters: 10,
        }
    }
}

fn parse_value<T: std::str::FromStr>(line: usize, name: &str, value: &str) -> Result<T, ParamError> {
    value.parse::<T>().map_err(|_| ParamError::BadValue {
        line,
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(line: usize, name: &str, value: &str) -> Result<bool, ParamError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParamError::BadValue {
            line,
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

impl SimParams {
    /// Loads parameters from a `NAME=VALUE` file, starting from the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParamError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|source| ParamError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        let mut params = SimParams::default();
        params.apply_reader(BufReader::new(file)).map_err(|e| match e {
            ParamError::Io { source, .. } => ParamError::Io {
                path: path_ref.display().to_string(),
                source,
            },
            other => other,
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Parses a parameter stream on top of the defaults.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParamError> {
        let mut params = SimParams::default();
        params.apply_reader(reader)?;
        params.validate()?;
        Ok(params)
    }

    /// Applies every `NAME=VALUE` line in `reader` to this parameter set.
    ///
    /// `#` lines and blank lines are skipped; unknown names are ignored.
    pub fn apply_reader<R: BufRead>(&mut self, reader: R) -> Result<(), ParamError> {
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|source| ParamError::Io {
                path: String::from("<stream>"),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = trimmed.split('=').collect();
            if parts.len() != 2 {
                return Err(ParamError::Malformed { line: line_no, text: line.clone() });
            }
            self.set_at(line_no, parts[0].trim(), parts[1].trim())?;
        }
        Ok(())
    }

    /// Sets a single parameter by its file key. Returns `Ok(false)` for
    /// unrecognised names.
    pub fn set(&mut self, name: &str, value: &str) -> Result<bool, ParamError> {
        self.set_at(0, name, value)
    }

    fn set_at(&mut self, line: usize, name: &str, value: &str) -> Result<bool, ParamError> {
        match name {
            "SCANNER_WIDTH" => self.scanner_width = parse_value(line, name, value)?,
            "SCANNER_HEIGHT" => self.scanner_height = parse_value(line, name, value)?,
            "SCANNER_SPEED" => self.scanner_speed = parse_value(line, name, value)?,
            "EPIDERMIS_THICKNESS" => self.epidermis_thickness = parse_value(line, name, value)?,
            "EPIDERMIS_PHOTON_ABSORPTION_PROBABILITY" => {
                self.epidermis_photon_absorption_probability = parse_value(line, name, value)?
            }
            "EPIDERMIS_PHOTON_SCATTER_PROBABILITY" => {
                self.epidermis_photon_scatter_probability = parse_value(line, name, value)?
            }
            "EPIDERMIS_PHOTON_SCATTER_ANGLE_ZERO_MEAN" => {
                self.epidermis_photon_scatter_angle_zero_mean = parse_value(line, name, value)?
            }
            "EPIDERMIS_PHOTON_SCATTER_ANGLE_SIGMA" => {
                self.epidermis_photon_scatter_angle_sigma = parse_value(line, name, value)?
            }
            "DERMIS_THICKNESS" => self.dermis_thickness = parse_value(line, name, value)?,
            "DERMIS_PHOTON_ABSORPTION_PROBABILITY" => {
                self.dermis_photon_absorption_probability = parse_value(line, name, value)?
            }
            "DERMIS_PHOTON_SCATTER_PROBABILITY" => {
                self.dermis_photon_scatter_probability = parse_value(line, name, value)?
            }
            "DERMIS_PHOTON_SCATTER_ANGLE_ZERO_MEAN" => {
                self.dermis_photon_scatter_angle_zero_mean = parse_value(line, name, value)?
            }
            "DERMIS_PHOTON_SCATTER_ANGLE_SIGMA" => {
                self.dermis_photon_scatter_angle_sigma = parse_value(line, name, value)?
            }
            "NEVUS_VALID" => self.nevus_valid = parse_bool(line, name, value)?,
            "NEVUS_WIDTH" => self.nevus_width = parse_value(line, name, value)?,
            "NEVUS_HEIGHT" => self.nevus_height = parse_value(line, name, value)?,
            "NEVUS_X" => self.nevus_x = parse_value(line, name, value)?,
            "NEVUS_EPIDERMIS_DEPTH" => self.nevus_epidermis_depth = parse_value(line, name, value)?,
            "NEVUS_PHOTON_ABSORPTION_PROBABILITY" => {
                self.nevus_photon_absorption_probability = parse_value(line, name, value)?
            }
            "NEVUS_PHOTON_SCATTER_PROBABILITY" => {
                self.nevus_photon_scatter_probability = parse_value(line, name, value)?
            }
            "NEVUS_PHOTON_SCATTER_ANGLE_ZERO_MEAN" => {
                self.nevus_photon_scatter_angle_zero_mean = parse_value(line, name, value)?
            }
            "NEVUS_PHOTON_SCATTER_ANGLE_SIGMA" => {
                self.nevus_photon_scatter_angle_sigma = parse_value(line, name, value)?
            }
            "PHOTON_SOURCE_X" => self.photon_source_x = parse_value(line, name, value)?,
            "PHOTON_SOURCE_RADIUS" => self.photon_source_radius = parse_value(line, name, value)?,
            "PHOTON_EMISSION_RATE" => self.photon_emission_rate = parse_value(line, name, value)?,
            "PHOTON_RADIUS" => self.photon_radius = parse_value(line, name, value)?,
            "PHOTON_MIN_EMISSION_ANGLE" => {
                self.photon_min_emission_angle = parse_value(line, name, value)?
            }
            "PHOTON_MAX_EMISSION_ANGLE" => {
                self.photon_max_emission_angle = parse_value(line, name, value)?
            }
            "PHOTON_SPEED" => self.photon_speed = parse_value(line, name, value)?,
            "PHOTON_DETECTOR_X" => self.photon_detector_x = parse_value(line, name, value)?,
            "PHOTON_DETECTOR_WIDTH" => self.photon_detector_width = parse_value(line, name, value)?,
            "NUM_PHOTON_COUNTERS" => self.num_photon_counters = parse_value(line, name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Every recognised key with its current value, in canonical order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("SCANNER_WIDTH", self.scanner_width.to_string()),
            ("SCANNER_HEIGHT", self.scanner_height.to_string()),
            ("SCANNER_SPEED", self.scanner_speed.to_string()),
            ("EPIDERMIS_THICKNESS", self.epidermis_thickness.to_string()),
            ("EPIDERMIS_PHOTON_ABSORPTION_PROBABILITY", self.epidermis_photon_absorption_probability.to_string()),
            ("EPIDERMIS_PHOTON_SCATTER_PROBABILITY", self.epidermis_photon_scatter_probability.to_string()),
            ("EPIDERMIS_PHOTON_SCATTER_ANGLE_ZERO_MEAN", self.epidermis_photon_scatter_angle_zero_mean.to_string()),
            ("EPIDERMIS_PHOTON_SCATTER_ANGLE_SIGMA", self.epidermis_photon_scatter_angle_sigma.to_string()),
            ("DERMIS_THICKNESS", self.dermis_thickness.to_string()),
            ("DERMIS_PHOTON_ABSORPTION_PROBABILITY", self.dermis_photon_absorption_probability.to_string()),
            ("DERMIS_PHOTON_SCATTER_PROBABILITY", self.dermis_photon_scatter_probability.to_string()),
            ("DERMIS_PHOTON_SCATTER_ANGLE_ZERO_MEAN", self.dermis_photon_scatter_angle_zero_mean.to_string()),
            ("DERMIS_PHOTON_SCATTER_ANGLE_SIGMA", self.dermis_photon_scatter_angle_sigma.to_string()),
            ("NEVUS_VALID", self.nevus_valid.to_string()),
            ("NEVUS_WIDTH", self.nevus_width.to_string()),
            ("NEVUS_HEIGHT", self.nevus_height.to_string()),
            ("NEVUS_X", self.nevus_x.to_string()),
            ("NEVUS_EPIDERMIS_DEPTH", self.nevus_epidermis_depth.to_string()),
            ("NEVUS_PHOTON_ABSORPTION_PROBABILITY", self.nevus_photon_absorption_probability.to_string()),
            ("NEVUS_PHOTON_SCATTER_PROBABILITY", self.nevus_photon_scatter_probability.to_string()),
            ("NEVUS_PHOTON_SCATTER_ANGLE_ZERO_MEAN", self.nevus_photon_scatter_angle_zero_mean.to_string()),
            ("NEVUS_PHOTON_SCATTER_ANGLE_SIGMA", self.nevus_photon_scatter_angle_sigma.to_string()),
            ("PHOTON_SOURCE_X", self.photon_source_x.to_string()),
            ("PHOTON_SOURCE_RADIUS", self.photon_source_radius.to_string()),
            ("PHOTON_EMISSION_RATE", self.photon_emission_rate.to_string()),
            ("PHOTON_RADIUS", self.photon_radius.to_string()),
            ("PHOTON_MIN_EMISSION_ANGLE", self.photon_min_emission_angle.to_string()),
            ("PHOTON_MAX_EMISSION_ANGLE", self.photon_max_emission_angle.to_string()),
            ("PHOTON_SPEED", self.photon_speed.to_string()),
            ("PHOTON_DETECTOR_X", self.photon_detector_x.to_string()),
            ("PHOTON_DETECTOR_WIDTH", self.photon_detector_width.to_string()),
            ("NUM_PHOTON_COUNTERS", self.num_photon_counters.to_string()),
        ]
    }

    /// Writes all parameters in the file format, one `NAME=VALUE` per line.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (name, value) in self.entries() {
            writeln!(writer, "{}={}", name, value)?;
        }
        Ok(())
    }

    /// Saves the parameters so that [`SimParams::load`] reproduces them.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ParamError> {
        let path_ref = path.as_ref();
        let to_err = |source: std::io::Error| ParamError::Io {
            path: path_ref.display().to_string(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path_ref).map_err(to_err)?);
        self.write_to(&mut writer).map_err(to_err)?;
        writer.flush().map_err(to_err)
    }

    /// Checks the physical and geometric constraints the engine relies on.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.scanner_width == 0 || self.scanner_height == 0 {
            return Err(ParamError::Invalid("scanner dimensions must be positive".into()));
        }
        if self.epidermis_thickness < 0.0 || self.dermis_thickness < 0.0 {
            return Err(ParamError::Invalid("layer thicknesses must be non-negative".into()));
        }
        if self.num_photon_counters == 0 {
            return Err(ParamError::Invalid("NUM_PHOTON_COUNTERS must be greater than 0".into()));
        }
        if !(self.photon_detector_width > 0.0) {
            return Err(ParamError::Invalid("PHOTON_DETECTOR_WIDTH must be positive".into()));
        }
        if !(self.photon_speed > 0.0) {
            return Err(ParamError::Invalid("PHOTON_SPEED must be positive".into()));
        }
        if self.photon_min_emission_angle > self.photon_max_emission_angle {
            return Err(ParamError::Invalid(
                "PHOTON_MIN_EMISSION_ANGLE must not exceed PHOTON_MAX_EMISSION_ANGLE".into(),
            ));
        }
        let probabilities = [
            ("EPIDERMIS_PHOTON_ABSORPTION_PROBABILITY", self.epidermis_photon_absorption_probability),
            ("EPIDERMIS_PHOTON_SCATTER_PROBABILITY", self.epidermis_photon_scatter_probability),
            ("DERMIS_PHOTON_ABSORPTION_PROBABILITY", self.dermis_photon_absorption_probability),
            ("DERMIS_PHOTON_SCATTER_PROBABILITY", self.dermis_photon_scatter_probability),
            ("NEVUS_PHOTON_ABSORPTION_PROBABILITY", self.nevus_photon_absorption_probability),
            ("NEVUS_PHOTON_SCATTER_PROBABILITY", self.nevus_photon_scatter_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(ParamError::Invalid(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }
        Ok(())
    }

    /// Surface plane: top of the epidermis.
    pub fn epidermis_y(&self) -> f32 {
        self.epidermis_thickness + self.dermis_thickness
    }

    /// Boundary between epidermis and dermis.
    pub fn dermis_y(&self) -> f32 {
        self.dermis_thickness
    }

    /// Center of the hemispherical photon source resting on the surface.
    pub fn source_center(&self) -> Vec2 {
        Vec2::new(
            self.photon_source_x + self.photon_source_radius,
            self.photon_source_radius + self.epidermis_y(),
        )
    }

    /// Surface-side edge of the lesion.
    pub fn lesion_top_y(&self) -> f32 {
        self.epidermis_y() - self.nevus_epidermis_depth
    }

    pub fn epidermis_optics(&self) -> LayerOptics {
        LayerOptics {
            absorption_probability: self.epidermis_photon_absorption_probability,
            scatter_probability: self.epidermis_photon_scatter_probability,
            scatter_angle_mean: self.epidermis_photon_scatter_angle_zero_mean,
            scatter_angle_sigma: self.epidermis_photon_scatter_angle_sigma,
        }
    }

    pub fn dermis_optics(&self) -> LayerOptics {
        LayerOptics {
            absorption_probability: self.dermis_photon_absorption_probability,
            scatter_probability: self.dermis_photon_scatter_probability,
            scatter_angle_mean: self.dermis_photon_scatter_angle_zero_mean,
            scatter_angle_sigma: self.dermis_photon_scatter_angle_sigma,
        }
    }

    pub fn nevus_optics(&self) -> LayerOptics {
        LayerOptics {
            absorption_probability: self.nevus_photon_absorption_probability,
            scatter_probability: self.nevus_photon_scatter_probability,
            scatter_angle_mean: self.nevus_photon_scatter_angle_zero_mean,
            scatter_angle_sigma: self.nevus_photon_scatter_angle_sigma,
        }
    }
}
