use crate::core::models::element::Element;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LennardJonesParam {
    /// Distance of the potential minimum in Å.
    pub radius: f64,
    /// Depth of the minimum in kJ/mol.
    pub well_depth: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalParams {
    #[serde(default = "default_dielectric")]
    pub dielectric_constant: f64,
    /// Pairs farther apart than this contribute nothing. `None` disables the cutoff.
    #[serde(default)]
    pub cutoff: Option<f64>,
}

fn default_dielectric() -> f64 {
    1.0
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            dielectric_constant: default_dielectric(),
            cutoff: None,
        }
    }
}

/// Per-element Lennard-Jones parameters, keyed by element symbol.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ForcefieldParams {
    #[serde(default)]
    pub globals: GlobalParams,
    pub lj: HashMap<String, LennardJonesParam>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown element '{symbol}' in Lennard-Jones parameters")]
    UnknownElement { symbol: String },
    #[error("No Lennard-Jones parameters for element '{symbol}'")]
    MissingElement { symbol: String },
}

impl ForcefieldParams {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let params: Self = toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        params.check_symbols()?;
        Ok(params)
    }

    fn check_symbols(&self) -> Result<(), ParamLoadError> {
        for symbol in self.lj.keys() {
            if Element::from_symbol(symbol).is_err() {
                return Err(ParamLoadError::UnknownElement {
                    symbol: symbol.clone(),
                });
            }
        }
        Ok(())
    }

    /// Looks up an element, trying the canonical symbol first.
    pub fn get(&self, element: &Element) -> Option<&LennardJonesParam> {
        self.lj.get(element.symbol).or_else(|| {
            self.lj
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(element.symbol))
                .map(|(_, v)| v)
        })
    }

    /// Lorentz-Berthelot mixing: arithmetic mean of radii, geometric mean of well depths.
    pub fn pair(&self, a: &Element, b: &Element) -> Option<LennardJonesParam> {
        let pa = self.get(a)?;
        let pb = self.get(b)?;
        Some(LennardJonesParam {
            radius: 0.5 * (pa.radius + pb.radius),
            well_depth: (pa.well_depth * pb.well_depth).sqrt(),
        })
    }

    /// Fails on the first element that has no parameters.
    pub fn ensure_covers<'a>(
        &self,
        elements: impl IntoIterator<Item = &'a &'static Element>,
    ) -> Result<(), ParamLoadError> {
        for element in elements {
            if self.get(element).is_none() {
                return Err(ParamLoadError::MissingElement {
                    symbol: element.symbol.to_string(),
                });
            }
        }
        Ok(())
    }
}
