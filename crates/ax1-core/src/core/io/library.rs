use crate::core::models::material::{CrossSections, GroupConstants, Material};
use crate::core::physics::eos::{HeatCapacity, LinearEos};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Neutrons per fission assumed when only `nu-sigma-f` is given.
const DEFAULT_NU: f64 = 2.5;

#[derive(Debug, Error)]
pub enum LibraryError {
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
    #[error("Material '{0}' is not defined in the library")]
    UnknownMaterial(String),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GroupDefinition {
    pub nu_sigma_f: f64,
    pub sigma_f: Option<f64>,
    pub nu: Option<f64>,
    pub sigma_tr: f64,
    #[serde(default)]
    pub chi: f64,
    pub velocity: f64,
}

impl GroupDefinition {
    fn to_constants(&self) -> GroupConstants {
        let sigma_f = self.sigma_f.unwrap_or_else(|| {
            let nu = self.nu.unwrap_or(DEFAULT_NU);
            if nu > 0.0 { self.nu_sigma_f / nu } else { 0.0 }
        });
        GroupConstants {
            nu_sigma_f: self.nu_sigma_f,
            sigma_f,
            sigma_tr: self.sigma_tr,
            chi: self.chi,
            velocity: self.velocity,
        }
    }
}

/// One material as written in a deck or library file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MaterialDefinition {
    #[serde(default = "default_rolab")]
    pub rolab: f64,
    pub eos: LinearEos,
    pub heat_capacity: HeatCapacity,
    pub groups: Vec<GroupDefinition>,
    /// `scatter[from][to]`, barns.
    pub scatter: Vec<Vec<f64>>,
}

fn default_rolab() -> f64 {
    1.0
}

impl MaterialDefinition {
    pub fn to_material(&self, name: &str) -> Material {
        Material {
            name: name.to_string(),
            eos: self.eos,
            heat_capacity: self.heat_capacity,
            cross_sections: CrossSections::new(
                self.groups.iter().map(GroupDefinition::to_constants).collect(),
                self.scatter.clone(),
            ),
            rolab: self.rolab,
        }
    }
}

/// A named collection of material definitions loaded from TOML.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct MaterialLibrary {
    pub definitions: BTreeMap<String, MaterialDefinition>,
}

impl MaterialLibrary {
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let content = std::fs::read_to_string(path).map_err(|e| LibraryError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| LibraryError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Adds every definition of `other`, replacing same-named entries.
    pub fn extend(&mut self, other: MaterialLibrary) {
        self.definitions.extend(other.definitions);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Material, LibraryError> {
        self.definitions
            .get(name)
            .map(|def| def.to_material(name))
            .ok_or_else(|| LibraryError::UnknownMaterial(name.to_string()))
    }
}
