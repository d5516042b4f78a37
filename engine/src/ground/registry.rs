//! Ground model registry
//!
//! Owns every named surface for the session. Config streams are applied in
//! two passes: the first declares or updates each section, the second
//! resolves `base = <name>` by copying the base record and re-applying the
//! section's own keys on top.
//!
//! # Example
//!
//! ```ignore
//! use terrain_collisions_engine::ground::GroundModelRegistry;
//!
//! let mut registry = GroundModelRegistry::builtin()?;
//! registry.load_str("[general]\nversion = 3\n[mossy]\nbase = grass\nstrength = 0.9\n")?;
//! let mossy = registry.lookup("mossy").unwrap();
//! assert_eq!(registry.get(mossy).map(|gm| gm.strength), Some(0.9));
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::{info, warn};

use super::config::{ConfigEntry, ConfigFile, ConfigSection, parse_colour, parse_int, parse_real};
use super::model::{FxType, GroundModel, GroundModelId};
use crate::error::ConfigError;

/// Ground model config version this loader understands.
pub const LATEST_VERSION: i32 = 3;
/// Surface used when no material is known (collision boxes, unnamed meshes).
pub const DEFAULT_SOLID_NAME: &str = "concrete";
/// Fallback terrain surface when landuse has no answer.
pub const DEFAULT_GROUND_NAME: &str = "gravel";

const BUILTIN_GROUND_MODELS: &str = include_str!("ground_models.cfg");

/// Named ground models, read-only once the terrain is loaded.
#[derive(Debug, Clone, Default)]
pub struct GroundModelRegistry {
    models: Vec<GroundModel>,
    by_name: HashMap<String, GroundModelId>,
}

impl GroundModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in surface definitions.
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.load_str(BUILTIN_GROUND_MODELS)?;
        Ok(registry)
    }

    /// Load a config file from disk.
    ///
    /// On any error the registry is left empty.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let count = self.load_str(&text)?;
                info!("Loaded {} ground models from {}", count, path.display());
                Ok(count)
            }
            Err(e) => {
                self.clear();
                Err(e.into())
            }
        }
    }

    /// Load a config stream.
    ///
    /// On any error the registry is left empty.
    pub fn load_reader<R: Read>(&mut self, mut reader: R) -> Result<usize, ConfigError> {
        let mut text = String::new();
        if let Err(e) = reader.read_to_string(&mut text) {
            self.clear();
            return Err(e.into());
        }
        self.load_str(&text)
    }

    /// Apply a config stream held in memory. Returns the number of sections
    /// that declared or updated a ground model.
    ///
    /// On any error the registry is left empty.
    pub fn load_str(&mut self, text: &str) -> Result<usize, ConfigError> {
        let result = self.apply_stream(text);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn apply_stream(&mut self, text: &str) -> Result<usize, ConfigError> {
        let cfg = ConfigFile::parse(text)?;

        let version = read_version(&cfg)?;
        if version != Some(LATEST_VERSION) {
            return Err(ConfigError::VersionMismatch {
                found: version,
                expected: LATEST_VERSION,
            });
        }

        // Pass 1: declare / update every model section
        let model_sections: Vec<&ConfigSection> = cfg
            .sections()
            .iter()
            .filter(|s| !is_general(&s.name))
            .filter(|s| {
                if s.name.is_empty() {
                    warn!("Ground model config: {} entries outside any section ignored", s.entries.len());
                    false
                } else {
                    true
                }
            })
            .collect();

        for section in &model_sections {
            let id = self.declare(&section.name);
            apply_section(&mut self.models[id.index()], section)?;
        }

        // Pass 2: copy-then-override for models declaring a base
        let mut resolved: Vec<String> = Vec::new();
        for section in &model_sections {
            self.resolve_base(section, &model_sections, &mut resolved, &mut Vec::new())?;
        }

        for section in &model_sections {
            if let Some(id) = self.lookup(&section.name) {
                let gm = &self.models[id.index()];
                gm.validate().map_err(|reason| ConfigError::InvalidGroundModel {
                    name: gm.name.clone(),
                    reason,
                })?;
            }
        }

        Ok(model_sections.len())
    }

    fn resolve_base(
        &mut self,
        section: &ConfigSection,
        stream: &[&ConfigSection],
        resolved: &mut Vec<String>,
        visiting: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        if resolved.iter().any(|n| n == &section.name) {
            return Ok(());
        }
        let Some(id) = self.lookup(&section.name) else {
            return Ok(());
        };
        let Some(base_name) = self.models[id.index()].base_name.clone() else {
            resolved.push(section.name.clone());
            return Ok(());
        };
        if visiting.iter().any(|n| n == &section.name) {
            warn!("Ground model '{}': cyclic base chain, base ignored", section.name);
            return Ok(());
        }

        // Resolve a base declared in the same stream first
        if let Some(base_section) = stream.iter().find(|s| s.name == base_name) {
            visiting.push(section.name.clone());
            self.resolve_base(base_section, stream, resolved, visiting)?;
            visiting.pop();
        }

        match self.lookup(&base_name) {
            Some(base_id) if base_id != id => {
                let mut copy = self.models[base_id.index()].clone();
                copy.name = section.name.clone();
                copy.base_name = None;
                apply_section(&mut copy, section)?;
                self.models[id.index()] = copy;
            }
            Some(_) => warn!("Ground model '{}' names itself as base", section.name),
            None => warn!(
                "Ground model '{}': base '{}' is not registered, keeping local values",
                section.name, base_name
            ),
        }
        resolved.push(section.name.clone());
        Ok(())
    }

    fn declare(&mut self, name: &str) -> GroundModelId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = GroundModelId(self.models.len() as u32);
        self.models.push(GroundModel::new(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Handle of a named model.
    pub fn lookup(&self, name: &str) -> Option<GroundModelId> {
        self.by_name.get(name).copied()
    }

    /// Model behind a handle. `None` for a handle this registry never issued
    /// (another registry's, or one from before a `clear`).
    pub fn get(&self, id: GroundModelId) -> Option<&GroundModel> {
        self.models.get(id.index())
    }

    /// Model by name.
    pub fn by_name(&self, name: &str) -> Option<&GroundModel> {
        self.lookup(name).and_then(|id| self.get(id))
    }

    /// `concrete`, if registered.
    pub fn default_solid(&self) -> Option<GroundModelId> {
        self.lookup(DEFAULT_SOLID_NAME)
    }

    /// `gravel`, if registered.
    pub fn default_ground(&self) -> Option<GroundModelId> {
        self.lookup(DEFAULT_GROUND_NAME)
    }

    /// Both distinguished defaults, or the name of the missing one.
    pub fn require_defaults(&self) -> Result<(GroundModelId, GroundModelId), ConfigError> {
        let solid = self
            .default_solid()
            .ok_or_else(|| ConfigError::MissingDefaultModel(DEFAULT_SOLID_NAME.to_string()))?;
        let ground = self
            .default_ground()
            .ok_or_else(|| ConfigError::MissingDefaultModel(DEFAULT_GROUND_NAME.to_string()))?;
        Ok((solid, ground))
    }

    /// Resolve a name, substituting `fallback` (with a warning) when unknown.
    pub fn lookup_or(&self, name: &str, fallback: GroundModelId) -> GroundModelId {
        self.lookup(name).unwrap_or_else(|| {
            warn!(
                "Ground model '{}' not found, using '{}'",
                name,
                self.get(fallback).map_or("<none>", |gm| gm.name.as_str())
            );
            fallback
        })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate `(handle, model)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (GroundModelId, &GroundModel)> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, gm)| (GroundModelId(i as u32), gm))
    }

    /// Remove every model.
    pub fn clear(&mut self) {
        self.models.clear();
        self.by_name.clear();
    }
}

fn is_general(name: &str) -> bool {
    name == "general" || name == "config"
}

fn read_version(cfg: &ConfigFile) -> Result<Option<i32>, ConfigError> {
    let mut version = None;
    for section in cfg.sections().iter().filter(|s| is_general(&s.name)) {
        for entry in section.entries.iter().filter(|e| e.key == "version") {
            version = Some(parse_int(&section.name, entry)?);
        }
    }
    Ok(version)
}

fn apply_section(gm: &mut GroundModel, section: &ConfigSection) -> Result<(), ConfigError> {
    for entry in &section.entries {
        apply_entry(gm, &section.name, entry)?;
    }
    Ok(())
}

fn apply_entry(gm: &mut GroundModel, section: &str, entry: &ConfigEntry) -> Result<(), ConfigError> {
    let real = || parse_real(section, entry);
    match entry.key.as_str() {
        "adhesion velocity" => gm.va = real()?,
        "static friction coefficient" => gm.ms = real()?,
        "sliding friction coefficient" => gm.mc = real()?,
        "hydrodynamic friction" => gm.t2 = real()?,
        "stribeck velocity" => gm.vs = real()?,
        "alpha" => gm.alpha = real()?,
        "strength" => gm.strength = real()?,
        "base" => gm.base_name = Some(entry.value.clone()),
        "fluid density" => gm.fluid_density = real()?,
        "flow consistency index" => gm.flow_consistency_index = real()?,
        "flow behavior index" => gm.flow_behavior_index = real()?,
        "solid ground level" => gm.solid_ground_level = real()?,
        "drag anisotropy" => gm.drag_anisotropy = real()?,
        "fx_type" => match FxType::from_config(&entry.value) {
            Some(fx) => gm.fx_type = fx,
            None => warn!(
                "Ground model '{}' line {}: unknown fx_type '{}'",
                section, entry.line, entry.value
            ),
        },
        "fx_particle_name" => gm.particle_name = entry.value.clone(),
        "fx_colour" => gm.fx_colour = parse_colour(section, entry)?,
        "fx_particle_amount" => gm.fx_particle_amount = parse_int(section, entry)?,
        "fx_particle_min_velo" => gm.fx_particle_min_velo = real()?,
        "fx_particle_max_velo" => gm.fx_particle_max_velo = real()?,
        "fx_particle_fade" => gm.fx_particle_fade = real()?,
        "fx_particle_timedelta" => gm.fx_particle_timedelta = real()?,
        "fx_particle_velo_factor" => gm.fx_particle_velo_factor = real()?,
        "fx_particle_ttl" => gm.fx_particle_ttl = real()?,
        other => warn!(
            "Ground model '{}' line {}: unknown key '{}' ignored",
            section, entry.line, other
        ),
    }
    Ok(())
}
