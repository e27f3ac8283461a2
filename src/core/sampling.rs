use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand_distr::{LogNormal, Normal};
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, SamplingError, SimError};

pub type SimRng = StdRng;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Bool(v) => write!(f, "{v}"),
            ConditionValue::Int(v) => write!(f, "{v}"),
            ConditionValue::Float(v) => write!(f, "{v}"),
            ConditionValue::Text(v) => write!(f, "{v}"),
        }
    }
}

pub type Conditions = BTreeMap<String, ConditionValue>;

fn describe_conditions(conditions: &Conditions) -> String {
    let parts = conditions
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>();
    format!("{{{}}}", parts.join(", "))
}

pub trait Sampler: Send + Sync {
    fn sample(&self, rng: &mut SimRng, conditions: Option<&Conditions>)
    -> Result<f64, SamplingError>;
}

type SampleFn = dyn Fn(&mut SimRng, Option<&Conditions>) -> f64 + Send + Sync;

pub struct FnSampler(Box<SampleFn>);

impl FnSampler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut SimRng, Option<&Conditions>) -> f64 + Send + Sync + 'static,
    {
        Self(Box::new(f))
    }
}

impl Sampler for FnSampler {
    fn sample(
        &self,
        rng: &mut SimRng,
        conditions: Option<&Conditions>,
    ) -> Result<f64, SamplingError> {
        Ok((self.0)(rng, conditions))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalRecord {
    pub value: f64,
    #[serde(default)]
    pub conditions: Conditions,
}

impl EmpiricalRecord {
    fn matches(&self, conditions: &Conditions) -> bool {
        conditions
            .iter()
            .all(|(key, value)| self.conditions.get(key) == Some(value))
    }
}

/// Draws uniformly among the records matching every supplied condition.
#[derive(Debug, Clone, Default)]
pub struct EmpiricalDistribution {
    records: Vec<EmpiricalRecord>,
}

impl EmpiricalDistribution {
    pub fn new(records: Vec<EmpiricalRecord>) -> Self {
        Self { records }
    }
}

impl Sampler for EmpiricalDistribution {
    fn sample(
        &self,
        rng: &mut SimRng,
        conditions: Option<&Conditions>,
    ) -> Result<f64, SamplingError> {
        if self.records.is_empty() {
            return Err(SamplingError::EmptyTable);
        }
        let conditions = match conditions {
            Some(conditions) if !conditions.is_empty() => conditions,
            _ => {
                return self
                    .records
                    .choose(rng)
                    .map(|record| record.value)
                    .ok_or(SamplingError::EmptyTable);
            }
        };

        let candidates = self
            .records
            .iter()
            .filter(|record| record.matches(conditions))
            .collect::<Vec<_>>();
        candidates
            .choose(rng)
            .map(|record| record.value)
            .ok_or_else(|| SamplingError::NoMatchingRecord(describe_conditions(conditions)))
    }
}

/// Closed-form families; conditions are ignored.
#[derive(Debug, Clone)]
pub enum ParametricDistribution {
    Constant(f64),
    Uniform(Uniform<f64>),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
}

impl Sampler for ParametricDistribution {
    fn sample(
        &self,
        rng: &mut SimRng,
        _conditions: Option<&Conditions>,
    ) -> Result<f64, SamplingError> {
        let value = match self {
            ParametricDistribution::Constant(value) => *value,
            ParametricDistribution::Uniform(dist) => dist.sample(rng),
            ParametricDistribution::Normal(dist) => dist.sample(rng),
            ParametricDistribution::LogNormal(dist) => dist.sample(rng),
        };
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionSpec {
    Constant { value: f64 },
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Empirical { records: Vec<EmpiricalRecord> },
}

impl DistributionSpec {
    fn build(&self) -> Result<Box<dyn Sampler>, SamplingError> {
        let invalid = |e: &dyn fmt::Display| SamplingError::InvalidParameters(e.to_string());
        let sampler: Box<dyn Sampler> = match self {
            DistributionSpec::Constant { value } => {
                if !value.is_finite() {
                    return Err(SamplingError::InvalidParameters(format!(
                        "constant must be finite, got {value}"
                    )));
                }
                Box::new(ParametricDistribution::Constant(*value))
            }
            DistributionSpec::Uniform { low, high } => Box::new(ParametricDistribution::Uniform(
                Uniform::new_inclusive(*low, *high).map_err(|e| invalid(&e))?,
            )),
            DistributionSpec::Normal { mean, std_dev } => Box::new(
                ParametricDistribution::Normal(
                    Normal::new(*mean, *std_dev).map_err(|e| invalid(&e))?,
                ),
            ),
            DistributionSpec::LogNormal { mu, sigma } => Box::new(
                ParametricDistribution::LogNormal(
                    LogNormal::new(*mu, *sigma).map_err(|e| invalid(&e))?,
                ),
            ),
            DistributionSpec::Empirical { records } => {
                Box::new(EmpiricalDistribution::new(records.clone()))
            }
        };
        Ok(sampler)
    }
}

pub type DistributionCatalog = BTreeMap<String, DistributionSpec>;

pub fn parse_catalog(yaml: &str) -> Result<DistributionCatalog, ConfigError> {
    Ok(serde_yml::from_str(yaml)?)
}

pub fn load_catalog(path: &Path) -> Result<DistributionCatalog, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_catalog(&contents)
}

#[derive(Default)]
pub struct DistributionRegistry {
    samplers: HashMap<String, Box<dyn Sampler>>,
}

impl fmt::Debug for DistributionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.samplers.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("DistributionRegistry")
            .field("names", &names)
            .finish()
    }
}

impl DistributionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: &DistributionCatalog) -> Result<Self, SimError> {
        let mut registry = Self::new();
        for (name, spec) in catalog {
            registry.register_spec(name, spec)?;
        }
        Ok(registry)
    }

    pub fn register<F>(&mut self, name: &str, sampler: F)
    where
        F: Fn(&mut SimRng, Option<&Conditions>) -> f64 + Send + Sync + 'static,
    {
        self.register_sampler(name, FnSampler::new(sampler));
    }

    pub fn register_empirical(&mut self, name: &str, records: Vec<EmpiricalRecord>) {
        self.register_sampler(name, EmpiricalDistribution::new(records));
    }

    pub fn register_spec(&mut self, name: &str, spec: &DistributionSpec) -> Result<(), SimError> {
        let sampler = spec.build().map_err(|source| SimError::Domain {
            name: name.to_string(),
            source,
        })?;
        self.samplers.insert(name.to_string(), sampler);
        Ok(())
    }

    pub fn register_sampler<S: Sampler + 'static>(&mut self, name: &str, sampler: S) {
        self.samplers.insert(name.to_string(), Box::new(sampler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samplers.contains_key(name)
    }

    pub fn sample(
        &self,
        name: &str,
        rng: &mut SimRng,
        conditions: Option<&Conditions>,
    ) -> Result<f64, SimError> {
        let sampler = self
            .samplers
            .get(name)
            .ok_or_else(|| SimError::Lookup(name.to_string()))?;
        sampler
            .sample(rng, conditions)
            .map_err(|source| SimError::Domain {
                name: name.to_string(),
                source,
            })
    }
}
