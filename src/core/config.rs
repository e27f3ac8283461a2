use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::types::GovFunction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxConfig {
    pub income_tax_rate: f64,
    pub capital_gains_rate: f64,
    pub social_contrib_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernmentSpendingConfig {
    pub spending_shares: BTreeMap<GovFunction, f64>,
    pub deficit_limit: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub policy_overrides: BTreeMap<GovFunction, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    pub total_population: u64,
    pub synthetic_n: usize,
    #[serde(default)]
    pub initialise_wealth: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacroParams {
    pub gdp_growth: f64,
    pub inflation: f64,
    /// Nominal GDP of a freshly created government; 0 disables the deficit clamp.
    #[serde(default)]
    pub initial_gdp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfig {
    pub reference_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,
    pub start_year: i32,
    pub years: u32,
    pub tax: TaxConfig,
    pub government: GovernmentSpendingConfig,
    pub population: PopulationConfig,
    #[serde(rename = "macro")]
    pub macro_params: MacroParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtest: Option<BacktestConfig>,
}

impl ScenarioConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("income_tax_rate", self.tax.income_tax_rate),
            ("capital_gains_rate", self.tax.capital_gains_rate),
            ("social_contrib_rate", self.tax.social_contrib_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { field, value });
            }
        }

        let deficit_limit = self.government.deficit_limit;
        if !deficit_limit.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "deficit_limit",
            });
        }
        if deficit_limit < 0.0 {
            return Err(ConfigError::NegativeDeficitLimit(deficit_limit));
        }
        if self
            .government
            .spending_shares
            .values()
            .chain(self.government.policy_overrides.values())
            .any(|share| !share.is_finite())
        {
            return Err(ConfigError::NonFinite {
                field: "spending_shares",
            });
        }

        if self.population.total_population == 0 || self.population.synthetic_n == 0 {
            return Err(ConfigError::NonPositivePopulation);
        }
        if self.years == 0 {
            return Err(ConfigError::NonPositiveYears);
        }

        for (field, value) in [
            ("gdp_growth", self.macro_params.gdp_growth),
            ("inflation", self.macro_params.inflation),
            ("initial_gdp", self.macro_params.initial_gdp),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        Ok(())
    }

    pub fn reference_year(&self) -> Option<i32> {
        self.backtest.and_then(|backtest| backtest.reference_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASELINE: &str = r#"
name: baseline
start_year: 2020
years: 2
tax:
  income_tax_rate: 0.2
  capital_gains_rate: 0.25
  social_contrib_rate: 0.15
government:
  deficit_limit: 0.03
  spending_shares:
    education: 0.2
    social_protection: 0.5
    defence: 0.1
population:
  total_population: 1000000
  synthetic_n: 1000
macro:
  gdp_growth: 0.02
  inflation: 0.01
"#;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn parses_nested_models() {
        let scenario = ScenarioConfig::parse(BASELINE).expect("valid scenario");

        assert_eq!(scenario.name, "baseline");
        assert_eq!(scenario.years, 2);
        assert_approx(scenario.tax.income_tax_rate, 0.2);
        assert_approx(scenario.government.deficit_limit, 0.03);
        assert_approx(
            scenario.government.spending_shares[&GovFunction::Education],
            0.2,
        );
        assert!(scenario.government.policy_overrides.is_empty());
        assert!(!scenario.population.initialise_wealth);
        assert_approx(scenario.macro_params.initial_gdp, 0.0);
        assert_eq!(scenario.reference_year(), None);
    }

    #[test]
    fn accepts_json_documents() {
        let json = r#"{
          "name": "json",
          "start_year": 2021,
          "years": 1,
          "tax": {"income_tax_rate": 0.1, "capital_gains_rate": 0.2, "social_contrib_rate": 0.05},
          "government": {"deficit_limit": 0.1, "spending_shares": {"health": 1.0}},
          "population": {"total_population": 10, "synthetic_n": 5},
          "macro": {"gdp_growth": 0.01, "inflation": 0.02, "initial_gdp": 500.0},
          "backtest": {"reference_year": 2019}
        }"#;

        let scenario = ScenarioConfig::parse(json).expect("valid scenario");

        assert_eq!(scenario.start_year, 2021);
        assert_eq!(scenario.reference_year(), Some(2019));
        assert_approx(scenario.macro_params.initial_gdp, 500.0);
    }

    #[test]
    fn rejects_extra_keys() {
        let yaml = format!("{BASELINE}unexpected: not allowed\n");
        let err = ScenarioConfig::parse(&yaml).expect_err("must reject extra key");
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn rejects_unknown_government_function() {
        let yaml = BASELINE.replace("defence: 0.1", "space_program: 0.1");
        assert!(matches!(
            ScenarioConfig::parse(&yaml),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn rejects_rate_outside_unit_interval() {
        let yaml = BASELINE.replace("income_tax_rate: 0.2", "income_tax_rate: 1.5");
        let err = ScenarioConfig::parse(&yaml).expect_err("must reject rate");
        assert!(matches!(
            err,
            ConfigError::RateOutOfRange {
                field: "income_tax_rate",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_deficit_limit() {
        let yaml = BASELINE.replace("deficit_limit: 0.03", "deficit_limit: -0.01");
        assert!(matches!(
            ScenarioConfig::parse(&yaml),
            Err(ConfigError::NegativeDeficitLimit(_))
        ));
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let yaml = BASELINE.replace("synthetic_n: 1000", "synthetic_n: 0");
        assert!(matches!(
            ScenarioConfig::parse(&yaml),
            Err(ConfigError::NonPositivePopulation)
        ));

        let yaml = BASELINE.replace("years: 2", "years: 0");
        assert!(matches!(
            ScenarioConfig::parse(&yaml),
            Err(ConfigError::NonPositiveYears)
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ScenarioConfig::from_file(Path::new("/nonexistent/scenario.yaml"))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
