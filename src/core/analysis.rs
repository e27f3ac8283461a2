use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::government::Government;
use super::types::{IncomeSource, Person, YearAggregates};

pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let mut total_weight = 0.0;
    let mut total_value = 0.0;
    for (value, weight) in values.iter().zip(weights) {
        total_weight += weight;
        total_value += value * weight;
    }
    if total_weight == 0.0 {
        return 0.0;
    }
    total_value / total_weight
}

/// Weighted Gini coefficient. Degenerate inputs (no observations, zero
/// total weight, zero mean) and populations with a single distinct value
/// yield exactly 0.0.
pub fn gini(values: &[f64], weights: &[f64]) -> f64 {
    let mut pairs = values
        .iter()
        .copied()
        .zip(weights.iter().copied())
        .collect::<Vec<_>>();
    if pairs.is_empty() {
        return 0.0;
    }

    let total_weight: f64 = pairs.iter().map(|(_, weight)| weight).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let mean = pairs.iter().map(|(value, weight)| value * weight).sum::<f64>() / total_weight;
    if mean == 0.0 {
        return 0.0;
    }

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    if pairs.first().map(|p| p.0) == pairs.last().map(|p| p.0) {
        return 0.0;
    }
    let mut cumulative_weight = 0.0;
    let mut numerator = 0.0;
    for (value, weight) in pairs {
        cumulative_weight += weight;
        numerator += weight * (2.0 * cumulative_weight - total_weight - weight) * value;
    }
    numerator / (total_weight * total_weight * mean)
}

pub fn aggregate_by_group<K, G, V>(persons: &[Person], group: G, value: V) -> BTreeMap<K, f64>
where
    K: Ord,
    G: Fn(&Person) -> K,
    V: Fn(&Person) -> f64,
{
    let mut grouped: BTreeMap<K, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for person in persons {
        let (values, weights) = grouped.entry(group(person)).or_default();
        values.push(value(person));
        weights.push(person.weight);
    }
    grouped
        .into_iter()
        .map(|(key, (values, weights))| (key, weighted_mean(&values, &weights)))
        .collect()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGroup {
    Sex,
    Education,
    Region,
    Age,
}

impl PersonGroup {
    pub fn key(self, person: &Person) -> String {
        match self {
            PersonGroup::Sex => person.sex.label().to_string(),
            PersonGroup::Education => person.education.label().to_string(),
            PersonGroup::Region => person.region.label().to_string(),
            PersonGroup::Age => person.age.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonMetric {
    LaborIncome,
    CapitalIncome,
    Transfers,
    TotalIncome,
    Taxes,
    SocialContrib,
    NetIncome,
    NetWealth,
}

impl PersonMetric {
    pub fn value(self, person: &Person) -> f64 {
        match self {
            PersonMetric::LaborIncome => IncomeSource::Labor.amount(person),
            PersonMetric::CapitalIncome => IncomeSource::Capital.amount(person),
            PersonMetric::Transfers => IncomeSource::Transfers.amount(person),
            PersonMetric::TotalIncome => person.total_income,
            PersonMetric::Taxes => person.taxes,
            PersonMetric::SocialContrib => person.social_contrib,
            PersonMetric::NetIncome => person.net_income,
            PersonMetric::NetWealth => person.net_wealth,
        }
    }
}

pub fn aggregate_by(
    persons: &[Person],
    group: PersonGroup,
    metric: PersonMetric,
) -> BTreeMap<String, f64> {
    aggregate_by_group(persons, |p| group.key(p), |p| metric.value(p))
}

pub fn build_aggregates(persons: &[Person], government: &Government, year: i32) -> YearAggregates {
    let weights = persons.iter().map(|p| p.weight).collect::<Vec<_>>();
    let net_incomes = persons.iter().map(|p| p.net_income).collect::<Vec<_>>();

    YearAggregates {
        year,
        population: weights.iter().sum(),
        total_gross_income: persons.iter().map(|p| p.total_income * p.weight).sum(),
        total_net_income: persons.iter().map(|p| p.net_income * p.weight).sum(),
        total_taxes: persons
            .iter()
            .map(|p| (p.taxes + p.social_contrib) * p.weight)
            .sum(),
        avg_net_income: weighted_mean(&net_incomes, &weights),
        gini_net_income: gini(&net_incomes, &weights),
        government_revenue: government.total_revenue,
        government_deficit: government.deficit,
        government_debt: government.debt,
    }
}
