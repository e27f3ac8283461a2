use serde::{Deserialize, Serialize};

use super::sampling::{ConditionValue, Conditions};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Other];

    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Low,
    Medium,
    High,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 3] = [
        EducationLevel::Low,
        EducationLevel::Medium,
        EducationLevel::High,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EducationLevel::Low => "low",
            EducationLevel::Medium => "medium",
            EducationLevel::High => "high",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    North,
    South,
    East,
    West,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::North, Region::South, Region::East, Region::West];

    pub fn label(self) -> &'static str {
        match self {
            Region::North => "north",
            Region::South => "south",
            Region::East => "east",
            Region::West => "west",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovFunction {
    Education,
    SocialProtection,
    Defence,
    Health,
    Housing,
}

impl GovFunction {
    pub fn label(self) -> &'static str {
        match self {
            GovFunction::Education => "education",
            GovFunction::SocialProtection => "social_protection",
            GovFunction::Defence => "defence",
            GovFunction::Health => "health",
            GovFunction::Housing => "housing",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeSource {
    Labor,
    Capital,
    Transfers,
}

impl IncomeSource {
    pub fn amount(self, person: &Person) -> f64 {
        match self {
            IncomeSource::Labor => person.labor_income,
            IncomeSource::Capital => person.capital_income,
            IncomeSource::Transfers => person.transfers,
        }
    }
}

/// `total_income`, `net_income` and `net_wealth` are stored, not derived:
/// after mutating their inputs call the matching `compute_*`/`recompute_*`
/// method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub age: u32,
    pub sex: Sex,
    pub education: EducationLevel,
    pub region: Region,
    pub labor_income: f64,
    pub capital_income: f64,
    pub transfers: f64,
    pub total_income: f64,
    pub taxes: f64,
    pub social_contrib: f64,
    pub net_income: f64,
    pub liquid_assets: f64,
    pub illiquid_assets: f64,
    pub debt: f64,
    pub stocks: f64,
    pub net_wealth: f64,
    pub weight: f64,
}

impl Person {
    pub fn new(age: u32, sex: Sex, education: EducationLevel, region: Region) -> Self {
        Self {
            age,
            sex,
            education,
            region,
            labor_income: 0.0,
            capital_income: 0.0,
            transfers: 0.0,
            total_income: 0.0,
            taxes: 0.0,
            social_contrib: 0.0,
            net_income: 0.0,
            liquid_assets: 0.0,
            illiquid_assets: 0.0,
            debt: 0.0,
            stocks: 0.0,
            net_wealth: 0.0,
            weight: 1.0,
        }
    }

    pub fn conditions(&self) -> Conditions {
        let mut conditions = Conditions::new();
        conditions.insert("age".to_string(), ConditionValue::Int(i64::from(self.age)));
        conditions.insert(
            "sex".to_string(),
            ConditionValue::Text(self.sex.label().to_string()),
        );
        conditions.insert(
            "education".to_string(),
            ConditionValue::Text(self.education.label().to_string()),
        );
        conditions.insert(
            "region".to_string(),
            ConditionValue::Text(self.region.label().to_string()),
        );
        conditions
    }

    pub fn compute_total_gross_income(&mut self) -> f64 {
        self.total_income = self.labor_income + self.capital_income + self.transfers;
        self.total_income
    }

    pub fn apply_tax_result(&mut self, result: TaxResult) {
        self.taxes = result.income_tax + result.capital_tax;
        self.social_contrib = result.social_contrib;
        let gross_income = if self.total_income == 0.0 {
            self.compute_total_gross_income()
        } else {
            self.total_income
        };
        self.net_income = gross_income - self.taxes - self.social_contrib;
    }

    pub fn recompute_net_income(&mut self) -> f64 {
        self.net_income = self.total_income - self.taxes - self.social_contrib;
        self.net_income
    }

    pub fn recompute_net_wealth(&mut self) -> f64 {
        self.net_wealth = self.liquid_assets + self.illiquid_assets + self.stocks - self.debt;
        self.net_wealth
    }

    pub fn update_wealth(
        &mut self,
        savings_rate: f64,
        labor_return_rate: f64,
        capital_return_rate: f64,
    ) {
        let savings = self.net_income * savings_rate;
        let labor_return = self.liquid_assets * labor_return_rate;
        let capital_return = self.illiquid_assets * capital_return_rate;
        self.liquid_assets += savings + labor_return;
        self.illiquid_assets += capital_return;
        self.recompute_net_wealth();
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TaxResult {
    pub income_tax: f64,
    pub social_contrib: f64,
    pub capital_tax: f64,
}

impl TaxResult {
    pub fn total(self) -> f64 {
        self.income_tax + self.social_contrib + self.capital_tax
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearAggregates {
    pub year: i32,
    pub population: f64,
    pub total_gross_income: f64,
    pub total_net_income: f64,
    pub total_taxes: f64,
    pub avg_net_income: f64,
    pub gini_net_income: f64,
    pub government_revenue: f64,
    pub government_deficit: f64,
    pub government_debt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub scenario_name: String,
    pub start_year: i32,
    pub years: u32,
    pub reference_year: Option<i32>,
    pub yearly: Vec<YearAggregates>,
}
