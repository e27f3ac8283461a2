use std::sync::Arc;

use tracing::{debug, info};

use super::analysis::build_aggregates;
use super::config::ScenarioConfig;
use super::error::SimError;
use super::government::{Government, TransferRule};
use super::income::IncomeModel;
use super::sampling::{DistributionRegistry, SimRng};
use super::tax::TaxCalculator;
use super::types::{EducationLevel, Person, Region, Sex, SimulationResult, YearAggregates};
use super::wealth::WealthModel;

pub struct SimulationContext {
    pub income_model: IncomeModel,
    pub wealth_model: WealthModel,
    pub tax_calculator: TaxCalculator,
    pub transfer_rule: Box<dyn TransferRule>,
    pub rng: SimRng,
}

/// Each phase finishes for the whole population before the next starts.
/// Transfers are paid after taxes are fixed, so they enter this year's net
/// income and wealth but are not taxed until the following year.
pub fn run_single_year(
    ctx: &mut SimulationContext,
    persons: &mut [Person],
    government: &mut Government,
    year: i32,
    scenario: &ScenarioConfig,
) -> Result<(), SimError> {
    debug!(year, "sampling income");
    for person in persons.iter_mut() {
        ctx.income_model.sample_labor_income(person, &mut ctx.rng)?;
        ctx.income_model.sample_capital_income(person, &mut ctx.rng)?;
        person.compute_total_gross_income();
    }

    debug!(year, "applying taxes");
    for person in persons.iter_mut() {
        let tax_result = ctx.tax_calculator.compute_all_taxes(person);
        person.apply_tax_result(tax_result);
    }

    government.collect_taxes_from_population(persons);
    let overrides = &scenario.government.policy_overrides;
    government.allocate_expenditure((!overrides.is_empty()).then_some(overrides));
    debug!(
        year,
        revenue = government.total_revenue,
        "revenue collected and allocated"
    );

    government.pay_transfers(persons, ctx.transfer_rule.as_ref());
    for person in persons.iter_mut() {
        person.compute_total_gross_income();
        person.recompute_net_income();
    }

    debug!(year, "evolving wealth");
    for person in persons.iter_mut() {
        ctx.wealth_model
            .evolve_wealth(person, &mut ctx.rng, &scenario.macro_params)?;
    }

    government.apply_fiscal_rules();
    Ok(())
}

pub fn default_population(size: usize) -> Vec<Person> {
    (0..size)
        .map(|idx| {
            Person::new(
                30 + (idx % 40) as u32,
                Sex::ALL[idx % Sex::ALL.len()],
                EducationLevel::ALL[idx % EducationLevel::ALL.len()],
                Region::ALL[idx % Region::ALL.len()],
            )
        })
        .collect()
}

pub struct SimulationController {
    scenario: ScenarioConfig,
    ctx: SimulationContext,
    persons: Option<Vec<Person>>,
    government: Option<Government>,
}

impl SimulationController {
    pub fn new(
        scenario: ScenarioConfig,
        registry: Arc<DistributionRegistry>,
        transfer_rule: Option<Box<dyn TransferRule>>,
        rng: SimRng,
    ) -> Result<Self, SimError> {
        let transfer_rule = transfer_rule.ok_or(SimError::MissingTransferRule)?;
        let ctx = SimulationContext {
            income_model: IncomeModel::new(Arc::clone(&registry)),
            wealth_model: WealthModel::new(registry),
            tax_calculator: TaxCalculator::new(scenario.tax),
            transfer_rule,
            rng,
        };
        Ok(Self {
            scenario,
            ctx,
            persons: None,
            government: None,
        })
    }

    pub fn with_persons(mut self, persons: Vec<Person>) -> Self {
        self.persons = Some(persons);
        self
    }

    pub fn with_government(mut self, government: Government) -> Self {
        self.government = Some(government);
        self
    }

    pub fn persons(&self) -> &[Person] {
        self.persons.as_deref().unwrap_or(&[])
    }

    pub fn government(&self) -> Option<&Government> {
        self.government.as_ref()
    }

    fn synthesize_population(&mut self) -> Result<Vec<Person>, SimError> {
        let mut persons = default_population(self.scenario.population.synthetic_n);
        if self.scenario.population.initialise_wealth {
            for person in persons.iter_mut() {
                self.ctx
                    .wealth_model
                    .initialise_wealth(person, &mut self.ctx.rng)?;
            }
        }
        Ok(persons)
    }

    pub fn run(&mut self) -> Result<SimulationResult, SimError> {
        let mut persons = match self.persons.take() {
            Some(persons) => persons,
            None => self.synthesize_population()?,
        };
        let mut government = self.government.take().unwrap_or_else(|| {
            Government::from_config(
                &self.scenario.government,
                self.scenario.macro_params.initial_gdp,
            )
        });

        info!(
            scenario = %self.scenario.name,
            start_year = self.scenario.start_year,
            years = self.scenario.years,
            population = persons.len(),
            "simulation starting"
        );
        let yearly = self.run_years(&mut persons, &mut government);
        self.persons = Some(persons);
        self.government = Some(government);
        let yearly = yearly?;
        info!(scenario = %self.scenario.name, "simulation finished");

        Ok(SimulationResult {
            scenario_name: self.scenario.name.clone(),
            start_year: self.scenario.start_year,
            years: self.scenario.years,
            reference_year: self.scenario.reference_year(),
            yearly,
        })
    }

    fn run_years(
        &mut self,
        persons: &mut [Person],
        government: &mut Government,
    ) -> Result<Vec<YearAggregates>, SimError> {
        let mut yearly = Vec::with_capacity(self.scenario.years as usize);
        let mut current_year = self.scenario.start_year;
        for _ in 0..self.scenario.years {
            run_single_year(
                &mut self.ctx,
                persons,
                government,
                current_year,
                &self.scenario,
            )?;
            let aggregates = build_aggregates(persons, government, current_year);
            info!(
                year = current_year,
                revenue = aggregates.government_revenue,
                deficit = aggregates.government_deficit,
                debt = aggregates.government_debt,
                gini = aggregates.gini_net_income,
                "year complete"
            );
            yearly.push(aggregates);
            government.grow_gdp(&self.scenario.macro_params);
            current_year += 1;
        }
        Ok(yearly)
    }
}
