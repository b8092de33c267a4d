//! Unit reference preprocessing and technology categorisation.
//!
//! Categories come from an ordered rule table evaluated top to bottom; the first
//! matching rule wins and a unit matching no rule is categorised by its fuel.

use bidstack_core::raw::RawUnitInfo;
use bidstack_core::{DispatchDirection, Error, Region, Result, UnitInfo};
use tracing::{debug, warn};

/// Placeholder for a missing descriptor.
pub const UNKNOWN_DESCRIPTOR: &str = "-";

/// Condition on one descriptor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Always matches.
    Any,
    /// Equals one of the listed values.
    OneOf(&'static [&'static str]),
    /// Contains the substring.
    Contains(&'static str),
}

impl Matcher {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::OneOf(values) => values.contains(&value),
            Matcher::Contains(needle) => value.contains(needle),
        }
    }
}

/// What a matching rule assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// A fixed category name.
    Named(&'static str),
    /// The unit's fuel source descriptor.
    Fuel,
}

/// One row of the categorisation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub fuel: Matcher,
    pub technology: Matcher,
    pub direction: Option<DispatchDirection>,
    pub category: Category,
}

impl CategoryRule {
    const fn new(
        fuel: Matcher,
        technology: Matcher,
        direction: Option<DispatchDirection>,
        category: Category,
    ) -> Self {
        Self {
            fuel,
            technology,
            direction,
            category,
        }
    }

    pub fn matches(&self, fuel: &str, technology: &str, direction: DispatchDirection) -> bool {
        self.fuel.matches(fuel)
            && self.technology.matches(technology)
            && self.direction.map_or(true, |d| d == direction)
    }
}

const BATTERY: &[&str] = &["Battery", "Battery and Inverter"];
const GAS_FUELS: &[&str] = &["Natural Gas / Fuel Oil", "Natural Gas"];

/// Ordered categorisation rules.
///
/// Rule 4 shadows "Hydro - Gravity" in rule 5, so rule 5 only ever matches "Run of River".
pub const CATEGORY_RULES: [CategoryRule; 12] = [
    CategoryRule::new(
        Matcher::OneOf(&["Solar", "Wind", "Black Coal", "Brown Coal"]),
        Matcher::Any,
        None,
        Category::Fuel,
    ),
    CategoryRule::new(
        Matcher::Any,
        Matcher::OneOf(BATTERY),
        Some(DispatchDirection::Load),
        Category::Named("Battery Charge"),
    ),
    CategoryRule::new(Matcher::Any, Matcher::OneOf(BATTERY), None, Category::Named("Battery Discharge")),
    CategoryRule::new(Matcher::Any, Matcher::OneOf(&["Hydro - Gravity"]), None, Category::Named("Hydro")),
    CategoryRule::new(
        Matcher::Any,
        Matcher::OneOf(&["Hydro - Gravity", "Run of River"]),
        None,
        Category::Named("Run of River Hydro"),
    ),
    CategoryRule::new(
        Matcher::Any,
        Matcher::OneOf(&["Pump Storage"]),
        Some(DispatchDirection::Load),
        Category::Named("Pump Storage Charge"),
    ),
    CategoryRule::new(
        Matcher::Any,
        Matcher::OneOf(&["Pump Storage"]),
        None,
        Category::Named("Pump Storage Discharge"),
    ),
    CategoryRule::new(
        Matcher::OneOf(&[UNKNOWN_DESCRIPTOR]),
        Matcher::OneOf(&[UNKNOWN_DESCRIPTOR]),
        Some(DispatchDirection::Load),
        Category::Named("Pump Storage Charge"),
    ),
    CategoryRule::new(
        Matcher::Any,
        Matcher::OneOf(&["Open Cycle Gas turbines (OCGT)"]),
        None,
        Category::Named("OCGT"),
    ),
    CategoryRule::new(
        Matcher::Any,
        Matcher::OneOf(&["Combined Cycle Gas Turbine (CCGT)"]),
        None,
        Category::Named("CCGT"),
    ),
    CategoryRule::new(
        Matcher::OneOf(GAS_FUELS),
        Matcher::OneOf(&["Steam Sub-Critical"]),
        None,
        Category::Named("Gas Thermal"),
    ),
    CategoryRule::new(Matcher::Any, Matcher::Contains("Engine"), None, Category::Named("Engine")),
];

/// Categorise a unit from its descriptors.
pub fn categorise(fuel: &str, technology: &str, direction: DispatchDirection) -> String {
    let category = CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(fuel, technology, direction))
        .map_or(Category::Fuel, |rule| rule.category);
    match category {
        Category::Named(name) => name.to_string(),
        Category::Fuel => fuel.to_string(),
    }
}

/// Builds the unit reference table from registration entries.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    excluded_units: Vec<String>,
}

impl UnitCatalog {
    /// Create a catalog that drops the given placeholder units.
    pub fn new(excluded_units: Vec<String>) -> Self {
        Self { excluded_units }
    }

    /// Preprocess one registration entry.
    ///
    /// Missing descriptors become "-" and the region loses its market suffix.
    pub fn prepare_unit(&self, raw: &RawUnitInfo) -> Result<UnitInfo> {
        let region: Region = raw.region.parse().map_err(|_| {
            Error::data(format!("unit {} has unknown region '{}'", raw.unit_id, raw.region))
        })?;
        let direction: DispatchDirection = raw.dispatch_type.parse().map_err(|_| {
            Error::data(format!(
                "unit {} has unknown dispatch type '{}'",
                raw.unit_id, raw.dispatch_type
            ))
        })?;
        let fuel_source = descriptor(raw.fuel_source.as_deref());
        let technology = descriptor(raw.technology.as_deref());
        let category = categorise(&fuel_source, &technology, direction);

        Ok(UnitInfo {
            unit_id: raw.unit_id.clone(),
            region,
            direction,
            fuel_source,
            technology,
            category,
            station_name: raw.station_name.clone(),
        })
    }

    /// Preprocess the whole registration table.
    ///
    /// Excluded units are removed; entries with an unknown region or dispatch type
    /// are skipped with a warning.
    pub fn prepare(&self, raw_units: &[RawUnitInfo]) -> Vec<UnitInfo> {
        let units: Vec<UnitInfo> = raw_units
            .iter()
            .filter(|u| !self.excluded_units.contains(&u.unit_id))
            .filter_map(|u| match self.prepare_unit(u) {
                Ok(unit) => Some(unit),
                Err(e) => {
                    warn!("skipping unit reference entry: {e}");
                    None
                }
            })
            .collect();
        debug!(raw = raw_units.len(), prepared = units.len(), "prepared unit reference");
        units
    }
}

fn descriptor(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN_DESCRIPTOR).to_string()
}
