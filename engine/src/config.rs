//! Startup configuration: the `key=value` properties file, the
//! hospital JSON, and the patient distribution JSON. Grounded on the
//! config-loading style in `engine-app/src/_teacher_reference/main.rs`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::entry::AdmissionHistogram;
use crate::error::{SimError, SimResult};
use crate::geography::plan::{BuildingJson, HospitalPlan};

/// Parsed `key=value` properties file.
#[derive(Debug, Clone)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn parse(text: &str) -> Properties {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Properties { values }
    }

    pub fn load(path: &Path) -> SimResult<Properties> {
        let text = std::fs::read_to_string(path)?;
        Ok(Properties::parse(&text))
    }

    fn get(&self, key: &'static str) -> SimResult<&str> {
        self.values.get(key).map(|s| s.as_str()).ok_or(SimError::MissingProperty(key))
    }

    fn get_u64(&self, key: &'static str) -> SimResult<u64> {
        self.get(key)?.parse().map_err(|_| SimError::InvalidProperty { key, value: self.values[key].clone() })
    }

    fn get_i32(&self, key: &'static str) -> SimResult<i32> {
        self.get(key)?.parse().map_err(|_| SimError::InvalidProperty { key, value: self.values[key].clone() })
    }

    fn get_f64(&self, key: &'static str) -> SimResult<f64> {
        self.get(key)?.parse().map_err(|_| SimError::InvalidProperty { key, value: self.values[key].clone() })
    }

    fn get_path(&self, key: &'static str) -> SimResult<std::path::PathBuf> {
        Ok(std::path::PathBuf::from(self.get(key)?))
    }
}

/// The required run-time properties, resolved and type-checked
/// once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub stop_at: u64,
    pub seconds_per_tick: u32,
    pub x_process: u32,
    pub y_process: u32,
    pub chair_manager_rank: i32,
    pub reception_manager_rank: i32,
    pub triage_manager_rank: i32,
    pub doctors_manager_rank: i32,
    pub icu_manager_rank: i32,
    pub patients_path: std::path::PathBuf,
    pub plan_path: std::path::PathBuf,
    pub patient_infected_chance: f64,
}

impl RunConfig {
    pub fn from_properties(properties: &Properties) -> SimResult<RunConfig> {
        let chance = properties.get_f64("patient.infected.chance")?;
        if !(0.0..=1.0).contains(&chance) {
            return Err(SimError::ProbabilityOutOfRange { field: "patient.infected.chance", value: chance });
        }
        Ok(RunConfig {
            stop_at: properties.get_u64("stop.at")?,
            seconds_per_tick: properties.get_u64("seconds.per.tick")? as u32,
            x_process: properties.get_u64("x.process")? as u32,
            y_process: properties.get_u64("y.process")? as u32,
            chair_manager_rank: properties.get_i32("chair.manager.rank")?,
            reception_manager_rank: properties.get_i32("reception.manager.rank")?,
            triage_manager_rank: properties.get_i32("triage.manager.rank")?,
            doctors_manager_rank: properties.get_i32("doctors.manager.rank")?,
            icu_manager_rank: properties.get_i32("icu.manager.rank")?,
            patients_path: properties.get_path("patients.path")?,
            plan_path: properties.get_path("plan.path")?,
            patient_infected_chance: chance,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HospitalJson {
    building: BuildingJson,
    parameters: serde_json::Value,
}

pub struct HospitalConfig {
    pub plan: HospitalPlan,
    pub parameters: serde_json::Value,
}

impl HospitalConfig {
    pub fn load(path: &Path) -> SimResult<HospitalConfig> {
        let text = std::fs::read_to_string(path)?;
        let json: HospitalJson = serde_json::from_str(&text)?;
        let plan = HospitalPlan::from_json(&json.building)?;
        Ok(HospitalConfig { plan, parameters: json.parameters })
    }
}

#[derive(Debug, Deserialize)]
struct PatientDistributionJson {
    daily: Vec<Vec<u32>>,
    infected_chance: Vec<f64>,
}

pub fn load_admission_histogram(path: &Path, interval_length_seconds: u64) -> SimResult<AdmissionHistogram> {
    let text = std::fs::read_to_string(path)?;
    let json: PatientDistributionJson = serde_json::from_str(&text)?;
    for (day, p) in json.infected_chance.iter().enumerate() {
        if !(0.0..=1.0).contains(p) {
            return Err(SimError::ProbabilityOutOfRange { field: "infected_chance[day]", value: *p });
        }
        let _ = day;
    }
    Ok(AdmissionHistogram {
        daily: json.daily,
        infected_chance: json.infected_chance,
        interval_length: crate::clock::TimeDelta(interval_length_seconds),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines_and_ignores_comments() {
        let properties = Properties::parse("# comment\nstop.at=100\nseconds.per.tick = 60\n\n");
        assert_eq!(properties.get_u64("stop.at").unwrap(), 100);
        assert_eq!(properties.get_u64("seconds.per.tick").unwrap(), 60);
    }

    #[test]
    fn missing_key_is_an_error() {
        let properties = Properties::parse("stop.at=1");
        assert!(properties.get_u64("seconds.per.tick").is_err());
    }

    #[test]
    fn invalid_infected_chance_rejected() {
        let json = serde_json::json!({"daily": [[1]], "infected_chance": [1.5]});
        let parsed: PatientDistributionJson = serde_json::from_value(json).unwrap();
        let bad = parsed.infected_chance[0];
        assert!(!(0.0..=1.0).contains(&bad));
    }
}
