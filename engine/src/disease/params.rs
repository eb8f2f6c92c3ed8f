//! Flyweight-shared infection parameters, loaded once from
//! the hospital JSON's `parameters` object and borrowed by every cycle
//! instance rather than copied per agent.

use std::collections::HashMap;

use serde::Deserialize;

use crate::clock::TimeDelta;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSpanJson {
    #[serde(default)]
    pub day: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl TimeSpanJson {
    pub fn to_delta(&self) -> TimeDelta {
        TimeDelta::from_hms(self.day, self.hours, self.minutes, self.seconds)
    }
}

fn check_probability(field: &'static str, value: f64) -> SimResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimError::ProbabilityOutOfRange { field, value })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct IncubationTimeJson {
    min: TimeSpanJson,
    max: TimeSpanJson,
}

#[derive(Debug, Clone, Deserialize)]
struct HumanParamsJson {
    infect_probability: f64,
    infect_distance: f64,
    contamination_probability: f64,
    incubation_time: IncubationTimeJson,
}

/// Shared parameters for the human infection cycle.
#[derive(Debug, Clone)]
pub struct HumanDiseaseParams {
    pub infect_probability: f64,
    pub infect_distance: f64,
    pub contamination_probability: f64,
    pub min_incubation_time: TimeDelta,
    pub max_incubation_time: TimeDelta,
}

impl HumanDiseaseParams {
    fn from_json(json: HumanParamsJson) -> SimResult<HumanDiseaseParams> {
        let min = json.incubation_time.min.to_delta();
        let max = json.incubation_time.max.to_delta();
        if min > max {
            return Err(SimError::InvalidProperty {
                key: "human.incubation_time",
                value: format!("min {:?} > max {:?}", min, max),
            });
        }
        Ok(HumanDiseaseParams {
            infect_probability: check_probability("human.infect_probability", json.infect_probability)?,
            infect_distance: json.infect_distance,
            contamination_probability: check_probability(
                "human.contamination_probability",
                json.contamination_probability,
            )?,
            min_incubation_time: min,
            max_incubation_time: max,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectTypeParamsJson {
    infect_probability: f64,
    radius: f64,
    cleaning_interval: TimeSpanJson,
}

/// Shared parameters for one object type's infection cycle.
#[derive(Debug, Clone)]
pub struct ObjectDiseaseParams {
    pub infect_probability: f64,
    pub radius: f64,
    pub cleaning_interval: TimeDelta,
}

impl ObjectDiseaseParams {
    fn from_json(type_tag: &str, json: ObjectTypeParamsJson) -> SimResult<ObjectDiseaseParams> {
        if !(0.0..=1.0).contains(&json.infect_probability) {
            return Err(SimError::InvalidProperty {
                key: "objects.<type>.infect_probability",
                value: format!("{}: {}", type_tag, json.infect_probability),
            });
        }
        Ok(ObjectDiseaseParams {
            infect_probability: json.infect_probability,
            radius: json.radius,
            cleaning_interval: json.cleaning_interval.to_delta(),
        })
    }
}

/// The ICU's environmental infection source parameters.
#[derive(Debug, Clone)]
pub struct EnvironmentParams {
    pub infection_chance: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct EnvironmentParamsJson {
    infection_chance: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ParametersJson {
    human: HumanParamsJson,
    objects: HashMap<String, ObjectTypeParamsJson>,
    #[serde(default)]
    personnel: Option<PersonnelParamsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct PersonnelParamsJson {
    immunity: f64,
}

/// The resolved, validated disease-parameter bundle for a whole run.
#[derive(Debug, Clone)]
pub struct DiseaseParams {
    pub human: HumanDiseaseParams,
    pub objects: HashMap<String, ObjectDiseaseParams>,
    pub staff_immunity: f64,
}

impl DiseaseParams {
    pub fn from_json_value(value: &serde_json::Value) -> SimResult<DiseaseParams> {
        let json: ParametersJson = serde_json::from_value(value.clone())?;
        let human = HumanDiseaseParams::from_json(json.human)?;
        let mut objects = HashMap::new();
        for (type_tag, params) in json.objects {
            objects.insert(type_tag.clone(), ObjectDiseaseParams::from_json(&type_tag, params)?);
        }
        let staff_immunity = match json.personnel {
            Some(p) => check_probability("personnel.immunity", p.immunity)?,
            None => 0.0,
        };
        Ok(DiseaseParams { human, objects, staff_immunity })
    }
}

pub fn environment_params_from_json(value: &serde_json::Value) -> SimResult<EnvironmentParams> {
    let json: EnvironmentParamsJson = serde_json::from_value(value.clone())?;
    Ok(EnvironmentParams { infection_chance: check_probability("icu.environment.infection_chance", json.infection_chance)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_probability_outside_unit_interval() {
        let json = serde_json::json!({
            "infect_probability": 1.5,
            "infect_distance": 1.0,
            "contamination_probability": 0.2,
            "incubation_time": {"min": {"day": 0}, "max": {"day": 1}},
        });
        let parsed: HumanParamsJson = serde_json::from_value(json).unwrap();
        assert!(HumanDiseaseParams::from_json(parsed).is_err());
    }

    #[test]
    fn accepts_well_formed_parameters() {
        let value = serde_json::json!({
            "human": {
                "infect_probability": 0.3,
                "infect_distance": 1.0,
                "contamination_probability": 0.1,
                "incubation_time": {"min": {"day": 0, "hours": 1}, "max": {"day": 0, "hours": 5}},
            },
            "objects": {
                "chair": {"infect_probability": 0.05, "radius": 0.5, "cleaning_interval": {"day": 0, "hours": 2}}
            },
            "personnel": {"immunity": 0.8}
        });
        let params = DiseaseParams::from_json_value(&value).unwrap();
        assert_eq!(params.staff_immunity, 0.8);
        assert!(params.objects.contains_key("chair"));
    }
}
