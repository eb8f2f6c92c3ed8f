//! The static hospital floor plan, loaded once from the
//! `building` section of the hospital JSON document and never
//! mutated afterwards. Grounded on
//! `examples/original_source/src/hospital_plan.cpp`'s indexed-fixture-list
//! layout.

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::geography::coord::DiscreteCoord;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoordJson {
    pub x: i32,
    pub y: i32,
}

impl From<CoordJson> for DiscreteCoord {
    fn from(c: CoordJson) -> DiscreteCoord {
        DiscreteCoord::new(c.x, c.y)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriageJson {
    pub patient_location: CoordJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceptionistJson {
    pub receptionist_location: CoordJson,
    pub patient_location: CoordJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorJson {
    pub doctor_location: CoordJson,
    pub patient_location: CoordJson,
    pub specialty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IcuJson {
    pub entry_location: CoordJson,
    pub exit_location: CoordJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingJson {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub walls: Vec<CoordJson>,
    #[serde(default)]
    pub chairs: Vec<CoordJson>,
    pub entry: CoordJson,
    pub exit: CoordJson,
    #[serde(default)]
    pub triages: Vec<TriageJson>,
    #[serde(default)]
    pub receptionists: Vec<ReceptionistJson>,
    #[serde(default)]
    pub doctors: Vec<DoctorJson>,
    pub icu: IcuJson,
}

#[derive(Debug, Clone)]
pub struct Triage {
    pub patient_location: DiscreteCoord,
}

#[derive(Debug, Clone)]
pub struct Receptionist {
    pub staff_location: DiscreteCoord,
    pub patient_location: DiscreteCoord,
}

#[derive(Debug, Clone)]
pub struct Doctor {
    pub staff_location: DiscreteCoord,
    pub patient_location: DiscreteCoord,
    pub specialty: String,
}

/// The immutable floor plan: dimensions, obstacle mask, and indexed
/// fixtures. `obstacles[x][y] == true` means walkable, matching
#[derive(Debug, Clone)]
pub struct HospitalPlan {
    pub width: i32,
    pub height: i32,
    obstacles: Vec<Vec<bool>>,
    pub chairs: Vec<DiscreteCoord>,
    pub triages: Vec<Triage>,
    pub receptionists: Vec<Receptionist>,
    pub doctors: Vec<Doctor>,
    pub entry: DiscreteCoord,
    pub exit: DiscreteCoord,
    pub icu_entry: DiscreteCoord,
    pub icu_exit: DiscreteCoord,
}

impl HospitalPlan {
    pub fn from_json(building: &BuildingJson) -> SimResult<HospitalPlan> {
        if building.width <= 0 || building.height <= 0 {
            return Err(SimError::PlanLoadFailure("width and height must be positive".into()));
        }

        let width = building.width;
        let height = building.height;
        let mut obstacles = vec![vec![true; height as usize]; width as usize];

        let in_bounds = |c: DiscreteCoord| -> bool {
            c.x >= 0 && c.y >= 0 && c.x < width && c.y < height
        };

        for wall in &building.walls {
            let c: DiscreteCoord = (*wall).into();
            if !in_bounds(c) {
                return Err(SimError::PlanLoadFailure(format!("wall {:?} out of bounds", c)));
            }
            obstacles[c.x as usize][c.y as usize] = false;
        }

        let entry: DiscreteCoord = building.entry.into();
        let exit: DiscreteCoord = building.exit.into();
        let icu_entry: DiscreteCoord = building.icu.entry_location.into();
        let icu_exit: DiscreteCoord = building.icu.exit_location.into();

        for (label, c) in [("entry", entry), ("exit", exit), ("icu_entry", icu_entry), ("icu_exit", icu_exit)] {
            if !in_bounds(c) {
                return Err(SimError::PlanLoadFailure(format!("{} {:?} out of bounds", label, c)));
            }
        }
        if entry == exit || entry == icu_entry || entry == icu_exit || exit == icu_entry || exit == icu_exit || icu_entry == icu_exit {
            return Err(SimError::PlanLoadFailure("entry/exit/icu_entry/icu_exit must be distinct".into()));
        }

        let chairs: Vec<DiscreteCoord> = building.chairs.iter().map(|c| (*c).into()).collect();
        for c in &chairs {
            if !in_bounds(*c) {
                return Err(SimError::PlanLoadFailure(format!("chair {:?} out of bounds", c)));
            }
        }

        let triages: Vec<Triage> = building
            .triages
            .iter()
            .map(|t| Triage { patient_location: t.patient_location.into() })
            .collect();

        let receptionists: Vec<Receptionist> = building
            .receptionists
            .iter()
            .map(|r| Receptionist {
                staff_location: r.receptionist_location.into(),
                patient_location: r.patient_location.into(),
            })
            .collect();

        let doctors: Vec<Doctor> = building
            .doctors
            .iter()
            .map(|d| Doctor {
                staff_location: d.doctor_location.into(),
                patient_location: d.patient_location.into(),
                specialty: d.specialty.clone(),
            })
            .collect();

        // Exit, ICU entry and ICU exit are absorbing tiles: path queries may
        // only step onto them when they are the explicit goal (
        // "Exit is marked non-walkable" rule, generalized per SPEC_FULL to
        // the ICU's absorbing tiles, which `real_icu.cpp`'s `tick()` treats
        // the same way -- patients standing there are pulled out of space).
        for absorbing in [exit, icu_entry, icu_exit] {
            obstacles[absorbing.x as usize][absorbing.y as usize] = false;
        }

        Ok(HospitalPlan { width, height, obstacles, chairs, triages, receptionists, doctors, entry, exit, icu_entry, icu_exit })
    }

    pub fn is_walkable(&self, c: DiscreteCoord) -> bool {
        if c.x < 0 || c.y < 0 || c.x >= self.width || c.y >= self.height {
            return false;
        }
        self.obstacles[c.x as usize][c.y as usize]
    }

    pub fn in_bounds(&self, c: DiscreteCoord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    pub fn doctor_specialties(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for d in &self.doctors {
            if !seen.contains(&d.specialty) {
                seen.push(d.specialty.clone());
            }
        }
        seen
    }

    pub fn doctors_of(&self, specialty: &str) -> Vec<&Doctor> {
        self.doctors.iter().filter(|d| d.specialty == specialty).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> BuildingJson {
        serde_json::from_str(
            r#"{
                "width": 5, "height": 5,
                "walls": [{"x": 2, "y": 2}],
                "chairs": [{"x": 0, "y": 0}],
                "entry": {"x": 0, "y": 4},
                "exit": {"x": 4, "y": 4},
                "triages": [{"patient_location": {"x": 1, "y": 1}}],
                "receptionists": [{"receptionist_location": {"x": 2, "y": 0}, "patient_location": {"x": 2, "y": 1}}],
                "doctors": [{"doctor_location": {"x": 3, "y": 0}, "patient_location": {"x": 3, "y": 1}, "specialty": "general"}],
                "icu": {"entry_location": {"x": 0, "y": 1}, "exit_location": {"x": 0, "y": 2}}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn exit_and_icu_tiles_are_non_walkable() {
        let plan = HospitalPlan::from_json(&sample_json()).unwrap();
        assert!(!plan.is_walkable(plan.exit));
        assert!(!plan.is_walkable(plan.icu_entry));
        assert!(!plan.is_walkable(plan.icu_exit));
    }

    #[test]
    fn walls_are_non_walkable_other_tiles_are() {
        let plan = HospitalPlan::from_json(&sample_json()).unwrap();
        assert!(!plan.is_walkable(DiscreteCoord::new(2, 2)));
        assert!(plan.is_walkable(DiscreteCoord::new(0, 0)));
    }

    #[test]
    fn rejects_duplicate_special_tiles() {
        let mut json = sample_json();
        json.exit = json.entry;
        assert!(HospitalPlan::from_json(&json).is_err());
    }

    #[test]
    fn rejects_out_of_bounds_fixture() {
        let mut json = sample_json();
        json.chairs.push(CoordJson { x: 99, y: 99 });
        assert!(HospitalPlan::from_json(&json).is_err());
    }

    #[test]
    fn doctors_of_filters_by_specialty() {
        let plan = HospitalPlan::from_json(&sample_json()).unwrap();
        assert_eq!(plan.doctors_of("general").len(), 1);
        assert_eq!(plan.doctors_of("cardiology").len(), 0);
    }
}
