//! Pre-launch topology validation, grounded on
//! `TravelPlan::validate_regions`
//! (`orchestrator/src/_teacher_reference/travel_plan.rs`), generalized
//! from "inter-region travel plan" to "does this process grid cover the
//! hospital plan, and do the configured manager ranks exist".

use stirust::config::RunConfig;
use stirust::error::{SimError, SimResult};
use stirust::geography::plan::HospitalPlan;

/// One process's rectangular share of the grid, derived from `x.process`/`y.process` and this process's
/// rank, assuming row-major rank assignment across the grid.
#[derive(Debug, Clone, Copy)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

pub struct Topology {
    pub x_process: u32,
    pub y_process: u32,
    pub world_size: i32,
}

impl Topology {
    pub fn validate(config: &RunConfig, plan: &HospitalPlan, world_size: i32) -> SimResult<Topology> {
        let expected_ranks = config.x_process * config.y_process;
        if expected_ranks as i32 != world_size {
            return Err(SimError::SchemaMismatch(format!(
                "x.process * y.process = {} does not match world size {}",
                expected_ranks, world_size
            )));
        }
        if config.x_process == 0 || config.y_process == 0 {
            return Err(SimError::SchemaMismatch("x.process and y.process must be positive".to_string()));
        }
        if (plan.width as u32) < config.x_process || (plan.height as u32) < config.y_process {
            return Err(SimError::SchemaMismatch("process grid is finer than the hospital plan".to_string()));
        }

        for (label, rank) in [
            ("chair.manager.rank", config.chair_manager_rank),
            ("reception.manager.rank", config.reception_manager_rank),
            ("triage.manager.rank", config.triage_manager_rank),
            ("doctors.manager.rank", config.doctors_manager_rank),
            ("icu.manager.rank", config.icu_manager_rank),
        ] {
            if rank < 0 || rank >= world_size {
                return Err(SimError::SchemaMismatch(format!("{} {} is outside [0, {})", label, rank, world_size)));
            }
        }

        Ok(Topology { x_process: config.x_process, y_process: config.y_process, world_size })
    }

    /// The rectangular cell owned by `rank`, assuming row-major assignment
    /// and as-even-as-possible splitting of the plan's width/height.
    pub fn cell_for_rank(&self, rank: i32, plan: &HospitalPlan) -> GridCell {
        let column = (rank as u32) % self.x_process;
        let row = (rank as u32) / self.x_process;

        let column_width = plan.width as u32 / self.x_process;
        let row_height = plan.height as u32 / self.y_process;

        let min_x = (column * column_width) as i32;
        let max_x = if column + 1 == self.x_process { plan.width - 1 } else { (min_x as u32 + column_width - 1) as i32 };
        let min_y = (row * row_height) as i32;
        let max_y = if row + 1 == self.y_process { plan.height - 1 } else { (min_y as u32 + row_height - 1) as i32 };

        GridCell { column, row, min_x, max_x, min_y, max_y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stirust::geography::plan::BuildingJson;

    fn plan() -> HospitalPlan {
        let json: BuildingJson = serde_json::from_str(
            r#"{
                "width": 10, "height": 10,
                "walls": [], "chairs": [],
                "entry": {"x": 0, "y": 0}, "exit": {"x": 9, "y": 9},
                "triages": [], "receptionists": [], "doctors": [],
                "icu": {"entry_location": {"x": 0, "y": 9}, "exit_location": {"x": 9, "y": 0}}
            }"#,
        )
        .unwrap();
        HospitalPlan::from_json(&json).unwrap()
    }

    fn config() -> RunConfig {
        RunConfig {
            stop_at: 100,
            seconds_per_tick: 60,
            x_process: 2,
            y_process: 2,
            chair_manager_rank: 0,
            reception_manager_rank: 1,
            triage_manager_rank: 2,
            doctors_manager_rank: 3,
            icu_manager_rank: 0,
            patients_path: "patients.json".into(),
            plan_path: "plan.json".into(),
            patient_infected_chance: 0.01,
        }
    }

    #[test]
    fn rejects_mismatched_world_size() {
        assert!(Topology::validate(&config(), &plan(), 3).is_err());
    }

    #[test]
    fn rejects_out_of_range_manager_rank() {
        let mut cfg = config();
        cfg.doctors_manager_rank = 99;
        assert!(Topology::validate(&cfg, &plan(), 4).is_err());
    }

    #[test]
    fn partitions_grid_evenly_across_ranks() {
        let topology = Topology::validate(&config(), &plan(), 4).unwrap();
        let cell0 = topology.cell_for_rank(0, &plan());
        let cell3 = topology.cell_for_rank(3, &plan());
        assert_eq!(cell0.min_x, 0);
        assert_eq!(cell3.max_x, 9);
        assert_eq!(cell3.max_y, 9);
    }
}
