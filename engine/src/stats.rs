//! Per-process statistics output. Grounded
//! on `examples/original_source/src/icu/real_icu.cpp`'s statistics struct,
//! with the `csv::Writer` idiom used throughout `engine/src/`.

use std::path::Path;

use serde::Serialize;

use crate::error::SimResult;
use crate::geography::pathfinder::PathfinderStats;
use crate::managers::icu::IcuStatistics;

#[derive(Serialize)]
struct IcuStatusRow {
    time: u64,
    beds_reserved: u32,
    beds_in_use: u32,
}

#[derive(Serialize)]
struct IcuAdmissionRow {
    time: u64,
    agent_local_id: u32,
    event: &'static str,
}

#[derive(Serialize)]
struct PathfinderRow {
    cache_hits: u64,
    cache_misses: u64,
    nodes_expanded: u64,
}

#[derive(Serialize)]
struct ResultRow {
    rank: i32,
    ticks_run: u64,
    patients_exited: usize,
}

/// Owns the per-process output files (ICU status/admissions CSVs,
/// pathfinder and staff dumps, the results CSV), opened once and
/// appended to each tick.
pub struct StatsWriter {
    rank: i32,
    icu_status: csv::Writer<std::fs::File>,
    icu_admissions: csv::Writer<std::fs::File>,
}

impl StatsWriter {
    pub fn new(output_dir: &Path, rank: i32) -> SimResult<StatsWriter> {
        std::fs::create_dir_all(output_dir)?;
        let icu_status = csv::Writer::from_path(output_dir.join(format!("icu_status_in_process_{}.csv", rank)))?;
        let icu_admissions =
            csv::Writer::from_path(output_dir.join(format!("icu_admissions_and_releases_in_process_{}.csv", rank)))?;
        Ok(StatsWriter { rank, icu_status, icu_admissions })
    }

    pub fn record_icu_status(&mut self, time: u64, beds_reserved: u32, beds_in_use: u32) -> SimResult<()> {
        self.icu_status.serialize(IcuStatusRow { time, beds_reserved, beds_in_use })?;
        Ok(())
    }

    pub fn record_icu_events(&mut self, stats: &IcuStatistics) -> SimResult<()> {
        for (id, time) in &stats.admissions {
            self.icu_admissions.serialize(IcuAdmissionRow { time: *time, agent_local_id: id.local_id, event: "admission" })?;
        }
        for (id, time) in &stats.releases {
            self.icu_admissions.serialize(IcuAdmissionRow { time: *time, agent_local_id: id.local_id, event: "release" })?;
        }
        for (id, time) in &stats.rejections {
            self.icu_admissions.serialize(IcuAdmissionRow { time: *time, agent_local_id: id.local_id, event: "rejection" })?;
        }
        Ok(())
    }

    pub fn write_pathfinder_stats(&self, output_dir: &Path, stats: PathfinderStats) -> SimResult<()> {
        let mut writer = csv::Writer::from_path(output_dir.join(format!("pathfinder.p{}.csv", self.rank)))?;
        writer.serialize(PathfinderRow {
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            nodes_expanded: stats.nodes_expanded,
        })?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_staff_json(&self, output_dir: &Path, staff_count: usize) -> SimResult<()> {
        let path = output_dir.join(format!("staff.p{}.json", self.rank));
        let value = serde_json::json!({ "rank": self.rank, "staff_count": staff_count });
        std::fs::write(path, serde_json::to_vec_pretty(&value)?)?;
        Ok(())
    }

    pub fn append_result_row(&self, output_dir: &Path, ticks_run: u64, patients_exited: usize) -> SimResult<()> {
        let path = output_dir.join("results.csv");
        let write_header = !path.exists();
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(write_header).from_writer(file);
        writer.serialize(ResultRow { rank: self.rank, ticks_run, patients_exited })?;
        writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) -> SimResult<()> {
        self.icu_status.flush()?;
        self.icu_admissions.flush()?;
        Ok(())
    }
}
