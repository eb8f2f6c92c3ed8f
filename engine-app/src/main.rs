//! CLI entry point: `simulate <config_file> <properties_file> [--debug]`.
//! Grounded on `engine-app/src/_teacher_reference/main.rs`
//! (`clap::Parser` derive, MPI bootstrap, `FileLogger` style init), with
//! the Kafka/opentelemetry machinery replaced by the MPI-only transport
//! this simulation actually uses.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::{error, info};
use mpi::traits::*;

use stirust::agents::factory::AgentFactory;
use stirust::clock::{Clock, Tick};
use stirust::config::{load_admission_histogram, HospitalConfig, Properties, RunConfig};
use stirust::disease::params::environment_params_from_json;
use stirust::disease::{DiseaseParams, IcuEnvironment};
use stirust::entry::EntrySource;
use stirust::error::SimResult;
use stirust::geography::pathfinder::Pathfinder;
use stirust::geography::space::{Region, Space};
use stirust::managers::chair::{ChairAuthority, ChairProxy};
use stirust::managers::doctors::{DoctorAuthority, DoctorProxy};
use stirust::managers::icu::{IcuAuthority, IcuProxy};
use stirust::managers::queue::{QueueAuthority, QueueProxy};
use stirust::managers::transport::MpiManagerChannel;
use stirust::migration::MpiMigrationTransport;
use stirust::random::RandomWrapper;
use stirust::scheduler::Scheduler;
use stirust_orchestrator::Topology;

/// Hospital contagion simulation, distributed across MPI ranks.
#[derive(Parser, Debug)]
#[command(name = "simulate", version, about)]
struct Cli {
    /// Hospital JSON config (building + parameters).
    config_file: PathBuf,

    /// Properties file (key=value).
    properties_file: PathBuf,

    /// Spin-wait at startup for an external debugger to attach. Must be
    /// ignored in CI builds.
    #[arg(long)]
    debug: bool,
}

static DEBUG_GATE: AtomicBool = AtomicBool::new(true);

fn wait_for_debugger() {
    info!("--debug passed: spinning until an external debugger clears the gate");
    while DEBUG_GATE.load(Ordering::SeqCst) {
        std::hint::spin_loop();
    }
}

fn main() -> SimResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.debug {
        wait_for_debugger();
    }

    let universe = mpi::initialize().expect("MPI failed to initialize");
    let world = universe.world();
    let rank = world.rank();
    let size = world.size();

    let properties = Properties::load(&cli.properties_file)?;
    let config = RunConfig::from_properties(&properties)?;
    let hospital = HospitalConfig::load(&cli.config_file)?;
    let disease_params = DiseaseParams::from_json_value(&hospital.parameters)?;
    let icu_environment_value = hospital
        .parameters
        .get("icu")
        .and_then(|icu| icu.get("environment"))
        .cloned()
        .unwrap_or_else(|| serde_json::json!({ "infection_chance": 0.0 }));
    let environment = IcuEnvironment::new(environment_params_from_json(&icu_environment_value)?);

    let topology = match Topology::validate(&config, &hospital.plan, size) {
        Ok(topology) => topology,
        Err(err) => {
            error!("topology validation failed: {}", err);
            std::process::exit(1);
        }
    };
    let cell = topology.cell_for_rank(rank, &hospital.plan);
    let region = Region {
        min: stirust::geography::coord::DiscreteCoord::new(cell.min_x, cell.min_y),
        max: stirust::geography::coord::DiscreteCoord::new(cell.max_x, cell.max_y),
    };

    let histogram = load_admission_histogram(&config.patients_path, config.seconds_per_tick as u64 * 240)?;
    let mut entry_source = EntrySource::new(histogram);
    let mut clock = Clock::new(config.seconds_per_tick);
    let mut rng = RandomWrapper::new(0xC0FFEE, rank);
    let mut space = Space::new(region);
    let mut pathfinder = Pathfinder::new();
    let mut factory = AgentFactory::new(rank);

    // Manager authority/proxy selection per rank.
    let mut chair_authority = if rank == config.chair_manager_rank { Some(ChairAuthority::new(1_000, hospital.plan.chairs.iter().map(|c| c.to_continuous()).collect())) } else { None };
    let mut chair_proxy = if rank != config.chair_manager_rank { Some(ChairProxy::new(1_000)) } else { None };

    let mut reception_authority = if rank == config.reception_manager_rank {
        Some(QueueAuthority::new(1_010, hospital.plan.receptionists.iter().map(|r| r.patient_location.to_continuous()).collect()))
    } else {
        None
    };
    let mut reception_proxy = if rank != config.reception_manager_rank { Some(QueueProxy::new(1_010)) } else { None };

    let mut triage_authority = if rank == config.triage_manager_rank {
        Some(QueueAuthority::new(1_020, hospital.plan.triages.iter().map(|t| t.patient_location.to_continuous()).collect()))
    } else {
        None
    };
    let mut triage_proxy = if rank != config.triage_manager_rank { Some(QueueProxy::new(1_020)) } else { None };

    let mut doctor_positions = std::collections::HashMap::new();
    for specialty in hospital.plan.doctor_specialties() {
        let positions = hospital.plan.doctors_of(&specialty).into_iter().map(|d| d.patient_location.to_continuous()).collect();
        doctor_positions.insert(specialty, positions);
    }
    let mut doctors_authority = if rank == config.doctors_manager_rank { Some(DoctorAuthority::new(1_030, doctor_positions)) } else { None };
    let mut doctors_proxy = if rank != config.doctors_manager_rank { Some(DoctorProxy::new(1_030)) } else { None };

    let icu_beds_value = hospital.parameters.get("icu").and_then(|icu| icu.get("beds")).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let death_probability = hospital.parameters.get("icu").and_then(|icu| icu.get("death_probability")).and_then(|v| v.as_f64()).unwrap_or(0.0);
    let mut icu_authority = if rank == config.icu_manager_rank {
        Some(IcuAuthority::new(1_040, icu_beds_value, death_probability, vec![(stirust::clock::DateTime(config.seconds_per_tick as u64 * 60), 1.0)])?)
    } else {
        None
    };
    let mut icu_proxy = if rank != config.icu_manager_rank { Some(IcuProxy::new(1_040)) } else { None };

    // Staff: receptionists and doctors, stationary and immune with
    // probability `disease_params.staff_immunity`.
    let mut staff = Vec::new();
    for receptionist in &hospital.plan.receptionists {
        let immune = rng.bernoulli(disease_params.staff_immunity);
        let person = factory.new_fixed_person(receptionist.staff_location, immune);
        space.insert(person.id, receptionist.staff_location);
        staff.push(person);
    }
    for doctor in &hospital.plan.doctors {
        let immune = rng.bernoulli(disease_params.staff_immunity);
        let person = factory.new_fixed_person(doctor.staff_location, immune);
        space.insert(person.id, doctor.staff_location);
        staff.push(person);
    }

    // Objects: one per chair, plus `icu_beds_value` furniture objects at the
    // ICU entry for every other disease-parameter object type (ICU beds).
    let mut objects = Vec::new();
    for type_tag in disease_params.objects.keys() {
        if type_tag == "chair" {
            for &chair in &hospital.plan.chairs {
                let object = factory.new_object(type_tag.clone(), chair, stirust::clock::DateTime(0));
                space.insert(object.id, chair);
                objects.push(object);
            }
        } else {
            for _ in 0..icu_beds_value {
                let object = factory.new_object(type_tag.clone(), hospital.plan.icu_entry, stirust::clock::DateTime(0));
                space.insert(object.id, hospital.plan.icu_entry);
                objects.push(object);
            }
        }
    }

    let mut channel = MpiManagerChannel::new(&world, config.chair_manager_rank);
    let mut migration = MpiMigrationTransport::new(&world, 1_100);

    let mut scheduler = Scheduler {
        clock,
        factory,
        space,
        pathfinder,
        plan: &hospital.plan,
        rng,
        entry_source,
        exit_sink: stirust::agents::exit_sink::ExitSink::new(),
        patients: Vec::new(),
        staff,
        objects,
        disease: disease_params,
        environment,
        chairs: chair_authority.as_mut().map(|m| m as &mut dyn stirust::managers::chair::ChairManager).unwrap_or_else(|| chair_proxy.as_mut().unwrap()),
        reception: reception_authority.as_mut().map(|m| m as &mut dyn stirust::managers::queue::QueueManager).unwrap_or_else(|| reception_proxy.as_mut().unwrap()),
        triage: triage_authority.as_mut().map(|m| m as &mut dyn stirust::managers::queue::QueueManager).unwrap_or_else(|| triage_proxy.as_mut().unwrap()),
        doctors: doctors_authority.as_mut().map(|m| m as &mut dyn stirust::managers::doctors::DoctorManager).unwrap_or_else(|| doctors_proxy.as_mut().unwrap()),
        icu: icu_authority.as_mut().map(|m| m as &mut dyn stirust::managers::icu::IcuManager).unwrap_or_else(|| icu_proxy.as_mut().unwrap()),
        channel: &mut channel,
        migration: &mut migration,
        reception_attention_time: stirust::clock::TimeDelta(60),
        triage_attention_time: stirust::clock::TimeDelta(60),
        doctor_attention_time: stirust::clock::TimeDelta(300),
        walk_speed: 0.5,
    };

    scheduler.run(Tick(config.stop_at))?;
    info!("rank {} completed {} ticks", rank, config.stop_at);

    Ok(())
}
