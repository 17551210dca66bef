//! seir — spatial SEIR demo for the epi toolkit.
//!
//! Lays out a grid of nodes near Black Rock Desert, NV, couples them with a
//! migration matrix and runs a daily-tick SEIR model with births and
//! age-dependent deaths.  Writes `column_summaries.csv`, `state_counts.csv`
//! and a final store snapshot to the output directory.
//!
//! Usage: `seir [overrides.json]`.  The override file may only update keys
//! present in the defaults (see `config.rs`).  Set `RUST_LOG=debug` for
//! store growth and forecaster events.

mod config;
mod demography;

use std::ops::Range;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use epi_agent::{AgentStore, AgentStoreBuilder, CapacityForecaster, StateDistribution, capacity_from_birthrates};
use epi_core::{DAYS_PER_YEAR, DistanceMetric, NodeId, SimRng, Tick};
use epi_output::{CsvWriter, StoreRecorder};
use epi_sampling::SurvivalCurve;
use epi_schedule::EventQueue;
use epi_spatial::{InitialStates, MigrationMatrix, Scenario, SelfFlow, grid, uniform_population};

use config::RunConfig;

// ── Compartments ──────────────────────────────────────────────────────────────

const STATES: [&str; 5] = ["S", "E", "I", "R", "D"];

const SUSCEPTIBLE: u8 = 0;
const EXPOSED:     u8 = 1;
const INFECTIOUS:  u8 = 2;
const RECOVERED:   u8 = 3;
const DEAD:        u8 = 4;

/// Scheduled state change for one agent (store index).
#[derive(Copy, Clone, Debug)]
enum Transition {
    Onset(u32),
    Recovery(u32),
    Death(u32),
}

/// Everything the tick loop reads but never changes.
struct World {
    cfg:       RunConfig,
    migration: MigrationMatrix,
    mortality: SurvivalCurve,
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // 1. Configuration.
    let override_path = std::env::args().nth(1).map(PathBuf::from);
    let mut params = config::load(override_path.as_deref())?;
    let cfg = RunConfig::from_params(&params)?;
    info!(seed = cfg.seed, ticks = cfg.ticks, model = cfg.flow_model.name(), "configuration loaded");

    let mut root = SimRng::new(cfg.seed);
    let mut setup_rng = root.child(0);
    let mut sim_rng = root.child(1);

    // 2. Scenario and migration network.
    let mut scenario = grid(
        cfg.grid_rows,
        cfg.grid_cols,
        cfg.node_size_degs,
        cfg.origin,
        uniform_population(&mut setup_rng),
        &STATES,
    )?;
    if scenario.len() > usize::from(u16::MAX) + 1 {
        bail!("{} nodes do not fit the u16 nodeid column", scenario.len());
    }
    scenario.initialize_states(&InitialStates::Fractions(vec![vec![
        0.0,
        0.0,
        cfg.initial_infected,
        0.0,
        0.0,
    ]]))?;
    let migration = scenario
        .migration_network(DistanceMetric::GreatCircle, cfg.flow_model)
        .self_flow(SelfFlow::Stay(1.0 - cfg.migration_rate))
        .build()?;
    info!(nodes = scenario.len(), population = scenario.total_population(), "scenario built");

    // 3. Pre-size the store.
    let total = scenario.total_population() as usize;
    let forecast = forecast_capacity(&cfg, &scenario, &mut setup_rng)?;
    params.set("initial_capacity", json!(total));
    params.set("forecast_capacity", json!(forecast));

    let mut store = AgentStoreBuilder::from_config(&params)?
        .property::<u16>("nodeid", 0)
        .property::<u8>("state", SUSCEPTIBLE)
        .property::<i32>("dob", 0)
        .property::<i32>("dod", 0)
        .agents(total)
        .build()?;

    // 4. Populate.
    let world = World {
        mortality: SurvivalCurve::from_cumulative_deaths(&demography::cumulative_deaths())?,
        migration,
        cfg,
    };
    let mut queue: EventQueue<Transition> = EventQueue::with_capacity(total / 4);
    populate(&world, &scenario, &mut store, &mut queue, &mut setup_rng)?;

    // 5. Run.
    let writer = CsvWriter::new(&world.cfg.output_dir)?;
    let mut recorder = StoreRecorder::new(writer, "nodeid", "state");

    let t0 = Instant::now();
    let (mut infections, mut births, mut transitions) = (0usize, 0usize, 0usize);
    for t in 0..world.cfg.ticks {
        let now = Tick(t);
        transitions += apply_transitions(&world, now, &mut store, &mut queue, &mut sim_rng)?;
        births += add_births(&world, now, &mut store, &mut queue, &mut sim_rng)?;
        infections += transmit(&world, now, &mut store, &mut queue, &mut sim_rng)?;

        if t % world.cfg.record_interval == 0 || t + 1 == world.cfg.ticks {
            recorder.record::<u16, u8>(now, &store)?;
        }
    }
    recorder.finish()?;
    let elapsed = t0.elapsed();

    // 6. Snapshot and verify the round trip.
    let snapshot = world.cfg.output_dir.join("final.snap");
    store.save_snapshot(&snapshot)?;
    let restored = AgentStore::from_snapshot(&snapshot)?;
    if restored.count() != store.count() || restored.capacity() != store.capacity() {
        bail!("snapshot round trip changed the store shape");
    }

    // 7. Summary.
    info!(
        agents = store.count(),
        capacity = store.capacity(),
        infections,
        births,
        transitions,
        pending = queue.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "simulation complete"
    );
    let states = store.column::<u8>("state")?;
    println!("{:<6} {:>10}", "State", "Agents");
    println!("{}", "-".repeat(17));
    for (code, name) in STATES.iter().enumerate() {
        let n = states.iter().filter(|&&s| usize::from(s) == code).count();
        println!("{name:<6} {n:>10}");
    }
    println!("Output written to {}", world.cfg.output_dir.display());

    Ok(())
}

// ── Setup ─────────────────────────────────────────────────────────────────────

/// Larger of the deterministic birth-rate estimate and the stochastic
/// growth forecast.
fn forecast_capacity(cfg: &RunConfig, scenario: &Scenario, rng: &mut SimRng) -> Result<usize> {
    let populations = scenario.populations();
    let birthrates = vec![vec![cfg.crude_birth_rate; populations.len()]; cfg.ticks as usize];
    let per_node = capacity_from_birthrates(&birthrates, &populations, 1.0)?;
    let deterministic: u64 = per_node.iter().sum();

    let forecaster = CapacityForecaster::new(
        scenario.total_population(),
        cfg.growth_drift,
        cfg.growth_volatility,
        cfg.ticks,
    )?;
    let stochastic = forecaster.project_capacity(cfg.forecast_trials, 1.05, rng)?;
    Ok(stochastic.max(deterministic as usize))
}

/// Node ids, initial states, birth dates and death dates for the initial
/// population.
fn populate(
    world: &World,
    scenario: &Scenario,
    store: &mut AgentStore,
    queue: &mut EventQueue<Transition>,
    rng: &mut SimRng,
) -> Result<()> {
    let total = store.count();
    let homes = StateDistribution::counts(
        scenario.nodes().iter().map(|n| (n.id.0 as u16, n.population)),
    );
    store.initialize_population("nodeid", 0..total, &homes)?;

    // Agents of each node are contiguous after the call above.
    let mut start = 0;
    for node in scenario.nodes() {
        let range = start..start + node.population as usize;
        let states = StateDistribution::counts(
            node.states.iter().enumerate().map(|(code, &n)| (code as u8, n)),
        );
        store.initialize_population("state", range.clone(), &states)?;
        store.shuffle_population::<u8>("state", range.clone(), rng)?;
        start = range.end;
    }

    let ages = demography::sample_ages(total, rng)?;
    assign_lifespans(world, Tick::ZERO, 0..total, &ages, store, queue, rng)?;

    let state = store.column::<u8>("state")?;
    for (i, _) in state.iter().enumerate().filter(|&(_, &s)| s == INFECTIOUS) {
        let at = Tick::ZERO + duration(world.cfg.infectious_days, rng);
        queue.push(at, Transition::Recovery(i as u32));
    }
    Ok(())
}

/// Set `dob`/`dod` for agents in `range` aged `ages_days` at `now`, and
/// schedule deaths that fall inside the run.
fn assign_lifespans(
    world: &World,
    now: Tick,
    range: Range<usize>,
    ages_days: &[u64],
    store: &mut AgentStore,
    queue: &mut EventQueue<Transition>,
    rng: &mut SimRng,
) -> Result<()> {
    let mut deaths = Vec::with_capacity(range.len());
    for &age in ages_days {
        let at_death = world.mortality.predict_age_at_death_days(age, None, rng)?;
        deaths.push(at_death - age);
    }

    let dob = &mut store.column_mut::<i32>("dob")?[range.clone()];
    for (d, &age) in dob.iter_mut().zip(ages_days) {
        *d = now.0 as i32 - age as i32;
    }
    let dod = &mut store.column_mut::<i32>("dod")?[range.clone()];
    for ((d, &remaining), i) in dod.iter_mut().zip(&deaths).zip(range) {
        let at = now + remaining;
        *d = at.0.min(i32::MAX as u64) as i32;
        if at.0 < world.cfg.ticks {
            queue.push(at, Transition::Death(i as u32));
        }
    }
    Ok(())
}

// ── Tick phases ───────────────────────────────────────────────────────────────

/// Uniform integer duration within two days of `mean`, at least one day.
fn duration(mean: u64, rng: &mut SimRng) -> u64 {
    rng.gen_range(mean.saturating_sub(2).max(1)..=mean + 2)
}

/// Apply every transition due at `now`.  Events made stale by an earlier
/// transition (e.g. recovery of an agent who already died) are dropped.
fn apply_transitions(
    world: &World,
    now: Tick,
    store: &mut AgentStore,
    queue: &mut EventQueue<Transition>,
    rng: &mut SimRng,
) -> Result<usize> {
    let state = store.column_mut::<u8>("state")?;
    let mut applied = 0;
    while let Some((_, event)) = queue.pop_due(now) {
        match event {
            Transition::Onset(i) if state[i as usize] == EXPOSED => {
                state[i as usize] = INFECTIOUS;
                queue.push(now + duration(world.cfg.infectious_days, rng), Transition::Recovery(i));
            }
            Transition::Recovery(i) if state[i as usize] == INFECTIOUS => {
                state[i as usize] = RECOVERED;
            }
            Transition::Death(i) if state[i as usize] != DEAD => {
                state[i as usize] = DEAD;
            }
            _ => continue,
        }
        applied += 1;
    }
    Ok(applied)
}

/// Living agents and infectious agents per node.
fn node_counts(store: &AgentStore, nodes: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let ids = store.column::<u16>("nodeid")?;
    let states = store.column::<u8>("state")?;
    let mut alive = vec![0.0; nodes];
    let mut infectious = vec![0.0; nodes];
    for (&node, &s) in ids.iter().zip(states) {
        if s != DEAD {
            alive[usize::from(node)] += 1.0;
        }
        if s == INFECTIOUS {
            infectious[usize::from(node)] += 1.0;
        }
    }
    Ok((alive, infectious))
}

/// Daily births per node at the crude birth rate.
fn add_births(
    world: &World,
    now: Tick,
    store: &mut AgentStore,
    queue: &mut EventQueue<Transition>,
    rng: &mut SimRng,
) -> Result<usize> {
    let nodes = world.migration.node_count();
    let (alive, _) = node_counts(store, nodes)?;
    let daily = world.cfg.crude_birth_rate / 1_000.0 / DAYS_PER_YEAR as f64;

    let per_node: Vec<u64> = alive
        .iter()
        .map(|&n| {
            let expected = n * daily;
            let whole = expected.floor();
            whole as u64 + u64::from(rng.gen_bool(expected - whole))
        })
        .collect();
    let born = per_node.iter().sum::<u64>() as usize;
    if born == 0 {
        return Ok(0);
    }

    let range = store.add(born)?;
    let homes = StateDistribution::counts(per_node.iter().enumerate().map(|(n, &c)| (n as u16, c)));
    store.initialize_population("nodeid", range.clone(), &homes)?;
    assign_lifespans(world, now, range, &vec![0; born], store, queue, rng)?;
    Ok(born)
}

/// Expose susceptibles with probability `1 − exp(−λ)`, where the force of
/// infection at node `i` is `λ_i = β · Σ_j M_ij · I_j / N_j`.
fn transmit(
    world: &World,
    now: Tick,
    store: &mut AgentStore,
    queue: &mut EventQueue<Transition>,
    rng: &mut SimRng,
) -> Result<usize> {
    let nodes = world.migration.node_count();
    let (alive, infectious) = node_counts(store, nodes)?;
    let prevalence: Vec<f64> = infectious
        .iter()
        .zip(&alive)
        .map(|(&i, &n)| if n > 0.0 { i / n } else { 0.0 })
        .collect();
    let p_infect: Vec<f64> = (0..nodes)
        .map(|i| {
            let row = world.migration.row(NodeId(i as u32));
            let exposure: f64 = row.iter().zip(&prevalence).map(|(&m, &p)| f64::from(m) * p).sum();
            -(-world.cfg.beta * exposure).exp_m1()
        })
        .collect();

    let (states, ids) = store.column_pair_mut::<u8, u16>("state", "nodeid")?;
    let mut exposed = 0;
    for (i, (s, &node)) in states.iter_mut().zip(ids).enumerate() {
        if *s == SUSCEPTIBLE && rng.gen_bool(p_infect[usize::from(node)]) {
            *s = EXPOSED;
            queue.push(now + duration(world.cfg.incubation_days, rng), Transition::Onset(i as u32));
            exposed += 1;
        }
    }
    Ok(exposed)
}
