//! Lifecycle-engine invariants over randomized workloads.
//!
//! Every property runs the engine tick by tick and checks the state after
//! each step, not just at completion.

use ossim_core::{ProcessId, TickOutcome, Tickable};
use ossim_sched::{CpuScheduler, ProcessSpec, ProcessState, SchedulerConfig};
use ossim_test_utils::fixtures::{classic_srtf_workload, io_heavy_workload};
use ossim_test_utils::ScriptedRandom;
use proptest::prelude::*;

const MAX_TICKS: usize = 10_000;

fn config(processes: Vec<ProcessSpec>, context_switch_time: u32, seed: u64) -> SchedulerConfig {
    SchedulerConfig {
        processes,
        context_switch_time,
        seed,
        ..SchedulerConfig::default()
    }
}

fn run_to_completion<R: ossim_core::RandomSource>(engine: &mut CpuScheduler<R>) -> usize {
    for ticks in 1..=MAX_TICKS {
        if engine.tick() == TickOutcome::Completed {
            return ticks;
        }
    }
    panic!("workload did not finish within {MAX_TICKS} ticks");
}

#[test]
fn classic_workload_matches_hand_trace() {
    let mut engine = CpuScheduler::new(config(classic_srtf_workload(), 0, 0)).unwrap();
    let ticks = run_to_completion(&mut engine);
    let snap = engine.snapshot();
    // Bursts 8 + 4 + 9 + 5, finishing at tick 26.
    assert_eq!(ticks, 27);
    let completion: Vec<_> = snap
        .processes
        .iter()
        .map(|p| p.completion_time.unwrap())
        .collect();
    assert_eq!(completion, vec![17, 5, 26, 10]);
    assert_eq!(snap.counters.busy_ticks, 26);
    assert_eq!(snap.metrics.completed, 4);
}

#[test]
fn context_switch_time_stretches_the_run() {
    let fast = {
        let mut e = CpuScheduler::new(config(classic_srtf_workload(), 0, 0)).unwrap();
        run_to_completion(&mut e)
    };
    let mut slow_engine = CpuScheduler::new(config(classic_srtf_workload(), 2, 0)).unwrap();
    let slow = run_to_completion(&mut slow_engine);
    assert!(slow > fast);
    let counters = slow_engine.counters();
    assert!(counters.context_switches >= 4);
    assert_eq!(counters.dispatches, counters.context_switches);
    assert!(slow_engine.metrics().cpu_utilization < 1.0);
}

#[test]
fn seeded_io_runs_replay_after_reset() {
    let mut engine = CpuScheduler::new(config(io_heavy_workload(), 1, 99)).unwrap();
    let mut first = Vec::new();
    for _ in 0..200 {
        engine.tick();
        first.push(engine.snapshot());
    }
    engine.reset();
    for expected in &first {
        engine.tick();
        assert_eq!(&engine.snapshot(), expected);
    }
    assert!(engine.counters().io_interrupts > 0);
}

#[test]
fn scripted_io_always_blocks() {
    let spec = ProcessSpec::builder("io")
        .burst(3)
        .io(0.5, 1)
        .build()
        .unwrap();
    let always = ScriptedRandom::constant(0.0);
    let mut engine = CpuScheduler::with_random(config(vec![spec], 0, 0), always).unwrap();
    run_to_completion(&mut engine);
    // Blocks after the first and second unit, never after the last.
    assert_eq!(engine.counters().io_interrupts, 2);
    let p = engine.process(ProcessId(0)).unwrap();
    assert_eq!(p.state, ProcessState::Terminated);
    assert_eq!(p.cpu_time, 3);
}

fn workloads() -> impl Strategy<Value = Vec<ProcessSpec>> {
    prop::collection::vec((0u64..15, 1u64..12), 1..7).prop_map(|jobs| {
        jobs.into_iter()
            .enumerate()
            .map(|(i, (arrival, burst))| ProcessSpec::cpu_bound(format!("p{i}"), arrival, burst))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn running_process_is_never_longer_than_a_ready_one(specs in workloads()) {
        let mut engine = CpuScheduler::new(config(specs, 0, 0)).unwrap();
        for _ in 0..MAX_TICKS {
            let outcome = engine.tick();
            let snap = engine.snapshot();
            if let Some(running) = snap.running.and_then(|id| snap.process(id)) {
                for ready in snap.processes.iter().filter(|p| p.state == ProcessState::Ready) {
                    prop_assert!(running.remaining_time <= ready.remaining_time);
                }
            }
            if outcome == TickOutcome::Completed {
                break;
            }
        }
        prop_assert!(engine.registry().all_terminated());
    }

    #[test]
    fn remaining_time_never_increases(specs in workloads(), switch in 0u32..3) {
        let total: u64 = specs.iter().map(|s| s.burst_time).sum();
        let mut engine = CpuScheduler::new(config(specs, switch, 0)).unwrap();
        let mut previous: Vec<u64> = engine.snapshot().processes.iter().map(|p| p.remaining_time).collect();
        loop {
            let outcome = engine.tick();
            let now: Vec<u64> = engine.snapshot().processes.iter().map(|p| p.remaining_time).collect();
            for (before, after) in previous.iter().zip(&now) {
                prop_assert!(after <= before);
                prop_assert!(before - after <= 1);
            }
            previous = now;
            if outcome == TickOutcome::Completed {
                break;
            }
        }
        prop_assert_eq!(engine.counters().busy_ticks, total);
        for p in engine.registry().iter() {
            let turnaround = p.turnaround_time.unwrap();
            prop_assert_eq!(turnaround, p.completion_time.unwrap() - p.arrival_time);
            prop_assert!(turnaround >= p.burst_time);
        }
    }

    #[test]
    fn terminated_processes_are_frozen(specs in workloads()) {
        let mut engine = CpuScheduler::new(config(specs, 1, 0)).unwrap();
        let mut frozen = std::collections::HashMap::new();
        loop {
            let outcome = engine.tick();
            for p in engine.registry().iter() {
                if p.state == ProcessState::Terminated {
                    let first = frozen.entry(p.id).or_insert_with(|| p.clone());
                    prop_assert_eq!(&*first, p);
                }
            }
            if outcome == TickOutcome::Completed {
                break;
            }
        }
    }
}
