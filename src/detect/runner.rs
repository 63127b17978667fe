use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDateTime;
use rayon::prelude::*;

use super::lows::{DetectionParams, find_lows};
use super::row::{AslRow, Candidate};
use super::select::select_per_time;
use crate::grid::{GridFrame, RegionMask};

/// Outcome of a full time-series run.
#[derive(Debug)]
pub struct RunReport {
    /// One row per input time step, in input time order.
    pub asl_rows: Vec<AslRow>,
    /// Every candidate low, across all time steps, in input time order.
    pub all_lows: Vec<Candidate>,
    /// Time steps whose detection failed and were downgraded to placeholders.
    pub failed_steps: Vec<NaiveDateTime>,
}

/// Runs detection + selection over all frames. Each time step is independent,
/// so the per-frame work fans out over `n_jobs` rayon workers (0 = rayon's
/// default); the shared mask is only ever borrowed read-only. Results are
/// reassembled in input order regardless of completion order. A failing time
/// step is logged and becomes a placeholder row instead of aborting the run.
pub fn run_detection(
    frames: &[GridFrame],
    mask: &RegionMask,
    params: &DetectionParams,
    n_jobs: usize,
) -> RunReport {
    let total = frames.len();
    let done = AtomicUsize::new(0);

    let per_frame = |frame: &GridFrame| -> Result<Vec<Candidate>, NaiveDateTime> {
        let result = mask
            .slice_to_match(frame)
            .map_err(Into::into)
            .and_then(|aligned| find_lows(frame, &aligned, params));

        let completed = done.fetch_add(1, Ordering::Relaxed) + 1;

        match result {
            Ok(candidates) => {
                log::debug!(
                    "time step {} ({}/{}): {} candidate low(s)",
                    frame.time().date(),
                    completed,
                    total,
                    candidates.len()
                );
                Ok(candidates)
            }
            Err(e) => {
                log::warn!(
                    "time step {} ({}/{}) failed, writing placeholder: {}",
                    frame.time().date(),
                    completed,
                    total,
                    e
                );
                Err(frame.time())
            }
        }
    };

    let outcomes: Vec<Result<Vec<Candidate>, NaiveDateTime>> = match build_pool(n_jobs) {
        Some(pool) => pool.install(|| frames.par_iter().map(per_frame).collect()),
        None => frames.iter().map(per_frame).collect(),
    };

    let mut all_lows = Vec::new();
    let mut failed_steps = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(candidates) => all_lows.extend(candidates),
            Err(time) => failed_steps.push(time),
        }
    }

    let times: Vec<NaiveDateTime> = frames.iter().map(|f| f.time()).collect();
    let asl_rows = select_per_time(&all_lows, &times, &params.asl_region);

    RunReport {
        asl_rows,
        all_lows,
        failed_steps,
    }
}

fn build_pool(n_jobs: usize) -> Option<rayon::ThreadPool> {
    if n_jobs == 1 {
        return None;
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(n_jobs)
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("could not build worker pool ({}), running serially", e);
            None
        }
    }
}
