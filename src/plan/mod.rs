use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::characterize::{characterize, CharacterizationEngine, CharacterizationResult};
use crate::cli::progress::StepContext;
use crate::config::{FakeramConfig, MemoryRequest, ProcessProfile};
use crate::layout::{plan_layout, PinLayoutPlan};
use crate::lef::save_lef;
use crate::liberty::save_lib;
use crate::paths::{out_lef, out_lib, out_results_dir, out_verilog, out_verilog_bb};
use crate::verilog::{save_verilog, save_verilog_bb};
use crate::Result;

/// Everything computed for one macro before any view is written.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPlan {
    pub request: MemoryRequest,
    pub result: CharacterizationResult,
    pub layout: PinLayoutPlan,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Characterize,
    PlanLayout,
    GenerateLef,
    GenerateLib,
    GenerateVerilog,
    All,
}

impl TaskKey {
    /// Tasks that run regardless of which views are requested.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Characterize | Self::PlanLayout)
    }

    pub fn enabled_in(&self, tasks: &HashSet<TaskKey>) -> bool {
        tasks.contains(self) || tasks.contains(&TaskKey::All)
    }
}

pub struct GeneratePlanParams<'a> {
    pub work_dir: &'a Path,
    pub process: &'a ProcessProfile,
    pub request: &'a MemoryRequest,
    pub engine: &'a dyn CharacterizationEngine,
    pub ctx: Option<&'a mut StepContext>,
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub process: &'a ProcessProfile,
    pub plan: &'a MemoryPlan,
    pub tasks: &'a HashSet<TaskKey>,
    pub ctx: Option<&'a mut StepContext>,
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

macro_rules! try_execute_task {
    ( $tasks:expr, $task:expr, $body:expr, $ctx:expr) => {
        if $task.enabled_in($tasks) {
            $body;
            try_finish_task!($ctx, $task);
        }
    };
}

/// Characterizes a memory and lays out its pins.
pub fn generate_plan(params: GeneratePlanParams) -> Result<MemoryPlan> {
    let GeneratePlanParams {
        work_dir,
        process,
        request,
        engine,
        mut ctx,
    } = params;

    std::fs::create_dir_all(work_dir)
        .with_context(|| format!("failed to create {work_dir:?}"))?;

    let result = characterize(process, request, engine, work_dir)?;
    log::info!(
        "{}: {:.3} um x {:.3} um, access {:.3} ns, cycle {:.3} ns",
        request.name,
        result.snapped_width_um(),
        result.snapped_height_um(),
        result.access_time_ns,
        result.cycle_time_ns
    );
    try_finish_task!(ctx, TaskKey::Characterize);

    let layout = plan_layout(process, request, &result)?;
    try_finish_task!(ctx, TaskKey::PlanLayout);

    Ok(MemoryPlan {
        request: request.clone(),
        result,
        layout,
    })
}

/// Writes the requested views of `plan` into `work_dir`.
pub fn execute_plan(params: ExecutePlanParams) -> Result<()> {
    let ExecutePlanParams {
        work_dir,
        process,
        plan,
        tasks,
        mut ctx,
    } = params;

    std::fs::create_dir_all(work_dir)?;
    let name = plan.request.name.as_str();

    try_execute_task!(
        tasks,
        TaskKey::GenerateLef,
        save_lef(out_lef(work_dir, name), &plan.request, &plan.layout)
            .with_context(|| format!("failed to write LEF for {name}"))?,
        ctx
    );
    try_execute_task!(
        tasks,
        TaskKey::GenerateLib,
        save_lib(out_lib(work_dir, name), process, &plan.request, &plan.result)
            .with_context(|| format!("failed to write LIB for {name}"))?,
        ctx
    );
    try_execute_task!(
        tasks,
        TaskKey::GenerateVerilog,
        {
            save_verilog(out_verilog(work_dir, name), &plan.request)
                .with_context(|| format!("failed to write Verilog for {name}"))?;
            save_verilog_bb(out_verilog_bb(work_dir, name), &plan.request)
                .with_context(|| format!("failed to write Verilog black box for {name}"))?;
        },
        ctx
    );

    Ok(())
}

/// Outcome of generating one memory of a configuration.
#[derive(Debug)]
pub struct MemoryOutcome {
    pub name: String,
    pub work_dir: PathBuf,
    pub result: Result<MemoryPlan>,
}

/// Generates every memory of `config` in order.
///
/// A failing memory does not stop the others. Entries rejected while
/// loading the configuration are reported as failed outcomes. With
/// `progress` set, each memory gets its own [`StepContext`].
pub fn generate_all(
    config: &FakeramConfig,
    engine: &dyn CharacterizationEngine,
    output_dir: &Path,
    tasks: &HashSet<TaskKey>,
    progress: bool,
) -> Vec<MemoryOutcome> {
    config
        .memories
        .iter()
        .map(|entry| {
            let work_dir = out_results_dir(output_dir, &entry.name);
            let result = match &entry.request {
                Ok(request) => {
                    let mut ctx = progress.then(|| StepContext::new(&request.name, tasks));
                    let res = generate_memory(
                        &config.process,
                        request,
                        engine,
                        &work_dir,
                        tasks,
                        ctx.as_mut(),
                    );
                    match ctx.as_mut() {
                        Some(ctx) => ctx.check(res),
                        None => res,
                    }
                }
                Err(e) => Err(anyhow::Error::from(e.clone())),
            };
            if let Err(e) = &result {
                log::error!("{}: {e:#}", entry.name);
            }
            MemoryOutcome {
                name: entry.name.clone(),
                work_dir,
                result,
            }
        })
        .collect()
}

pub fn generate_memory(
    process: &ProcessProfile,
    request: &MemoryRequest,
    engine: &dyn CharacterizationEngine,
    work_dir: &Path,
    tasks: &HashSet<TaskKey>,
    mut ctx: Option<&mut StepContext>,
) -> Result<MemoryPlan> {
    let plan = generate_plan(GeneratePlanParams {
        work_dir,
        process,
        request,
        engine,
        ctx: ctx.as_deref_mut(),
    })?;
    execute_plan(ExecutePlanParams {
        work_dir,
        process,
        plan: &plan,
        tasks,
        ctx: ctx.as_deref_mut(),
    })?;
    Ok(plan)
}
