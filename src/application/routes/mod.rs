//! Route lifecycle: planning, execution and ETA management

mod engine;
mod eta;
mod planner;

pub use engine::{CompleteStopRequest, RouteEngine, StopCompletionOutcome};
pub use eta::{EtaRecalculator, RecalcOutcome, DEVIATION_GATE_MINUTES};
pub use planner::{OptimizeRouteOptions, OptimizeRouteResult, RoutePlanner};
