//! Domain models for the production dashboard
//!
//! Contains the planning data model and its rules without any I/O concerns.

mod conversation;
mod factory;
mod id;
mod order;
mod plan;
mod schedule;
mod whatif;

pub use conversation::{
    commit_pending, extract_orders, merge_extracted_config, seeded_color, AnswerOutcome,
    CommitSummary, Conversation, ConversationMode, Message, MessagePart, ModeKind, Role,
};
pub use factory::{
    AuxiliaryResource, BatchConstraint, Constraints, FactoryConfig, Machine, MaintenanceConstraint,
    MultiOperatorConstraint, Operation, Operator, Product, ResourceAvailability, SetupTime, Shift,
    TemporalConstraint, TemporalKind,
};
pub use id::{new_id, EntityKind, IdError, TaskRef};
pub use order::{
    parse_instant, CleaningDetails, ColorChangeDetails, MaintenanceDetails, OrderStatus, OrderType,
    Priority, ProductionOrder, QualityControlDetails, ToolChangeDetails,
};
pub use plan::{
    palette_color, Availability, Interval, PlanError, SetupRule, SolveRequest, SolverJob,
    SolverLine, SolverOperator, SolverTask, JOB_PALETTE,
};
pub use schedule::{
    flatten_solver_tasks, minutes_from, shift_start, shift_start_on, ScheduleResult,
    ScheduledTask, SHIFT_START_HOUR,
};
pub use whatif::{
    format_minute_of_shift, GlobalMetrics, ImpactAnalysis, ImpactStatus, JobImpact, Modification,
    Scenario, ScenarioStatus,
};
