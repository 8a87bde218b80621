//! Domain services for the focus workspace. Every mutating operation honors
//! the mutation-log contract: after the store write succeeds, exactly one
//! action-ledger entry is enqueued per logical mutation, and a ledger
//! failure never fails the mutation.

pub mod actions;
pub mod goals;
pub mod ledger;
pub mod projects;
pub mod registry;
pub mod tasks;
pub mod tools;

use std::sync::Arc;

use focus_store::Database;

use crate::actions::ActionService;
use crate::goals::GoalService;
use crate::ledger::ActionLogger;
use crate::projects::ProjectService;
use crate::tasks::TaskService;

/// Bundle of the domain services shared by the REST and protocol surfaces.
#[derive(Clone)]
pub struct Services {
    pub tasks: Arc<TaskService>,
    pub projects: Arc<ProjectService>,
    pub goals: Arc<GoalService>,
    pub actions: Arc<ActionService>,
}

impl Services {
    pub fn new(db: Database, logger: ActionLogger) -> Self {
        Self {
            tasks: Arc::new(TaskService::new(db.clone(), logger.clone())),
            projects: Arc::new(ProjectService::new(db.clone(), logger.clone())),
            goals: Arc::new(GoalService::new(db.clone(), logger)),
            actions: Arc::new(ActionService::new(db)),
        }
    }
}
