// src/lib.rs
// Point d'entrée de la bibliothèque de l'ordonnanceur hybride
#![cfg_attr(not(test), no_std)] // Pas de bibliothèque standard hors tests

// Import de alloc pour les allocations dynamiques
extern crate alloc;

// Modules
pub mod logger;
pub mod scheduler;
pub mod time;

pub use scheduler::core::{
    CpuId, CpuMask, FairClassError, HybridError, HybridStats, HybridStatsSnapshot, SchedClass, SchedResult,
};
pub use scheduler::hybrid::{
    Coordinator, DemotionCause, EventLog, FairClass, FastClassEntry, FastRunQueue, FifoFairClass,
    HybridConfig, Pick, TaskClassState, TaskRegistry, TaskSnapshot, TickOutcome, TransitionEvent,
    TransitionKind,
};
pub use scheduler::task::{Task, TaskId, TaskRef, TaskState};
pub use time::{Clock, Duration, ManualClock, Timestamp};
