//! Multi-stage race structure, course forking and split-time leaderboards
//! for orienteering classes.
//!
//! # Examples
//!
//! Configure a three-leg relay, fork two courses over the legs and read the
//! fork assigned to start number 2:
//! ```
//! use oforks::{
//!     class::Class,
//!     config::EngineConfig,
//!     course::{Course, CourseRegistry},
//!     types::StartType,
//! };
//!
//! let mut registry = CourseRegistry::new();
//! registry.add_simple_controls([31, 32, 33, 34]).expect("controls");
//! registry.add_course(Course::new(1, "A", vec![31, 32, 33])).expect("course A");
//! registry.add_course(Course::new(2, "B", vec![31, 34, 33])).expect("course B");
//!
//! let mut relay = Class::new(1, "H21 relay", EngineConfig::default());
//! relay.set_num_stages(2);
//! relay.legs_mut().set_start_type(1, StartType::MassChange).expect("leg 2");
//!
//! let outcome = relay
//!     .auto_fork(&[vec![1, 2], vec![1, 2]], 10, &registry)
//!     .expect("forking");
//! assert_eq!(outcome.forks, 2);
//! assert!(relay.check_forking(&registry).is_fair());
//!
//! let first = relay.select_course(0, 2, &[], &registry);
//! let second = relay.select_course(1, 2, &[], &registry);
//! assert_ne!(first, second);
//! ```
//!
//! Leader times and split places for a set of results:
//! ```
//! use oforks::{
//!     class::Class,
//!     config::EngineConfig,
//!     course::{Course, CourseRegistry},
//!     result::RunnerResult,
//!     revision::RevisionCounter,
//! };
//!
//! let mut registry = CourseRegistry::new();
//! registry.add_simple_controls([31]).expect("controls");
//! registry.add_course(Course::new(1, "A", vec![31])).expect("course");
//!
//! let mut class = Class::new(1, "D21", EngineConfig::default());
//! let mut revisions = RevisionCounter::new();
//! let results: Vec<RunnerResult> = [(1, 600), (2, 540)]
//!     .into_iter()
//!     .map(|(runner, time)| RunnerResult {
//!         course: Some(1),
//!         punches: vec![Some(time / 2)],
//!         ..RunnerResult::finished(runner, 0, 0, time)
//!     })
//!     .collect();
//!
//! let board = class.update_leader_times(&results, revisions.bump(), &registry);
//! assert_eq!(board.best_leg_time(0), Some(540));
//! assert_eq!(board.accumulated_place(1, 1, 540), Some(1));
//! assert_eq!(board.leg_place(31, u32::MAX, 300), Some(2));
//! ```

/// Classes, leg descriptors and fork tables.
pub mod class;
/// Engine configuration.
pub mod config;
/// Shared lookup structures.
pub mod core;
/// Controls, courses and their registry.
pub mod course;
/// Forking, fairness and leaderboard engines.
pub mod engine;
/// Inbound runner results.
pub mod result;
/// Data revision snapshots.
pub mod revision;
/// Shared primitive types and enums.
pub mod types;
