use hashbrown::HashSet;

use oforks::{
    class::{Class, ClassError},
    config::EngineConfig,
    course::{Course, CourseRegistry},
    engine::{
        fairness::{check_forking, combinations_run},
        forking::{ForkError, plan_forking},
    },
    result::RunnerResult,
    types::{CourseId, LegType},
};

const A: CourseId = 1;
const B: CourseId = 2;
const C: CourseId = 3;
const A_COPY: CourseId = 8;

fn registry() -> CourseRegistry {
    let mut reg = CourseRegistry::new();
    reg.add_simple_controls(31..=40).expect("controls");
    for (id, controls) in [
        (A, vec![31, 32, 33, 34]),
        (B, vec![31, 33, 32, 34]),
        (C, vec![31, 35, 36, 34]),
        (A_COPY, vec![31, 32, 33, 34]),
    ] {
        reg.add_course(Course::new(id, format!("course {id}"), controls))
            .expect("course");
    }
    reg
}

fn relay(legs: usize) -> Class {
    let mut class = Class::new(1, "Relay", EngineConfig::default());
    class.set_num_stages(legs);
    class
}

#[test]
fn three_courses_on_three_legs_yield_all_permutations() {
    let reg = registry();
    let mut class = relay(3);
    let abc = vec![A, B, C];

    let outcome = class
        .auto_fork(&[abc.clone(), abc.clone(), abc], 6, &reg)
        .expect("forking");
    assert_eq!(outcome.forks, 6);
    assert_eq!(outcome.courses_used, 3);

    let combos = class.fork_combinations();
    assert_eq!(combos.len(), 6);
    let distinct: HashSet<Vec<CourseId>> = combos.iter().cloned().collect();
    assert_eq!(distinct.len(), 6);
    for combo in &combos {
        let mut sorted = combo.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![A, B, C]);
    }

    for leg in 0..3 {
        let row = class.forks().row(leg);
        for course in [A, B, C] {
            assert_eq!(row.iter().filter(|&&c| c == course).count(), 2);
        }
    }
    for pair in class.forks().row(0).windows(2) {
        assert_ne!(pair[0], pair[1], "equal first-leg courses are spread apart");
    }

    let report = class.check_forking(&reg);
    assert!(report.is_fair());
    assert_eq!(report.combinations.len(), 6);
}

#[test]
fn fork_count_is_capped_by_target_and_by_matching_combinations() {
    let reg = registry();
    let abc = vec![A, B, C];
    let candidates = [abc.clone(), abc.clone(), abc];

    let mut small = relay(3);
    let outcome = small.auto_fork(&candidates, 4, &reg).expect("forking");
    assert_eq!(outcome.forks, 4);
    assert!(small.forks().rows().iter().all(|row| row.len() == 4));

    let mut large = relay(3);
    let outcome = large.auto_fork(&candidates, 20, &reg).expect("forking");
    assert_eq!(outcome.forks, 6);
}

#[test]
fn planning_is_deterministic_for_a_seed() {
    let reg = registry();
    let abc = vec![A, B, C];
    let candidates = [abc.clone(), abc.clone(), abc];
    let config = EngineConfig::default();

    let first = plan_forking(&candidates, 6, &reg, &config).expect("forking");
    let second = plan_forking(&candidates, 6, &reg, &config).expect("forking");
    assert_eq!(first, second);
}

#[test]
fn identical_course_keys_are_always_fair() {
    let reg = registry();
    let mut class = relay(2);
    let outcome = class
        .auto_fork(&[vec![A, A_COPY], vec![A, A_COPY]], 3, &reg)
        .expect("forking");
    assert_eq!(outcome.forks, 3);

    let report = check_forking(&class.fork_combinations(), &reg);
    assert!(report.unfair_pairs().is_empty());
}

#[test]
fn single_candidates_are_copied_and_empty_legs_untouched() {
    let reg = registry();
    let mut class = relay(3);
    class.forks_mut().set_row(2, vec![C]).expect("row");

    let outcome = class
        .auto_fork(&[vec![A, A_COPY], vec![B], vec![]], 2, &reg)
        .expect("forking");
    assert_eq!(outcome.forks, 2);
    assert_eq!(outcome.rows[2], None);

    let mut first = class.forks().row(0).to_vec();
    first.sort_unstable();
    assert_eq!(first, vec![A, A_COPY]);
    assert_eq!(class.forks().row(1), &[B]);
    assert_eq!(class.forks().row(2), &[C]);
}

#[test]
fn extra_leg_without_candidates_inherits_its_true_leg_row() {
    let reg = registry();
    let mut class = relay(3);
    class.legs_mut().set_leg_type(1, LegType::Extra).expect("leg 2");

    class
        .auto_fork(&[vec![A, B], vec![], vec![A, B]], 2, &reg)
        .expect("forking");
    assert_eq!(class.forks().row(1), class.forks().row(0));
    assert_eq!(class.forks().row(0).len(), 2);
}

#[test]
fn invalid_requests_leave_the_table_alone() {
    let reg = registry();
    let mut class = relay(2);
    class.forks_mut().set_row(0, vec![C]).expect("row");
    let before = class.forks().clone();

    assert!(matches!(
        class.auto_fork(&[vec![A, B], vec![A, B]], 0, &reg),
        Err(ClassError::Fork(ForkError::InvalidMethod(_)))
    ));
    assert!(matches!(
        class.auto_fork(&[vec![A], vec![B]], 4, &reg),
        Err(ClassError::Fork(ForkError::InvalidMethod(_)))
    ));
    assert_eq!(
        class.auto_fork(&[vec![A, 99], vec![A, B]], 4, &reg),
        Err(ClassError::Fork(ForkError::UnknownCourse(99)))
    );
    assert_eq!(
        class.auto_fork(&[vec![A, B], vec![A, B], vec![A, B]], 4, &reg),
        Err(ClassError::LegOutOfRange { leg: 2, legs: 2 })
    );
    assert_eq!(class.forks(), &before);
}

#[test]
fn sampled_search_still_produces_a_fair_forking() {
    let reg = registry();
    let config = EngineConfig {
        fork_enumeration_limit: 10,
        ..EngineConfig::default()
    };
    let mut class = Class::new(2, "Sampled", config);
    class.set_num_stages(3);
    let abc = vec![A, B, C];

    let outcome = class
        .auto_fork(&[abc.clone(), abc.clone(), abc], 6, &reg)
        .expect("forking");
    assert!(outcome.forks >= 1);
    assert!(class.check_forking(&reg).is_fair());
}

#[test]
fn unfair_combinations_report_the_differing_legs() {
    let reg = registry();
    let report = check_forking(&[vec![A, B], vec![A, A], vec![A, B]], &reg);

    assert_eq!(report.combinations.len(), 2, "duplicates are reported once");
    assert!(report.combinations[0].unfair_pairs.is_empty());
    let unfair = &report.combinations[1].unfair_pairs;
    assert!(unfair.contains(&(31, 32)));
    assert!(unfair.contains(&(31, 33)));
    assert!(!unfair.contains(&(0, 31)), "start leg is run once per course in both");
    assert!(!report.is_fair());
}

#[test]
fn combinations_run_groups_results_by_team() {
    let result = |team: u64, leg: usize, course: CourseId| RunnerResult {
        team: Some(team),
        course: Some(course),
        ..RunnerResult::finished(team * 10 + leg as u64, leg, 0, 100)
    };
    let results = vec![
        result(2, 1, A),
        result(1, 0, A),
        result(2, 0, B),
        result(1, 1, B),
        RunnerResult::finished(99, 0, 0, 100),
    ];

    assert_eq!(combinations_run(&results), vec![vec![B, A], vec![A, B]]);
    assert!(check_forking(&combinations_run(&results), &registry()).is_fair());
}
