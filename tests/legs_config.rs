use oforks::{
    class::{
        Class, ClassError,
        legs::{LegInfo, LegTable},
    },
    config::EngineConfig,
    types::{LegType, StartType},
};

fn relay(types: &[LegType]) -> LegTable {
    LegTable::from_legs(
        types
            .iter()
            .map(|&t| LegInfo::new(StartType::MassChange, t))
            .collect(),
    )
}

fn leg(start_type: StartType, leg_type: LegType) -> LegInfo {
    LegInfo::new(start_type, leg_type)
}

#[test]
fn parallel_legs_number_as_sub_legs() {
    let table = relay(&[LegType::Normal, LegType::Parallel, LegType::Parallel, LegType::Normal]);

    let true_legs: Vec<_> = (0..4).filter_map(|l| table.true_leg(l)).collect();
    assert_eq!(true_legs, vec![1, 1, 1, 2]);

    let letters: Vec<_> = (0..4).map(|l| table.sub_leg_letter(l)).collect();
    assert_eq!(letters, vec![None, Some('a'), Some('b'), None]);

    let labels: Vec<_> = (0..4).filter_map(|l| table.label(l)).collect();
    assert_eq!(labels, ["1", "1a", "1b", "2"]);
    assert_eq!(table.true_leg_members(1), 0..3);
}

#[test]
fn changing_a_leg_type_renumbers_following_legs() {
    let mut table = relay(&[LegType::Normal, LegType::Parallel, LegType::Normal, LegType::Normal]);
    assert!(!table.is_changed());

    table.set_leg_type(2, LegType::Parallel).expect("leg 3");
    assert!(table.take_changed());
    assert_eq!(table.label(2).as_deref(), Some("1b"));
    assert_eq!(table.label(3).as_deref(), Some("2"));

    table.set_leg_type(2, LegType::Parallel).expect("same type");
    assert!(!table.is_changed(), "setting the same type is not a change");

    assert_eq!(
        table.set_leg_type(4, LegType::Extra),
        Err(ClassError::LegOutOfRange { leg: 4, legs: 4 })
    );
}

#[test]
fn non_strict_check_resets_conflicting_parallel_starts() {
    let mut table = LegTable::from_legs(vec![
        leg(StartType::FixedClock, LegType::Normal),
        leg(StartType::Pursuit, LegType::Parallel),
        leg(StartType::MassChange, LegType::Normal),
        leg(StartType::MassChange, LegType::Parallel),
        leg(StartType::Pursuit, LegType::ParallelOptional),
    ]);

    assert_eq!(table.check_start_method(false), Ok(vec![1, 4]));
    assert_eq!(table.start_type(1), Some(StartType::DrawnLot));
    assert_eq!(table.start_type(3), Some(StartType::MassChange));
    assert_eq!(table.start_type(4), Some(StartType::DrawnLot));
    assert!(table.is_changed());

    assert_eq!(table.check_start_method(false), Ok(vec![]));
}

#[test]
fn strict_check_reports_first_leg_and_changes_nothing() {
    let mut table = LegTable::from_legs(vec![
        leg(StartType::DrawnLot, LegType::Normal),
        leg(StartType::DrawnLot, LegType::Parallel),
        leg(StartType::MassChange, LegType::Parallel),
        leg(StartType::Pursuit, LegType::Parallel),
    ]);
    let before = table.clone();

    assert_eq!(
        table.check_start_method(true),
        Err(ClassError::InconsistentStartMethod { leg: 2 })
    );
    assert_eq!(table, before);
}

#[test]
fn class_check_follows_configured_strictness() {
    let config = EngineConfig {
        strict_start_method: true,
        ..EngineConfig::default()
    };
    let mut class = Class::new(7, "Strict", config);
    class.set_num_stages(2);
    class.legs_mut().set_leg_type(1, LegType::Parallel).expect("leg 2");
    class.legs_mut().set_start_type(1, StartType::MassChange).expect("leg 2");

    assert_eq!(
        class.check_start_method(),
        Err(ClassError::InconsistentStartMethod { leg: 1 })
    );
    assert_eq!(class.legs().start_type(1), Some(StartType::MassChange));
}

#[test]
fn duplicate_runner_links_point_backwards_and_collapse() {
    let mut table = relay(&[LegType::Normal; 4]);

    assert_eq!(
        table.link_duplicate_runner(1, Some(1)),
        Err(ClassError::InvalidRunnerLink { leg: 1, target: 1 })
    );
    assert_eq!(
        table.link_duplicate_runner(1, Some(3)),
        Err(ClassError::InvalidRunnerLink { leg: 1, target: 3 })
    );
    assert_eq!(
        table.link_duplicate_runner(9, Some(0)),
        Err(ClassError::LegOutOfRange { leg: 9, legs: 4 })
    );

    table.link_duplicate_runner(2, Some(0)).expect("leg 3 -> leg 1");
    table.link_duplicate_runner(3, Some(2)).expect("leg 4 -> leg 3");
    assert_eq!(table.leg(3).and_then(|l| l.duplicate_runner), Some(0));
    assert_eq!(table.runner_defining_leg(3), Some(0));
    assert_eq!(table.runner_defining_leg(1), Some(1));

    table.link_duplicate_runner(3, None).expect("unlink");
    assert_eq!(table.runner_defining_leg(3), Some(3));
}

#[test]
fn imported_links_are_normalized() {
    let mut first = leg(StartType::MassChange, LegType::Normal);
    first.duplicate_runner = Some(2);
    let mut second = leg(StartType::MassChange, LegType::Normal);
    second.duplicate_runner = Some(0);
    let mut third = leg(StartType::MassChange, LegType::Normal);
    third.duplicate_runner = Some(1);

    let table = LegTable::from_legs(vec![first, second, third]);
    assert_eq!(table.leg(0).and_then(|l| l.duplicate_runner), None);
    assert_eq!(table.leg(1).and_then(|l| l.duplicate_runner), Some(0));
    assert_eq!(table.leg(2).and_then(|l| l.duplicate_runner), Some(0));
}

#[test]
fn stage_count_keeps_legs_and_fork_rows_aligned() {
    let mut class = Class::new(1, "Relay", EngineConfig::default());
    assert_eq!(class.num_stages(), 1);
    assert_eq!(class.forks().len(), 1);

    class.set_num_stages(4);
    assert_eq!(class.legs().len(), 4);
    assert_eq!(class.forks().len(), 4);
    class.forks_mut().set_row(3, vec![11, 12]).expect("leg 4");

    class.set_num_stages(2);
    assert_eq!(class.legs().len(), 2);
    assert_eq!(class.forks().len(), 2);

    class.set_num_stages(3);
    assert!(class.forks().row(2).is_empty(), "dropped rows do not come back");
    assert_eq!(class.legs().leg_type(2), Some(LegType::Normal));
}
