/*
ENSnano, a 3d graphical application for DNA nanostructures.
    Copyright (C) 2021  Nicolas Levy <nicolaspierrelevy@gmail.com> and Nicolas Schabanel <nicolas.schabanel@ens-lyon.fr>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use super::design_operations::*;
use super::palette::*;
use super::*;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;


fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn strict() -> TopologyPolicy {
    TopologyPolicy::default()
}

fn lenient() -> TopologyPolicy {
    TopologyPolicy {
        prohibit_single_base_crossovers: false,
    }
}

/// A part of 8 bases with an even helix at (0, 0) and an odd helix at (0, 1).
fn two_helix_part() -> (Part, HelixId, HelixId) {
    let mut part = Part::with_policy(8, strict());
    let a = part.add_helix(HelixCoord::new(0, 0)).unwrap();
    let b = part.add_helix(HelixCoord::new(0, 1)).unwrap();
    (part, a, b)
}

fn ends(track: &StrandTrack) -> (Vec<usize>, Vec<usize>) {
    (
        track.five_prime_ends().collect(),
        track.three_prime_ends().collect(),
    )
}

fn even_helix(num_bases: usize) -> DetachedHelix {
    DetachedHelix::with_policy(0, num_bases, strict())
}

fn staple(part: &Part, helix: HelixId) -> &StrandTrack {
    part.helix(helix).unwrap().track(StrandType::Staple)
}

#[test]
fn directionality_follows_parity() {
    let (part, a, b) = two_helix_part();
    let even = part.helix(a).unwrap();
    let odd = part.helix(b).unwrap();
    assert_eq!(even.parity(), Parity::Even);
    assert_eq!(odd.parity(), Parity::Odd);
    assert!(even.runs_five_to_three(StrandType::Scaffold));
    assert!(!even.runs_five_to_three(StrandType::Staple));
    assert!(!odd.runs_five_to_three(StrandType::Scaffold));
    assert!(odd.runs_five_to_three(StrandType::Staple));
    assert_eq!(Parity::from_coord(HelixCoord::new(3, 5)), Parity::Even);
    assert_eq!(Parity::from_coord(HelixCoord::new(-1, 0)), Parity::Odd);
}

#[test]
fn connect_sets_ends_by_orientation() {
    init_logger();
    let mut helix = even_helix(8);
    {
        let mut session = helix.session().unwrap();
        session.connect(StrandType::Scaffold, 2, 6).unwrap();
        session.connect(StrandType::Staple, 0, 7).unwrap();
    }
    let scaffold = helix.track(StrandType::Scaffold).unwrap();
    assert_eq!(ends(scaffold), (vec![2], vec![6]));
    assert_eq!(scaffold.state_at(2), Some(BaseState::End5Prime));
    assert_eq!(scaffold.state_at(4), Some(BaseState::Connected));
    assert_eq!(scaffold.state_at(6), Some(BaseState::End3Prime));
    assert_eq!(scaffold.state_at(1), Some(BaseState::Empty));
    assert_eq!(scaffold.state_at(8), None);
    assert!(scaffold.has_end_at(6) && !scaffold.has_end_at(4));
    assert_eq!(scaffold.prime5_link(2), None);
    assert_eq!(scaffold.prime3_link(2), Some(Link::Natural));
    assert_eq!(StrandType::Scaffold.complement(), StrandType::Staple);

    let staple = helix.track(StrandType::Staple).unwrap();
    assert_eq!(ends(staple), (vec![7], vec![0]));
    assert_eq!(helix.history().len(), 2);
}

#[test]
fn clear_splits_a_run_and_undo_joins_it() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 2, 6).unwrap();
    session.connect(StrandType::Staple, 0, 7).unwrap();
    let staple_before = session.track(StrandType::Staple).unwrap().clone();

    session.clear(StrandType::Scaffold, 3.5, 4.5).unwrap();
    let scaffold = session.track(StrandType::Scaffold).unwrap();
    assert_eq!(ends(scaffold), (vec![2, 5], vec![3, 6]));
    assert!(!scaffold.has_base_at(4));
    let runs: Vec<(usize, usize)> = scaffold
        .runs()
        .map(|r| (r.five_prime(), r.three_prime()))
        .collect();
    assert_eq!(runs, vec![(2, 3), (5, 6)]);

    assert!(session.history().can_undo());
    assert!(session.undo().unwrap());
    let scaffold = session.track(StrandType::Scaffold).unwrap();
    assert_eq!(ends(scaffold), (vec![2], vec![6]));
    assert_eq!(scaffold.state_at(4), Some(BaseState::Connected));
    assert_eq!(session.track(StrandType::Staple).unwrap(), &staple_before);
}

#[test]
fn connect_rejects_bad_spans() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    for (from, to) in [(3, 3), (5, 2), (-1, 4), (0, 8)].iter() {
        let result = session.connect(StrandType::Scaffold, *from, *to);
        assert!(
            matches!(result, Err(ModelError::Range(RangeViolation::Span { .. }))),
            "{:?} accepted",
            (from, to)
        );
    }
    assert!(session.history().is_empty());
    assert!(session.track(StrandType::Scaffold).unwrap().is_blank());
}

#[test]
fn connect_merges_overlapping_runs() {
    let mut helix = even_helix(10);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 2, 4).unwrap();
    session.connect(StrandType::Scaffold, 3, 6).unwrap();
    session.connect(StrandType::Scaffold, 8, 9).unwrap();
    let runs: Vec<Run> = session.track(StrandType::Scaffold).unwrap().runs().collect();
    assert_eq!(runs.len(), 2);
    assert_eq!((runs[0].low(), runs[0].high()), (2, 6));
    assert_eq!(runs[1].len(), 2);
}

#[test]
fn clear_around_a_new_run_restores_the_track() {
    let mut helix = even_helix(12);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Staple, 0, 1).unwrap();
    session.connect(StrandType::Staple, 10, 11).unwrap();
    for (i, j) in [(3, 6), (2, 9), (4, 5)].iter() {
        let before = session.track(StrandType::Staple).unwrap().clone();
        session.connect(StrandType::Staple, *i, *j).unwrap();
        session
            .clear(StrandType::Staple, *i as f64 - 0.5, *j as f64 + 0.5)
            .unwrap();
        assert_eq!(session.track(StrandType::Staple).unwrap(), &before);
    }
}

#[test]
fn clear_rounds_bounds_half_up() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 2, 6).unwrap();
    // both bounds round to 3.5: only the link between 3 and 4 is cut
    session.clear(StrandType::Scaffold, 3.25, 3.3).unwrap();
    let scaffold = session.track(StrandType::Scaffold).unwrap();
    assert_eq!(ends(scaffold), (vec![2, 4], vec![3, 6]));
    assert!(scaffold.has_base_at(3) && scaffold.has_base_at(4));

    // reversed bounds, clamped to the track
    session.clear(StrandType::Scaffold, 100., -100.).unwrap();
    assert!(session.track(StrandType::Scaffold).unwrap().is_blank());

    assert!(matches!(
        session.clear(StrandType::Scaffold, f64::NAN, 2.),
        Err(ModelError::Range(RangeViolation::NonFiniteBound(_)))
    ));
}

#[test]
fn clear_removes_loops_of_emptied_bases() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 1, 5).unwrap();
    session.set_loop_or_skip(StrandType::Scaffold, 3, 2).unwrap();
    session.set_loop_or_skip(StrandType::Scaffold, 5, -1).unwrap();
    session.clear(StrandType::Scaffold, 3., 3.).unwrap();
    let scaffold = session.track(StrandType::Scaffold).unwrap();
    assert_eq!(scaffold.loops().get(3), None);
    assert_eq!(scaffold.loops().get(5), Some(-1));

    session.undo().unwrap();
    assert_eq!(
        session.track(StrandType::Scaffold).unwrap().loops().get(3),
        Some(2)
    );
}

#[test]
fn zero_count_removes_the_ledger_entry() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.set_loop_or_skip(StrandType::Staple, 4, 3).unwrap();
    session.set_loop_or_skip(StrandType::Staple, 4, -1).unwrap();
    assert_eq!(
        session.track(StrandType::Staple).unwrap().loops().get(4),
        Some(-1)
    );
    session.set_loop_or_skip(StrandType::Staple, 4, 0).unwrap();
    let loops = session.track(StrandType::Staple).unwrap().loops();
    assert_eq!(loops.iter().count(), 0);
    assert!(loops.is_empty());

    assert!(matches!(
        session.set_loop_or_skip(StrandType::Staple, 8, 1),
        Err(ModelError::Range(RangeViolation::Index {
            index: 8,
            num_bases: 8
        }))
    ));
    session.undo().unwrap();
    assert_eq!(
        session.track(StrandType::Staple).unwrap().loops().get(4),
        Some(-1)
    );
}

#[test]
fn grow_then_shrink_restores_content() {
    let mut helix = even_helix(8);
    {
        let mut session = helix.session().unwrap();
        session.connect(StrandType::Scaffold, 2, 7).unwrap();
        session.set_loop_or_skip(StrandType::Staple, 7, 1).unwrap();
    }
    let before = helix.helix().unwrap().clone();

    let mut session = helix.session().unwrap();
    session.set_num_bases(12).unwrap();
    assert_eq!(session.helix().unwrap().num_bases(), 12);
    assert_eq!(
        session.history().undo_label().unwrap().to_string(),
        "Set number of bases"
    );
    session.set_num_bases(8).unwrap();
    assert_eq!(session.helix().unwrap(), &before);
    assert_eq!(
        session.history().undo_label().unwrap().to_string(),
        "Changing the number of bases"
    );

    session.undo().unwrap();
    assert_eq!(session.helix().unwrap().num_bases(), 12);
    session.undo().unwrap();
    assert_eq!(session.helix().unwrap(), &before);
}

#[test]
fn shrink_is_undone_in_one_step() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 2, 6).unwrap();
    session.set_loop_or_skip(StrandType::Scaffold, 6, 2).unwrap();
    let before = session.helix().unwrap().clone();

    session.set_num_bases(5).unwrap();
    let scaffold = session.track(StrandType::Scaffold).unwrap();
    assert_eq!(scaffold.num_bases(), 5);
    assert_eq!(ends(scaffold), (vec![2], vec![4]));
    assert!(scaffold.loops().is_empty());

    assert_eq!(session.history().len(), 3);
    session.undo().unwrap();
    assert_eq!(session.helix().unwrap(), &before);
    session.redo().unwrap();
    assert_eq!(session.helix().unwrap().num_bases(), 5);
}

#[test]
fn attached_helices_follow_the_part_length() {
    let (mut part, a, b) = two_helix_part();
    assert!(matches!(
        part.session(a).unwrap().set_num_bases(10),
        Err(ModelError::Consistency(
            ConsistencyViolation::BaseCountMismatch {
                expected: 8,
                found: 10
            }
        ))
    ));

    part.session(b).unwrap().connect(StrandType::Staple, 4, 7).unwrap();
    part.set_num_bases(10).unwrap();
    assert_eq!(part.num_bases(), 10);
    assert_eq!(part.helix(a).unwrap().num_bases(), 10);
    part.set_num_bases(6).unwrap();
    assert_eq!(ends(staple(&part, b)), (vec![4], vec![5]));

    part.undo().unwrap();
    assert_eq!(part.num_bases(), 10);
    assert_eq!(ends(staple(&part, b)), (vec![4], vec![7]));
    part.undo().unwrap();
    assert_eq!(part.num_bases(), 8);
    assert_eq!(part.helix(b).unwrap().num_bases(), 8);
}

/// Staple runs `[2, 7]` on both helices: 3' end at 2 on the even helix, 5' end at 2 on the odd
/// one.
fn part_with_facing_ends() -> (Part, HelixId, HelixId) {
    let (mut part, a, b) = two_helix_part();
    part.session(a).unwrap().connect(StrandType::Staple, 2, 7).unwrap();
    part.session(b).unwrap().connect(StrandType::Staple, 2, 7).unwrap();
    (part, a, b)
}

#[test]
fn crossover_between_ends() {
    init_logger();
    let (mut part, a, b) = part_with_facing_ends();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();

    let a_2 = BaseAddress::new(a, StrandType::Staple, 2);
    let b_2 = BaseAddress::new(b, StrandType::Staple, 2);
    assert_eq!(staple(&part, a).prime3_crossovers().collect::<Vec<_>>(), vec![(2, b_2)]);
    assert_eq!(staple(&part, a).state_at(2), Some(BaseState::Connected));
    assert_eq!(staple(&part, b).base_at(2).unwrap().prime5_crossover, Some(a_2));

    let oligo = part
        .design()
        .oligo_through(BaseAddress::new(b, StrandType::Staple, 5))
        .unwrap();
    assert!(!oligo.cyclic);
    assert_eq!(oligo.bases.len(), 12);
    assert_eq!(oligo.bases[0], BaseAddress::new(a, StrandType::Staple, 7));
    assert_eq!(*oligo.bases.last().unwrap(), BaseAddress::new(b, StrandType::Staple, 7));
    assert_eq!(
        part.design().five_prime_end_of(BaseAddress::new(b, StrandType::Staple, 5)),
        Some(BaseAddress::new(a, StrandType::Staple, 7))
    );
    assert_eq!(part.design().prime3_neighbour(a_2), Some(b_2));

    assert_eq!(part.shared_history().undo_label().unwrap().to_string(), "Install crossover");
    part.undo().unwrap();
    assert_eq!(staple(&part, a).state_at(2), Some(BaseState::End3Prime));
    assert_eq!(staple(&part, b).state_at(2), Some(BaseState::End5Prime));
    assert_eq!(staple(&part, b).crossovers().count(), 0);
}

#[test]
fn crossover_through_a_run_is_refused() {
    let (mut part, a, b) = two_helix_part();
    part.session(a).unwrap().connect(StrandType::Staple, 0, 7).unwrap();
    part.session(b).unwrap().connect(StrandType::Staple, 2, 7).unwrap();
    let before = part.design().helices().clone();

    let result = part.session(a).unwrap().install_crossover(
        StrandType::Staple,
        2,
        (b, 2),
        CrossoverDirection::ThreeToFive,
    );
    assert_eq!(
        result,
        Err(ModelError::InvalidTopology {
            address: BaseAddress::new(a, StrandType::Staple, 2),
            violation: TopologyViolation::InteriorOfRun,
        })
    );
    assert_eq!(part.design().helices(), &before);
    assert_eq!(part.shared_history().len(), 2);
}

#[test]
fn crossover_needs_matching_ends() {
    let (mut part, a, b) = part_with_facing_ends();
    let install = |part: &mut Part, from: isize, to: (HelixId, isize), direction| {
        let check = InstallCrossover::new(StrandType::Staple, (a, from), to, direction)
            .check(part.design());
        let mut session = part.session(a).unwrap();
        assert_eq!(
            session.can_install_crossover(StrandType::Staple, from, to, direction),
            check
        );
        let result = session.install_crossover(StrandType::Staple, from, to, direction);
        assert_eq!(check, result);
        result.err().map(|e| match e {
            ModelError::InvalidTopology { violation, .. } => violation,
            e => panic!("unexpected error {}", e),
        })
    };
    use CrossoverDirection::*;
    assert_eq!(
        install(&mut part, 2, (b, 7), ThreeToFive),
        Some(TopologyViolation::Expected5PrimeEnd)
    );
    assert_eq!(
        install(&mut part, 7, (b, 2), ThreeToFive),
        Some(TopologyViolation::Expected3PrimeEnd)
    );
    assert_eq!(
        install(&mut part, 0, (b, 2), ThreeToFive),
        Some(TopologyViolation::EmptyBase)
    );
    assert_eq!(
        install(&mut part, 2, (a, 2), ThreeToFive),
        Some(TopologyViolation::SameBase)
    );
    // the 3' end of the odd helix leaves toward the 5' end of the even helix
    assert_eq!(install(&mut part, 7, (b, 7), FiveToThree), None);
    assert_eq!(
        install(&mut part, 7, (b, 7), FiveToThree),
        Some(TopologyViolation::CrossoverAlreadyPresent)
    );
    assert!(matches!(
        part.session(a).unwrap().install_crossover(
            StrandType::Staple,
            9,
            (b, 2),
            ThreeToFive
        ),
        Err(ModelError::Range(_))
    ));
}

#[test]
fn single_base_crossovers_follow_the_policy() {
    let (mut part, a, b) = two_helix_part();
    part.session(b).unwrap().connect(StrandType::Staple, 2, 7).unwrap();
    part.session(a).unwrap().connect(StrandType::Staple, 2, 5).unwrap();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    part.set_policy(lenient());
    part.session(b).unwrap().clear(StrandType::Staple, 3., 7.).unwrap();
    assert_eq!(staple(&part, b).state_at(2), Some(BaseState::End3Prime));
    part.set_policy(strict());

    let close_loop = |part: &mut Part| {
        part.session(b).unwrap().install_crossover(
            StrandType::Staple,
            2,
            (a, 5),
            CrossoverDirection::ThreeToFive,
        )
    };
    assert_eq!(
        close_loop(&mut part),
        Err(ModelError::InvalidTopology {
            address: BaseAddress::new(b, StrandType::Staple, 2),
            violation: TopologyViolation::SingleBaseCrossover,
        })
    );

    part.set_policy(lenient());
    close_loop(&mut part).unwrap();
    let oligo = part
        .design()
        .oligo_through(BaseAddress::new(a, StrandType::Staple, 3))
        .unwrap();
    assert!(oligo.cyclic);
    let a_ = |i| BaseAddress::new(a, StrandType::Staple, i);
    assert_eq!(
        oligo.bases,
        vec![a_(2), BaseAddress::new(b, StrandType::Staple, 2), a_(5), a_(4), a_(3)]
    );
}

#[test]
fn remove_crossover_restores_both_ends() {
    let (mut part, a, b) = part_with_facing_ends();
    let mut session = part.session(a).unwrap();
    session
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    session.remove_crossover(StrandType::Staple, 2).unwrap();
    assert_eq!(
        session.remove_crossover(StrandType::Staple, 2),
        Err(ModelError::InvalidTopology {
            address: BaseAddress::new(a, StrandType::Staple, 2),
            violation: TopologyViolation::NoCrossover,
        })
    );
    assert_eq!(staple(&part, a).state_at(2), Some(BaseState::End3Prime));
    assert_eq!(staple(&part, b).state_at(2), Some(BaseState::End5Prime));
}

#[test]
fn clearing_a_crossover_end_unlinks_the_other_helix() {
    let (mut part, a, b) = part_with_facing_ends();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    part.session(b).unwrap().clear(StrandType::Staple, 2., 2.).unwrap();
    assert_eq!(staple(&part, a).state_at(2), Some(BaseState::End3Prime));
    assert_eq!(staple(&part, a).crossovers().count(), 0);
    assert!(!staple(&part, b).has_base_at(2));

    part.undo().unwrap();
    assert!(staple(&part, a).has_crossover_at(2));
    assert!(staple(&part, b).has_crossover_at(2));
}

#[test]
fn notifications_are_batched_per_macro() {
    let (mut part, a, b) = two_helix_part();
    let events = Rc::new(RefCell::new(Vec::new()));
    let subscription = {
        let events = events.clone();
        part.subscribe(move |e| events.borrow_mut().push(*e))
    };

    {
        let mut session = part.session(a).unwrap();
        session.begin_macro("several edits").unwrap();
        session.connect(StrandType::Scaffold, 0, 3).unwrap();
        session.connect(StrandType::Staple, 1, 6).unwrap();
        session.set_loop_or_skip(StrandType::Staple, 2, 1).unwrap();
        assert!(events.borrow().is_empty());
        session.end_macro().unwrap();
    }
    assert_eq!(*events.borrow(), vec![ModelEvent::BasesModified(a)]);

    events.borrow_mut().clear();
    part.set_num_bases(12).unwrap();
    assert_eq!(
        *events.borrow(),
        vec![
            ModelEvent::DimensionsModified(a),
            ModelEvent::DimensionsModified(b),
            ModelEvent::BasesModified(a),
            ModelEvent::BasesModified(b),
        ]
    );

    events.borrow_mut().clear();
    part.undo().unwrap();
    assert_eq!(events.borrow().len(), 4);

    assert!(part.unsubscribe(subscription));
    events.borrow_mut().clear();
    part.undo().unwrap();
    assert!(events.borrow().is_empty());
}

#[test]
fn sandboxed_commands_stay_out_of_the_shared_history() {
    init_logger();
    let (mut part, a, _) = two_helix_part();
    part.session(a).unwrap().connect(StrandType::Staple, 0, 7).unwrap();

    part.set_sandboxed(a, true).unwrap();
    assert!(matches!(
        part.set_sandboxed(a, true),
        Err(ModelError::Consistency(ConsistencyViolation::AlreadySandboxed(_)))
    ));
    {
        let mut session = part.session(a).unwrap();
        assert!(session.history().is_empty());
        session.connect(StrandType::Scaffold, 2, 6).unwrap();
        session.set_loop_or_skip(StrandType::Scaffold, 3, 1).unwrap();
    }
    assert_eq!(part.history_of(a).unwrap().len(), 2);
    assert_eq!(part.shared_history().len(), 1);

    part.set_sandboxed(a, false).unwrap();
    assert!(!part.is_sandboxed(a));
    assert_eq!(part.shared_history().len(), 1);

    assert!(part.undo().unwrap());
    let helix = part.helix(a).unwrap();
    assert!(helix.track(StrandType::Staple).is_blank());
    assert_eq!(ends(helix.track(StrandType::Scaffold)), (vec![2], vec![6]));
    assert_eq!(helix.track(StrandType::Scaffold).loops().get(3), Some(1));
    assert!(!part.undo().unwrap());
}

#[test]
fn macros_do_not_nest() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.begin_macro("outer").unwrap();
    assert!(matches!(
        session.begin_macro("inner"),
        Err(ModelError::MacroNesting(HistoryError::MacroAlreadyOpen { .. }))
    ));
    session.connect(StrandType::Scaffold, 0, 2).unwrap();
    assert!(matches!(
        session.undo(),
        Err(ModelError::MacroNesting(HistoryError::MacroOpen { .. }))
    ));
    session.end_macro().unwrap();
    assert!(matches!(
        session.end_macro(),
        Err(ModelError::MacroNesting(HistoryError::NoOpenMacro))
    ));
    assert!(session.undo().unwrap());
}

#[test]
fn failing_macro_is_rolled_back() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    let result = session.atomic("connect and fail", |s| {
        s.connect(StrandType::Scaffold, 0, 4)?;
        s.set_loop_or_skip(StrandType::Scaffold, 2, 1)?;
        s.connect(StrandType::Scaffold, 4, 9)
    });
    assert!(matches!(result, Err(ModelError::Range(_))));
    assert!(session.track(StrandType::Scaffold).unwrap().is_blank());
    assert!(session.history().is_empty());
}

#[test]
fn attach_checks_parity_and_length() {
    let mut part = Part::with_policy(8, strict());
    let mut odd = DetachedHelix::with_policy(5, 8, strict());
    odd.session()
        .unwrap()
        .connect(StrandType::Scaffold, 1, 3)
        .unwrap();

    let err = part.attach(HelixCoord::new(0, 0), odd, None).unwrap_err();
    assert!(matches!(
        err.error,
        ModelError::Consistency(ConsistencyViolation::ParityMismatch { helix: 5, .. })
    ));
    let id = part.attach(HelixCoord::new(0, 1), err.helix, None).unwrap();
    assert_eq!(id, 1);
    let scaffold = part.helix(id).unwrap().track(StrandType::Scaffold);
    assert_eq!(ends(scaffold), (vec![3], vec![1]));
    assert!(part.shared_history().is_empty());

    let mut long = DetachedHelix::with_policy(0, 12, strict());
    long.session()
        .unwrap()
        .connect(StrandType::Staple, 6, 10)
        .unwrap();
    let err = part.attach(HelixCoord::new(1, 1), long, None).unwrap_err();
    assert_eq!(
        err.error,
        ModelError::Consistency(ConsistencyViolation::BaseCountMismatch {
            expected: 8,
            found: 12
        })
    );
    let mut long = err.helix;
    long.session().unwrap().clear(StrandType::Staple, 8., 10.).unwrap();
    let id = part.attach(HelixCoord::new(1, 1), long, None).unwrap();
    assert_eq!(part.helix(id).unwrap().num_bases(), 8);
    assert_eq!(ends(staple(&part, id)), (vec![7], vec![6]));

    let short = DetachedHelix::with_policy(3, 4, strict());
    assert!(matches!(
        part.attach(HelixCoord::new(1, 1), short, None),
        Err(AttachError {
            error: ModelError::Consistency(ConsistencyViolation::CoordinateInUse(_)),
            ..
        })
    ));
    let short = DetachedHelix::with_policy(3, 4, strict());
    assert!(matches!(
        part.attach(HelixCoord::new(2, 0), short, Some(3)),
        Err(AttachError {
            error: ModelError::Consistency(ConsistencyViolation::NumberParityMismatch { .. }),
            ..
        })
    ));
    let short = DetachedHelix::with_policy(3, 4, strict());
    let id = part.attach(HelixCoord::new(2, 0), short, Some(4)).unwrap();
    assert_eq!(part.helix(id).unwrap().num_bases(), 8);
    assert_eq!(part.helix_at(HelixCoord::new(2, 0)).unwrap().id(), 4);
}

#[test]
fn detach_gives_a_private_history() {
    let (mut part, a, b) = part_with_facing_ends();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    part.select(a).unwrap();
    assert!(matches!(
        part.detach(a),
        Err(ModelError::Consistency(
            ConsistencyViolation::ExternalCrossovers { .. }
        ))
    ));
    part.undo().unwrap();

    let mut detached = part.detach(a).unwrap();
    let labels: Vec<String> = part
        .shared_history()
        .labels()
        .map(|l| l.to_string())
        .collect();
    assert_eq!(labels, vec!["Connect strand"]);
    assert!(!part.shared_history().can_redo());
    assert!(part.helix(a).is_none());
    assert!(part.helix_at(HelixCoord::new(0, 0)).is_none());
    assert!(!part.selection().contains(a));
    assert_eq!(part.free_number(Parity::Even), a);

    assert_eq!(detached.id(), a);
    assert_eq!(detached.helix().unwrap().coord(), None);
    assert!(detached.history().is_empty());
    assert_eq!(ends(detached.track(StrandType::Staple).unwrap()), (vec![7], vec![2]));
    detached
        .session()
        .unwrap()
        .connect(StrandType::Scaffold, 0, 3)
        .unwrap();
    assert!(detached.undo().unwrap());
    assert!(detached.redo().unwrap());
    assert!(!detached.redo().unwrap());

    assert!(part.undo().unwrap());
    assert!(staple(&part, b).is_blank());
    assert!(!part.undo().unwrap());
}

#[test]
fn detached_sandbox_is_dropped() {
    let mut helix = even_helix(8);
    helix.session().unwrap().connect(StrandType::Scaffold, 0, 2).unwrap();
    helix.set_sandboxed(true).unwrap();
    helix.session().unwrap().connect(StrandType::Scaffold, 4, 6).unwrap();
    assert_eq!(helix.history().len(), 1);
    helix.set_sandboxed(false).unwrap();
    assert_eq!(helix.history().len(), 1);
    helix.undo().unwrap();
    assert_eq!(ends(helix.track(StrandType::Scaffold).unwrap()), (vec![4], vec![6]));
}

#[test]
fn undo_refuses_bases_rewritten_by_a_dropped_sandbox() {
    init_logger();
    let (mut part, a, _) = two_helix_part();
    part.session(a).unwrap().connect(StrandType::Scaffold, 2, 4).unwrap();
    part.set_sandboxed(a, true).unwrap();
    part.session(a).unwrap().connect(StrandType::Scaffold, 4, 6).unwrap();
    part.set_sandboxed(a, false).unwrap();
    let before = part.helix(a).unwrap().clone();

    assert_eq!(
        part.undo(),
        Err(ModelError::Consistency(ConsistencyViolation::StaleEntry(
            BaseAddress::new(a, StrandType::Scaffold, 4)
        )))
    );
    assert_eq!(part.helix(a).unwrap(), &before);
    assert_eq!(part.shared_history().cursor(), 1);
    let scaffold = part.helix(a).unwrap().track(StrandType::Scaffold);
    assert_eq!(ends(scaffold), (vec![2], vec![6]));
    assert_eq!(scaffold.runs().count(), 1);
}

#[test]
fn detached_undo_refuses_bases_rewritten_by_a_dropped_sandbox() {
    let mut helix = even_helix(8);
    helix.session().unwrap().connect(StrandType::Staple, 1, 4).unwrap();
    helix.set_sandboxed(true).unwrap();
    helix.session().unwrap().clear(StrandType::Staple, 2., 2.).unwrap();
    helix.set_sandboxed(false).unwrap();

    assert_eq!(
        helix.undo(),
        Err(ModelError::Consistency(ConsistencyViolation::StaleEntry(
            BaseAddress::new(0, StrandType::Staple, 1)
        )))
    );
    let staple = helix.track(StrandType::Staple).unwrap();
    assert!(!staple.has_base_at(1));
    assert_eq!(ends(staple), (vec![4], vec![3]));
    assert!(helix.history().can_undo());
}

#[test]
fn strict_clear_keeps_two_bases_at_a_crossover() {
    let (mut part, a, b) = two_helix_part();
    part.session(b).unwrap().connect(StrandType::Staple, 2, 7).unwrap();
    part.session(a).unwrap().connect(StrandType::Staple, 2, 5).unwrap();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();

    part.session(b).unwrap().clear(StrandType::Staple, 3., 7.).unwrap();
    let track = staple(&part, b);
    assert_eq!(track.state_at(2), Some(BaseState::Connected));
    assert_eq!(track.state_at(3), Some(BaseState::End3Prime));
    assert!(!track.has_base_at(4));
    assert_eq!(part.shared_history().len(), 4);

    part.undo().unwrap();
    assert_eq!(ends(staple(&part, b)), (vec![], vec![7]));
}

#[test]
fn repair_links_lone_crossover_bases() {
    let (mut part, a, b) = two_helix_part();
    part.set_policy(lenient());
    part.session(b).unwrap().connect(StrandType::Staple, 2, 7).unwrap();
    part.session(a).unwrap().connect(StrandType::Staple, 2, 5).unwrap();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    part.session(b).unwrap().clear(StrandType::Staple, 2.5, 7.).unwrap();
    assert_eq!(staple(&part, b).runs().count(), 1);
    assert_eq!(staple(&part, b).state_at(2), Some(BaseState::End3Prime));

    part.session(b)
        .unwrap()
        .repair_single_base_crossovers()
        .unwrap();
    assert_eq!(staple(&part, b).state_at(3), Some(BaseState::End3Prime));
    assert_eq!(
        part.shared_history().undo_label().unwrap().to_string(),
        "Repair single base crossovers"
    );
    part.undo().unwrap();
    assert!(!staple(&part, b).has_base_at(3));
}

#[test]
fn remove_strand_empties_the_whole_oligo() {
    let (mut part, a, b) = part_with_facing_ends();
    part.session(a)
        .unwrap()
        .connect(StrandType::Scaffold, 0, 3)
        .unwrap();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    let before = part.design().helices().clone();

    part.session(b).unwrap().remove_strand(StrandType::Staple, 6).unwrap();
    assert!(staple(&part, a).is_blank());
    assert!(staple(&part, b).is_blank());
    assert_eq!(
        ends(part.helix(a).unwrap().track(StrandType::Scaffold)),
        (vec![0], vec![3])
    );
    assert_eq!(
        part.session(b).unwrap().remove_strand(StrandType::Staple, 6),
        Err(ModelError::InvalidTopology {
            address: BaseAddress::new(b, StrandType::Staple, 6),
            violation: TopologyViolation::EmptyBase,
        })
    );

    assert_eq!(part.shared_history().undo_label().unwrap().to_string(), "Remove strand");
    part.undo().unwrap();
    assert_eq!(part.design().helices(), &before);
}

#[test]
fn ends_are_dragged_to_the_next_run() {
    let mut helix = even_helix(12);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 3, 4).unwrap();
    session.connect(StrandType::Scaffold, 8, 9).unwrap();

    session.drag_to_boundary(StrandType::Scaffold, 4).unwrap();
    assert_eq!(ends(session.track(StrandType::Scaffold).unwrap()), (vec![3, 8], vec![7, 9]));
    session.drag_to_boundary(StrandType::Scaffold, 7).unwrap();
    assert_eq!(session.history().len(), 3);
    assert_eq!(
        session.drag_to_boundary(StrandType::Scaffold, 5),
        Err(ModelError::InvalidTopology {
            address: BaseAddress::new(0, StrandType::Scaffold, 5),
            violation: TopologyViolation::NotAnEnd,
        })
    );
    session.undo().unwrap();

    session.drag_all_to_boundaries(StrandType::Scaffold).unwrap();
    assert_eq!(ends(session.track(StrandType::Scaffold).unwrap()), (vec![0, 8], vec![7, 11]));
    assert_eq!(session.history().len(), 3);
    assert_eq!(session.history().undo_label().unwrap().to_string(), "Auto-drag ends");
    session.undo().unwrap();
    assert_eq!(ends(session.track(StrandType::Scaffold).unwrap()), (vec![3, 8], vec![4, 9]));
}

#[test]
fn part_drags_all_ends_in_one_step() {
    let (mut part, a, b) = two_helix_part();
    part.session(a).unwrap().connect(StrandType::Scaffold, 2, 3).unwrap();
    part.session(b).unwrap().connect(StrandType::Scaffold, 4, 5).unwrap();
    part.set_sandboxed(b, true).unwrap();

    part.drag_all_to_boundaries(StrandType::Scaffold).unwrap();
    assert_eq!(ends(part.helix(a).unwrap().track(StrandType::Scaffold)), (vec![0], vec![7]));
    assert_eq!(ends(part.helix(b).unwrap().track(StrandType::Scaffold)), (vec![5], vec![4]));
    assert_eq!(part.shared_history().len(), 3);

    part.undo().unwrap();
    assert_eq!(ends(part.helix(a).unwrap().track(StrandType::Scaffold)), (vec![2], vec![3]));
}

#[test]
fn renumbering_moves_crossovers_and_can_be_undone() {
    let (mut part, a, b) = part_with_facing_ends();
    part.session(a)
        .unwrap()
        .install_crossover(StrandType::Staple, 2, (b, 2), CrossoverDirection::ThreeToFive)
        .unwrap();
    part.select(b).unwrap();

    assert!(matches!(
        part.renumber_helix(b, 2),
        Err(ModelError::Consistency(ConsistencyViolation::ParityChange { .. }))
    ));
    assert!(matches!(
        part.renumber_helix(b, a),
        Err(ModelError::Consistency(ConsistencyViolation::NumberInUse(_)))
    ));
    part.renumber_helix(b, 5).unwrap();
    assert!(part.helix(b).is_none());
    assert_eq!(part.helix_at(HelixCoord::new(0, 1)).unwrap().id(), 5);
    assert!(part.is_selected(5));
    assert_eq!(
        staple(&part, a).prime3_crossovers().collect::<Vec<_>>(),
        vec![(2, BaseAddress::new(5, StrandType::Staple, 2))]
    );
    assert_eq!(part.neighbors(a).unwrap()[0], Some(5));
    assert!(part.design().check_crossovers().is_ok());

    assert_eq!(part.shared_history().undo_label().unwrap().to_string(), "Renumber helix");
    part.undo().unwrap();
    assert_eq!(part.helix_at(HelixCoord::new(0, 1)).unwrap().id(), b);
    assert!(!part.is_selected(5));
    assert_eq!(
        staple(&part, a).prime3_crossovers().collect::<Vec<_>>(),
        vec![(2, BaseAddress::new(b, StrandType::Staple, 2))]
    );

    part.set_sandboxed(b, true).unwrap();
    assert_eq!(
        part.renumber_helix(b, 5),
        Err(ModelError::Consistency(ConsistencyViolation::Sandboxed(b)))
    );
}

#[test]
fn helix_map_lists_the_part_helices() {
    let (part, a, b) = part_with_facing_ends();
    let helices: &Helices = part.design().helices();
    assert_eq!(helices.len(), 2);
    assert_eq!(helices.keys().copied().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(helices.get(&b).map(|h| h.id()), Some(b));
}

#[test]
fn self_crossovers_follow_renumbering() {
    let mut helix = DetachedHelix::with_policy(4, 8, strict());
    {
        let mut session = helix.session().unwrap();
        session.connect(StrandType::Staple, 0, 2).unwrap();
        session.connect(StrandType::Staple, 5, 7).unwrap();
        session
            .install_crossover(StrandType::Staple, 0, (4, 7), CrossoverDirection::ThreeToFive)
            .unwrap();
    }
    let mut part = Part::with_policy(8, strict());
    let id = part.attach(HelixCoord::new(0, 0), helix, Some(2)).unwrap();
    assert_eq!(id, 2);
    assert_eq!(
        staple(&part, id).prime3_crossovers().collect::<Vec<_>>(),
        vec![(0, BaseAddress::new(2, StrandType::Staple, 7))]
    );
    let reloaded = Part::from_archive(&part.to_archive()).unwrap();
    assert_eq!(reloaded.design().helices(), part.design().helices());
}

#[test]
fn selection_is_owned_by_the_part() {
    let (mut part, a, b) = two_helix_part();
    assert!(part.select(a).unwrap());
    assert!(!part.select(a).unwrap());
    assert_eq!(part.select(42), Err(ModelError::NoSuchHelix(42)));
    part.select(b).unwrap();
    assert_eq!(part.selection().iter().collect::<Vec<_>>(), vec![a, b]);
    assert!(part.is_selected(a));
    assert!(part.deselect(a));
    assert!(!part.deselect(a));
    assert!(part.selection().contains(b));
    part.clear_selection();
    assert!(part.selection().is_empty());
}

#[test]
fn default_part_length() {
    let part = Part::default();
    assert_eq!(part.num_bases(), consts::DEFAULT_NUM_BASES);
    assert!(part.is_empty());
}

#[test]
fn honeycomb_neighbors() {
    let mut part = Part::with_policy(8, strict());
    let center = part.add_helix(HelixCoord::new(0, 0)).unwrap();
    let right = part.add_helix(HelixCoord::new(0, 1)).unwrap();
    let up = part.add_helix(HelixCoord::new(-1, 0)).unwrap();
    assert_eq!((center, right, up), (0, 1, 3));
    assert_eq!(part.neighbors(center).unwrap(), [Some(1), Some(3), None]);
    assert_eq!(part.neighbors(right).unwrap(), [Some(0), None, None]);
    assert_eq!(part.neighbors(7), Err(ModelError::NoSuchHelix(7)));
}

#[test]
fn base_queries() {
    let mut helix = even_helix(8);
    let mut session = helix.session().unwrap();
    session.connect(StrandType::Scaffold, 2, 3).unwrap();
    session.connect(StrandType::Scaffold, 6, 7).unwrap();
    session.set_loop_or_skip(StrandType::Scaffold, 2, 2).unwrap();
    session.set_loop_or_skip(StrandType::Scaffold, 3, -1).unwrap();
    let scaffold = session.track(StrandType::Scaffold).unwrap();

    let empty = scaffold.base_at(0).unwrap();
    assert_eq!(empty.state, BaseState::Empty);
    assert_eq!(empty.run, None);
    let base = scaffold.base_at(3).unwrap();
    assert_eq!(base.loop_skip, Some(-1));
    let run = base.run.unwrap();
    assert_eq!((run.five_prime(), run.three_prime()), (2, 3));
    assert_eq!(run.to_string(), "[2 -> 3]");
    assert_eq!(scaffold.effective_length(&run), 3);
    assert!(scaffold.base_at(8).is_none());
    assert!(!scaffold.has_base_at(-1));
    assert!(!scaffold.has_base_at(8));

    assert_eq!(scaffold.drag_bound(2), Some(0));
    assert_eq!(scaffold.drag_bound(3), Some(5));
    assert_eq!(scaffold.drag_bound(7), Some(7));
    assert_eq!(scaffold.drag_bound(1), None);
    assert_eq!(scaffold.rightmost_nonempty_base(), Some(7));
}

#[test]
fn oligo_colors_rotate() {
    let palette = DefaultPalette::with_colors(vec![Color(1), Color(2)]).unwrap();
    let mut colors = OligoColors::new(palette);
    assert_eq!(colors.color_of("a"), Color(1));
    assert_eq!(colors.color_of("b"), Color(2));
    assert_eq!(colors.color_of("a"), Color(1));
    let c = colors.color_of("c");
    assert!(c == Color(1) || c == Color(2));
    colors.set_color("a", Color(7));
    assert_eq!(colors.get(&"a"), Some(Color(7)));
    assert_eq!(colors.forget(&"b"), Some(Color(2)));
    assert_eq!(colors.len(), 2);
    assert!(DefaultPalette::with_colors(Vec::new()).is_none());

    let mut by_strand: OligoColors<BaseAddress> = Default::default();
    let key = BaseAddress::new(0, StrandType::Staple, 3);
    let color = by_strand.color_of(key);
    assert_eq!(by_strand.color_of(key), color);
}

#[derive(Debug, Clone)]
enum Edit {
    Connect(StrandType, isize, isize),
    Clear(StrandType, f64, f64),
}

fn strand_strategy() -> impl Strategy<Value = StrandType> {
    prop_oneof![Just(StrandType::Scaffold), Just(StrandType::Staple)]
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (strand_strategy(), 0isize..12, 0isize..12).prop_map(|(s, i, j)| Edit::Connect(s, i, j)),
        (strand_strategy(), -2f64..14., -2f64..14.).prop_map(|(s, i, j)| Edit::Clear(s, i, j)),
    ]
}

proptest! {
    #[test]
    fn edits_keep_ends_paired_and_undo_to_empty(
        number in 0usize..4,
        edits in prop::collection::vec(edit_strategy(), 0..24)
    ) {
        let mut helix = DetachedHelix::with_policy(number, 12, strict());
        let initial = helix.helix().unwrap().clone();
        let mut session = helix.session().unwrap();
        for edit in edits.iter() {
            let _ = match edit {
                Edit::Connect(s, i, j) => session.connect(*s, *i, *j),
                Edit::Clear(s, i, j) => session.clear(*s, *i, *j),
            };
            for strand in StrandType::ALL.iter() {
                let track = session.track(*strand).unwrap();
                prop_assert_eq!(
                    track.five_prime_ends().count(),
                    track.three_prime_ends().count()
                );
            }
        }
        let last = session.helix().unwrap().clone();
        while session.undo().unwrap() {}
        prop_assert_eq!(session.helix().unwrap(), &initial);
        while session.redo().unwrap() {}
        prop_assert_eq!(session.helix().unwrap(), &last);
    }
}
