//! Vote tallies for archived activities.

use serde::{Deserialize, Serialize};

use super::{Activity, ChoicePayload};

/// Votes one choice received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceTally {
    pub choice: String,
    pub votes: u32,
}

/// Votes every choice received at one position of a drag-and-drop ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTally {
    pub position: usize,
    pub correct_choice: String,
    pub votes: Vec<ChoiceTally>,
}

/// Kind-specific summary of an archived activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityResult {
    Poll {
        result: Vec<ChoiceTally>,
    },
    Quiz {
        result: Vec<ChoiceTally>,
        correct_choices: Vec<String>,
    },
    #[serde(rename = "DND")]
    DragAndDrop {
        result: Vec<PositionTally>,
    },
}

impl ActivityResult {
    /// Builds the summary from the activity's current counters.
    ///
    /// Choices whose payload does not match the activity's kind count as
    /// zero votes.
    pub fn aggregate(activity: &Activity) -> Self {
        use super::ActivityKind;

        match activity.kind() {
            ActivityKind::Poll => ActivityResult::Poll {
                result: single_counter_tallies(activity),
            },
            ActivityKind::Quiz => ActivityResult::Quiz {
                result: single_counter_tallies(activity),
                correct_choices: activity
                    .choices()
                    .iter()
                    .filter(|c| matches!(c.payload(), ChoicePayload::Quiz { is_correct: true, .. }))
                    .map(|c| c.name().to_string())
                    .collect(),
            },
            ActivityKind::DragAndDrop => ActivityResult::DragAndDrop {
                result: position_tallies(activity),
            },
        }
    }
}

fn single_counter_tallies(activity: &Activity) -> Vec<ChoiceTally> {
    activity
        .choices()
        .iter()
        .map(|c| ChoiceTally {
            choice: c.name().to_string(),
            votes: match c.payload() {
                ChoicePayload::Poll { votes } | ChoicePayload::Quiz { votes, .. } => *votes,
                ChoicePayload::DragAndDrop { .. } => 0,
            },
        })
        .collect()
}

fn position_tallies(activity: &Activity) -> Vec<PositionTally> {
    let mut rows: Vec<PositionTally> = activity
        .choices()
        .iter()
        .filter_map(|c| match c.payload() {
            ChoicePayload::DragAndDrop {
                correct_position: Some(position),
                ..
            } => Some(PositionTally {
                position: *position,
                correct_choice: c.name().to_string(),
                votes: Vec::new(),
            }),
            _ => None,
        })
        .collect();
    rows.sort_by_key(|row| row.position);

    for row in &mut rows {
        row.votes = activity
            .choices()
            .iter()
            .map(|c| ChoiceTally {
                choice: c.name().to_string(),
                votes: match c.payload() {
                    ChoicePayload::DragAndDrop { votes, .. } => {
                        votes.get(row.position).copied().unwrap_or(0)
                    }
                    _ => 0,
                },
            })
            .collect();
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::{ActivityKind, ChoiceEdit, NewChoice};
    use proptest::prelude::*;

    fn tally(choice: &str, votes: u32) -> ChoiceTally {
        ChoiceTally {
            choice: choice.to_string(),
            votes,
        }
    }

    fn archived(mut activity: Activity, votes: &[(usize, Option<usize>)]) -> Activity {
        activity.open().unwrap();
        for (index, position) in votes {
            let id = activity.choices()[*index].id();
            activity.record_vote(id, *position).unwrap();
        }
        activity.close().unwrap();
        activity
    }

    #[test]
    fn poll_tallies_in_choice_order() {
        let mut poll = Activity::new("Lunch", ActivityKind::Poll).unwrap();
        poll.add_choices(vec![NewChoice::named("A"), NewChoice::named("B")])
            .unwrap();
        let poll = archived(poll, &[(0, None), (0, None), (1, None), (0, None)]);

        assert_eq!(
            poll.result().unwrap(),
            ActivityResult::Poll {
                result: vec![tally("A", 3), tally("B", 1)]
            }
        );
    }

    #[test]
    fn quiz_lists_correct_choices() {
        let mut quiz = Activity::new("Primes", ActivityKind::Quiz).unwrap();
        quiz.add_choices(vec![
            NewChoice::correct("2", true),
            NewChoice::correct("4", false),
            NewChoice::correct("5", true),
        ])
        .unwrap();
        let quiz = archived(quiz, &[(1, None)]);

        assert_eq!(
            quiz.result().unwrap(),
            ActivityResult::Quiz {
                result: vec![tally("2", 0), tally("4", 1), tally("5", 0)],
                correct_choices: vec!["2".to_string(), "5".to_string()],
            }
        );
    }

    #[test]
    fn dnd_rows_sorted_by_position() {
        let mut dnd = Activity::new("Order", ActivityKind::DragAndDrop).unwrap();
        dnd.add_choices(vec![NewChoice::named("x"), NewChoice::named("y")])
            .unwrap();
        let x = dnd.choices()[0].id();
        let y = dnd.choices()[1].id();
        dnd.edit_choice(
            x,
            ChoiceEdit {
                correct_position: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        dnd.edit_choice(
            y,
            ChoiceEdit {
                correct_position: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        let dnd = archived(dnd, &[(1, Some(0)), (0, Some(1)), (0, Some(0))]);

        assert_eq!(
            dnd.result().unwrap(),
            ActivityResult::DragAndDrop {
                result: vec![
                    PositionTally {
                        position: 0,
                        correct_choice: "y".to_string(),
                        votes: vec![tally("x", 1), tally("y", 1)],
                    },
                    PositionTally {
                        position: 1,
                        correct_choice: "x".to_string(),
                        votes: vec![tally("x", 1), tally("y", 0)],
                    },
                ]
            }
        );
    }

    #[test]
    fn result_serializes_with_kind_tag() {
        let json = serde_json::to_value(ActivityResult::Poll { result: vec![] }).unwrap();
        assert_eq!(json["kind"], "POLL");
    }

    proptest! {
        #[test]
        fn poll_total_equals_votes_cast(votes in proptest::collection::vec(0usize..4, 0..64)) {
            let mut poll = Activity::new("P", ActivityKind::Poll).unwrap();
            poll.add_choices((0..4).map(|i| NewChoice::named(format!("c{}", i))).collect()).unwrap();
            let cast: Vec<_> = votes.iter().map(|i| (*i, None)).collect();
            let poll = archived(poll, &cast);

            match poll.result().unwrap() {
                ActivityResult::Poll { result } => {
                    let total: u32 = result.iter().map(|t| t.votes).sum();
                    prop_assert_eq!(total as usize, votes.len());
                    for (i, row) in result.iter().enumerate() {
                        let expected = votes.iter().filter(|v| **v == i).count();
                        prop_assert_eq!(row.votes as usize, expected);
                    }
                }
                other => prop_assert!(false, "unexpected result {:?}", other),
            }
        }

        #[test]
        fn dnd_votes_land_in_their_slot(
            votes in proptest::collection::vec((0usize..3, 0usize..3), 0..48)
        ) {
            let mut dnd = Activity::new("D", ActivityKind::DragAndDrop).unwrap();
            dnd.add_choices(vec![NewChoice::named("a"), NewChoice::named("b"), NewChoice::named("c")]).unwrap();
            let cast: Vec<_> = votes.iter().map(|(c, p)| (*c, Some(*p))).collect();
            let dnd = archived(dnd, &cast);

            match dnd.result().unwrap() {
                ActivityResult::DragAndDrop { result } => {
                    prop_assert_eq!(result.len(), 3);
                    for row in &result {
                        for (choice, cell) in row.votes.iter().enumerate() {
                            let expected = votes
                                .iter()
                                .filter(|(c, p)| *c == choice && *p == row.position)
                                .count();
                            prop_assert_eq!(cell.votes as usize, expected);
                        }
                    }
                }
                other => prop_assert!(false, "unexpected result {:?}", other),
            }
        }
    }
}
