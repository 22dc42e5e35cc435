//! Win-rate table derived from match history.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::LEADERBOARD_SIZE;
use crate::domain::{MatchSnapshot, ParticipantId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub nickname: String,
    pub total_games: u32,
    pub won_games: u32,
    pub score: f64,
}

/// Tally games per match owner and wins per winner, rank by
/// `won / total` and keep the top [`LEADERBOARD_SIZE`].
///
/// Nicknames with no owned games have no score and are left out. Equal
/// scores keep the order in which the nickname first appeared, owners of a
/// match before its winner.
pub fn leaderboard(matches: &[MatchSnapshot]) -> Vec<Standing> {
    let nicknames: HashMap<ParticipantId, &str> = matches
        .iter()
        .flat_map(|m| m.sides())
        .map(|side| (side.id, side.username.as_str()))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut tally: HashMap<&str, (u32, u32)> = HashMap::new();
    for m in matches {
        if let Some(owner) = m.owner.as_deref() {
            credit(&mut order, &mut tally, owner).0 += 1;
        }
        if let Some(winner) = m.winner.and_then(|id| nicknames.get(&id).copied()) {
            credit(&mut order, &mut tally, winner).1 += 1;
        }
    }

    let mut standings: Vec<Standing> = order
        .into_iter()
        .filter_map(|nickname| {
            let (total, won) = tally[nickname];
            (total > 0).then(|| Standing {
                nickname: nickname.to_string(),
                total_games: total,
                won_games: won,
                score: f64::from(won) / f64::from(total),
            })
        })
        .collect();
    standings.sort_by(|a, b| b.score.total_cmp(&a.score));
    standings.truncate(LEADERBOARD_SIZE);
    standings
}

fn credit<'a, 'm>(
    order: &mut Vec<&'a str>,
    tally: &'m mut HashMap<&'a str, (u32, u32)>,
    nickname: &'a str,
) -> &'m mut (u32, u32) {
    tally.entry(nickname).or_insert_with(|| {
        order.push(nickname);
        (0, 0)
    })
}
