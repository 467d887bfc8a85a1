use super::constants::MAX_SCOREBOARD_LIMIT;
use super::types::ScoreboardEntry;

pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_SCOREBOARD_LIMIT)
}

/// Ranks entries by length, longest first. Ties keep name order so the view
/// is stable between refreshes.
pub fn project<I>(entries: I, limit: usize) -> Vec<ScoreboardEntry>
where
    I: IntoIterator<Item = ScoreboardEntry>,
{
    let mut ranked: Vec<ScoreboardEntry> = entries.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.max_length_ever_reached
            .cmp(&a.max_length_ever_reached)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(clamp_limit(limit));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, len: usize) -> ScoreboardEntry {
        ScoreboardEntry {
            name: name.to_string(),
            max_length_ever_reached: len,
        }
    }

    #[test]
    fn sorts_descending_and_caps() {
        let ranked = project(
            vec![entry("c", 3), entry("a", 9), entry("b", 5), entry("d", 2)],
            3,
        );
        assert_eq!(ranked, vec![entry("a", 9), entry("b", 5), entry("c", 3)]);
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let ranked = project(vec![entry("zed", 4), entry("amy", 4)], 10);
        assert_eq!(ranked, vec![entry("amy", 4), entry("zed", 4)]);
    }

    #[test]
    fn limit_is_clamped() {
        let many = (0..80).map(|index| entry(&format!("p{index}"), index));
        assert_eq!(project(many, 500).len(), MAX_SCOREBOARD_LIMIT);
        assert_eq!(project(vec![entry("a", 2), entry("b", 3)], 0).len(), 1);
    }
}
