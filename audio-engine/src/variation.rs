//! Selection-policy implementations for `VariationTable` (spec §4.4).
//! Each `Cue` owns one `VariationSelector` per table it resolves so two
//! cues playing the same table walk independent sequences.

use bank_schema::{SelectionPolicy, VariationTable};
use rand::Rng;

use crate::rng::EngineRng;
use crate::variable_store::VariableStore;

#[derive(Debug, Clone)]
pub struct VariationSelector {
    policy: SelectionPolicy,
    ordered_cursor: usize,
    last_index: Option<usize>,
    shuffle_deck: Vec<usize>,
}

impl VariationSelector {
    pub fn new(table: &VariationTable) -> Self {
        Self {
            policy: table.policy,
            ordered_cursor: 0,
            last_index: None,
            shuffle_deck: Vec::new(),
        }
    }

    /// Picks the next entry index into `table.entries`. Panics only if
    /// `table.entries` is empty — the loader rejects empty tables (§4.1), so
    /// a table reaching here always has at least one entry.
    pub fn select(
        &mut self,
        table: &VariationTable,
        rng: &mut EngineRng,
        variables: &VariableStore,
    ) -> usize {
        debug_assert!(!table.entries.is_empty(), "empty variation table reached selector");
        match self.policy {
            SelectionPolicy::Ordered => {
                let i = self.ordered_cursor % table.entries.len();
                self.ordered_cursor = (self.ordered_cursor + 1) % table.entries.len();
                self.last_index = Some(i);
                i
            }
            SelectionPolicy::Random => {
                let i = weighted_pick(table, rng, None);
                self.last_index = Some(i);
                i
            }
            SelectionPolicy::RandomNoImmediateRepeat => {
                let i = if table.entries.len() == 1 {
                    0
                } else {
                    weighted_pick(table, rng, self.last_index)
                };
                self.last_index = Some(i);
                i
            }
            SelectionPolicy::Shuffle => {
                if self.shuffle_deck.is_empty() {
                    self.refill_shuffle_deck(table, rng);
                }
                let i = self.shuffle_deck.pop().unwrap();
                self.last_index = Some(i);
                i
            }
            SelectionPolicy::Interactive => {
                let value = table
                    .variable
                    .map(|v| variables.get(v))
                    .unwrap_or(0.0);
                let i = table
                    .entries
                    .iter()
                    .position(|e| value >= e.min_weight && value <= e.max_weight)
                    .unwrap_or(table.entries.len() - 1);
                self.last_index = Some(i);
                i
            }
        }
    }

    fn refill_shuffle_deck(&mut self, table: &VariationTable, rng: &mut EngineRng) {
        let mut deck: Vec<usize> = (0..table.entries.len()).collect();
        // Fisher-Yates using the engine's deterministic rng.
        for i in (1..deck.len()).rev() {
            let j = rng.inner_mut().gen_range(0..=i);
            deck.swap(i, j);
        }
        // Avoid the new deck's first draw (last element, since we pop from
        // the back) repeating the previous deck's last draw.
        if deck.len() > 1 {
            if let Some(last) = self.last_index {
                if deck[deck.len() - 1] == last {
                    deck.swap(0, deck.len() - 1);
                }
            }
        }
        self.shuffle_deck = deck;
    }
}

fn weighted_pick(table: &VariationTable, rng: &mut EngineRng, exclude: Option<usize>) -> usize {
    let weights: Vec<f32> = table
        .entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            if Some(i) == exclude {
                0.0
            } else {
                (e.max_weight - e.min_weight).max(0.0001)
            }
        })
        .collect();
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        // every entry excluded (single-entry table) — fall back to it.
        return exclude.unwrap_or(0);
    }
    let mut roll = rng.inner_mut().gen_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if roll < *w {
            return i;
        }
        roll -= w;
    }
    table.entries.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_schema::{Variation, VariationPayload};

    fn table(policy: SelectionPolicy, n: usize) -> VariationTable {
        VariationTable {
            policy,
            variable: None,
            entries: (0..n)
                .map(|_| Variation {
                    payload: VariationPayload::Sound(0),
                    min_weight: 0.0,
                    max_weight: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn ordered_cycles_through_all_entries() {
        let t = table(SelectionPolicy::Ordered, 3);
        let mut sel = VariationSelector::new(&t);
        let mut rng = EngineRng::new(0);
        let engine = bank_schema::EngineData::new(vec![], vec![], vec![]);
        let vars = VariableStore::new(&engine);
        let picks: Vec<usize> = (0..6).map(|_| sel.select(&t, &mut rng, &vars)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn random_no_immediate_repeat_never_repeats() {
        let t = table(SelectionPolicy::RandomNoImmediateRepeat, 3);
        let mut sel = VariationSelector::new(&t);
        let mut rng = EngineRng::new(42);
        let engine = bank_schema::EngineData::new(vec![], vec![], vec![]);
        let vars = VariableStore::new(&engine);
        let mut last = None;
        for _ in 0..50 {
            let pick = sel.select(&t, &mut rng, &vars);
            if let Some(l) = last {
                assert_ne!(pick, l);
            }
            last = Some(pick);
        }
    }

    #[test]
    fn shuffle_visits_every_entry_before_repeating() {
        let t = table(SelectionPolicy::Shuffle, 4);
        let mut sel = VariationSelector::new(&t);
        let mut rng = EngineRng::new(7);
        let engine = bank_schema::EngineData::new(vec![], vec![], vec![]);
        let vars = VariableStore::new(&engine);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..4 {
            seen.insert(sel.select(&t, &mut rng, &vars));
        }
        assert_eq!(seen.len(), 4);
    }
}
