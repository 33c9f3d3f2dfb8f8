//! Property-based checks over pure, allocation-free evaluators that don't
//! need a full `AudioEngine` to exercise: the RPC curve and the variation
//! table selection policies.

use audio_engine::rng::EngineRng;
use audio_engine::variable_store::VariableStore;
use audio_engine::variation::VariationSelector;
use bank_schema::{CurveType, EngineData, Rpc, RpcParameter, RpcPoint, SelectionPolicy, Variation, VariationPayload, VariationTable};
use proptest::prelude::*;

fn linear_rpc(points: &[(f32, f32)]) -> Rpc {
    Rpc {
        variable: 0,
        parameter: RpcParameter::VolumeDb,
        points: points
            .iter()
            .map(|&(x, y)| RpcPoint { x, y, curve: CurveType::Linear })
            .collect(),
    }
}

proptest! {
    /// `eval_rpc` never returns a value outside the curve's own y-range,
    /// for any monotonically increasing set of x points and any input.
    #[test]
    fn eval_rpc_never_exceeds_curve_bounds(
        mut xs in prop::collection::vec(0.0f32..1000.0, 2..6),
        ys in prop::collection::vec(-96.0f32..24.0, 2..6),
        value in -2000.0f32..2000.0,
    ) {
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        xs.dedup_by(|a, b| (*a - *b).abs() < 1e-4);
        prop_assume!(xs.len() >= 2);
        let ys = &ys[..xs.len()];
        let points: Vec<(f32, f32)> = xs.iter().zip(ys.iter()).map(|(&x, &y)| (x, y)).collect();
        let rpc = linear_rpc(&points);

        let result = audio_engine::rpc::eval_rpc(&rpc, value);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        prop_assert!(result >= min_y - 1e-3 && result <= max_y + 1e-3);
    }

    /// Every selection policy always yields a valid entry index, regardless
    /// of seed or table size.
    #[test]
    fn variation_selection_always_in_range(seed in any::<u64>(), entry_count in 1usize..8, policy_code in 0u8..5) {
        let policy = match policy_code {
            0 => SelectionPolicy::Ordered,
            1 => SelectionPolicy::RandomNoImmediateRepeat,
            2 => SelectionPolicy::Random,
            3 => SelectionPolicy::Shuffle,
            _ => SelectionPolicy::Interactive,
        };
        let table = VariationTable {
            policy,
            variable: if policy == SelectionPolicy::Interactive { Some(0) } else { None },
            entries: (0..entry_count)
                .map(|i| Variation {
                    payload: VariationPayload::Sound(i as u16),
                    min_weight: i as f32,
                    max_weight: (i + 1) as f32,
                })
                .collect(),
        };
        let engine = EngineData::new(vec![], vec![], vec![]);
        let vars = VariableStore::new(&engine);
        let mut rng = EngineRng::new(seed);
        let mut selector = VariationSelector::new(&table);
        for _ in 0..10 {
            let idx = selector.select(&table, &mut rng, &vars);
            prop_assert!(idx < entry_count);
        }
    }
}
