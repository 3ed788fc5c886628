use rand::{Rng, SeedableRng};
use uipack_core::pack::{BlockKey, BlockSpec, SheetPlan, plan_sheets};

fn overlapping(plan: &SheetPlan, sizes: &[(BlockKey, u32, u32)]) -> bool {
    let size_of = |key: &BlockKey| {
        sizes
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|&(_, w, h)| (w, h))
            .expect("spec for placed key")
    };
    for sheet in &plan.sheets {
        for i in 0..sheet.placements.len() {
            for j in (i + 1)..sheet.placements.len() {
                let (ka, ax, ay) = sheet.placements[i];
                let (kb, bx, by) = sheet.placements[j];
                let (aw, ah) = size_of(&ka);
                let (bw, bh) = size_of(&kb);
                let apart = ax + aw <= bx || bx + bw <= ax || ay + ah <= by || by + bh <= ay;
                if !apart {
                    return true;
                }
            }
        }
    }
    false
}

#[test]
fn random_blocks_disjoint_and_deterministic() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut specs: Vec<BlockSpec> = Vec::new();
    for uid in 0..60i64 {
        let w_px = rng.gen_range(1..=6) * 16;
        let h_px = rng.gen_range(1..=6) * 16;
        specs.push(BlockSpec {
            key: BlockKey::Unique { uid },
            w_px,
            h_px,
        });
    }
    let sizes: Vec<(BlockKey, u32, u32)> =
        specs.iter().map(|s| (s.key, s.w_px, s.h_px)).collect();

    let plan = plan_sheets(&specs, 256, 16);
    assert!(!overlapping(&plan, &sizes));
    assert_eq!(plan.index.len(), specs.len());

    // Within-bounds on every sheet.
    for sheet in &plan.sheets {
        for &(key, x, y) in &sheet.placements {
            let &(_, w, h) = sizes.iter().find(|(k, _, _)| *k == key).expect("size");
            assert!(x + w <= sheet.w && y + h <= sheet.h);
        }
    }

    let again = plan_sheets(&specs, 256, 16);
    assert_eq!(plan, again);

    // Input order of distinct keys does not change the result either.
    let mut reversed = specs.clone();
    reversed.reverse();
    assert_eq!(plan_sheets(&reversed, 256, 16), plan);
}

#[test]
fn duplicate_keys_place_once() {
    let spec = BlockSpec {
        key: BlockKey::Button { w: 2, h: 1 },
        w_px: 64,
        h_px: 32,
    };
    let plan = plan_sheets(&[spec, spec, spec], 256, 16);
    assert_eq!(plan.sheets.len(), 1);
    assert_eq!(plan.sheets[0].placements.len(), 1);
    assert_eq!(plan.index.len(), 1);
    let pos = plan.index[&spec.key];
    assert_eq!((pos.sheet, pos.x, pos.y), (1, 0, 0));
}

#[test]
fn largest_first_fills_one_sheet() {
    // Four 128px blocks tile a 256px sheet exactly, row-major.
    let specs: Vec<BlockSpec> = (0..4)
        .map(|uid| BlockSpec {
            key: BlockKey::Unique { uid },
            w_px: 128,
            h_px: 128,
        })
        .collect();
    let plan = plan_sheets(&specs, 256, 16);
    assert_eq!(plan.sheets.len(), 1);
    let coords: Vec<(u32, u32)> = plan.sheets[0]
        .placements
        .iter()
        .map(|&(_, x, y)| (x, y))
        .collect();
    assert_eq!(coords, vec![(0, 0), (128, 0), (0, 128), (128, 128)]);
}

#[test]
fn mixed_sizes_share_one_sheet() {
    let mk = |uid, px| BlockSpec {
        key: BlockKey::Unique { uid },
        w_px: px,
        h_px: px,
    };
    let plan = plan_sheets(&[mk(1, 16), mk(2, 32), mk(3, 16), mk(4, 32)], 256, 16);
    assert_eq!(plan.sheets.len(), 1);
    assert_eq!(plan.sheets[0].placements.len(), 4);
    // Largest first: the 32px blocks lead the row.
    let first = plan.sheets[0].placements[0];
    assert_eq!((first.1, first.2), (0, 0));
}

#[test]
fn oversized_block_gets_a_dedicated_sheet() {
    let big = BlockSpec {
        key: BlockKey::Unique { uid: 1 },
        w_px: 512,
        h_px: 64,
    };
    let small = BlockSpec {
        key: BlockKey::Unique { uid: 2 },
        w_px: 32,
        h_px: 32,
    };
    let plan = plan_sheets(&[small, big], 256, 16);
    assert_eq!(plan.sheets.len(), 2);

    // Largest-first: the dedicated sheet is discovered first.
    let big_pos = plan.index[&big.key];
    assert_eq!((big_pos.sheet, big_pos.x, big_pos.y), (1, 0, 0));
    assert_eq!((plan.sheets[0].w, plan.sheets[0].h), (512, 64));

    // The small block never lands on the dedicated sheet.
    let small_pos = plan.index[&small.key];
    assert_eq!(small_pos.sheet, 2);
    assert_eq!((plan.sheets[1].w, plan.sheets[1].h), (256, 256));
}

#[test]
fn sheet_indices_are_one_based_and_dense() {
    let specs: Vec<BlockSpec> = (0..5)
        .map(|uid| BlockSpec {
            key: BlockKey::Unique { uid },
            w_px: 256,
            h_px: 256,
        })
        .collect();
    let plan = plan_sheets(&specs, 256, 16);
    assert_eq!(plan.sheets.len(), 5);
    let mut seen: Vec<usize> = plan.index.values().map(|p| p.sheet).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}
