use battleship_client::{footprint, footprint_end, Board, BoardError, CellState, Orientation, BOARD_SIZE, MISS};
use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn orientation() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::Horizontal), Just(Orientation::Vertical)]
}

/// Board with a handful of randomly placed vessels, types 1..=count.
fn random_board(seed: u64, count: u32) -> Board {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = Board::new();
    for vessel_type in 1..=count {
        let size = rng.random_range(1..=5);
        for _ in 0..1_000 {
            let row = rng.random_range(0..BOARD_SIZE);
            let col = rng.random_range(0..BOARD_SIZE);
            let orientation = if rng.random_bool(0.5) {
                Orientation::Vertical
            } else {
                Orientation::Horizontal
            };
            if board.is_valid_placement(row, col, size, orientation) {
                board.place(row, col, size, orientation, vessel_type);
                break;
            }
        }
    }
    board
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn valid_placement_only_covers_water(
        seed in any::<u64>(),
        row in 0..BOARD_SIZE,
        col in 0..BOARD_SIZE,
        size in 1usize..=5,
        orientation in orientation(),
    ) {
        let board = random_board(seed, 4);
        let fits = board.is_valid_placement(row, col, size, orientation);
        let cells: Vec<_> = footprint(row, col, size, orientation).collect();
        let clear = cells
            .iter()
            .all(|&(r, c)| board.state(r, c) == Some(CellState::Empty));
        prop_assert_eq!(fits, clear);
    }

    #[test]
    fn placing_writes_exactly_size_cells(
        seed in any::<u64>(),
        row in 0..BOARD_SIZE,
        col in 0..BOARD_SIZE,
        size in 1usize..=5,
        orientation in orientation(),
    ) {
        let mut board = random_board(seed, 3);
        prop_assume!(board.is_valid_placement(row, col, size, orientation));
        let before = board.clone();
        board.place(row, col, size, orientation, 9);
        prop_assert_eq!(board.count_vessel_cells(9), size);
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                if board.cell(r, c) != Some(9) {
                    prop_assert_eq!(board.cell(r, c), before.cell(r, c));
                }
            }
        }
    }

    #[test]
    fn footprint_runs_from_anchor_to_end(
        row in 0..BOARD_SIZE,
        col in 0..BOARD_SIZE,
        size in 1usize..=5,
        orientation in orientation(),
    ) {
        let cells: Vec<_> = footprint(row, col, size, orientation).collect();
        prop_assert_eq!(cells.len(), size);
        prop_assert_eq!(cells.first().copied(), Some((row, col)));
        prop_assert_eq!(cells.last().copied(), Some(footprint_end(row, col, size, orientation)));
        let fixed_axis = cells.iter().all(|&(r, c)| match orientation {
            Orientation::Vertical => c == col,
            Orientation::Horizontal => r == row,
        });
        prop_assert!(fixed_axis);
    }

    #[test]
    fn anchors_off_the_grid_are_out_of_bounds(
        row in BOARD_SIZE..BOARD_SIZE * 3,
        col in 0..BOARD_SIZE * 3,
        size in 1usize..=5,
        orientation in orientation(),
    ) {
        let board = Board::new();
        prop_assert_eq!(
            board.check_placement(row, col, size, orientation),
            Err(BoardError::OutOfBounds)
        );
        prop_assert_eq!(
            board.check_placement(col, row, size, orientation),
            Err(BoardError::OutOfBounds)
        );
    }

    #[test]
    fn firing_resolves_every_cell_once(seed in any::<u64>(), row in 0..BOARD_SIZE, col in 0..BOARD_SIZE) {
        let mut board = random_board(seed, 5);
        let before = board.state(row, col);
        let changed = board.mark_hit(row, col) || board.mark_miss(row, col);
        prop_assert!(changed);
        let after = board.state(row, col).unwrap();
        prop_assert!(after.is_resolved());
        match before {
            Some(CellState::Vessel(t)) => prop_assert_eq!(after, CellState::Hit(t)),
            _ => prop_assert_eq!(board.cell(row, col), Some(MISS)),
        }
        prop_assert!(!board.mark_hit(row, col));
        prop_assert!(!board.mark_miss(row, col));
    }
}

#[test]
fn vertical_runs_down_the_rows() {
    let mut board = Board::new();
    board.place(2, 3, 3, Orientation::Vertical, 4);
    assert_eq!(board.cell(2, 3), Some(4));
    assert_eq!(board.cell(4, 3), Some(4));
    assert_eq!(board.cell(2, 4), Some(0));
    assert_eq!(
        board.check_placement(8, 0, 3, Orientation::Vertical),
        Err(BoardError::OutOfBounds)
    );
    assert_eq!(
        board.check_placement(3, 1, 3, Orientation::Horizontal),
        Err(BoardError::Overlaps)
    );
}
