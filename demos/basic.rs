//! Basic example of using the Battleship core
//!
//! Pass the engine executable as the first argument to run a real solve:
//! `cargo run -p battleship-core --example basic -- ./battleship_solver`

use battleship_core::{
    decode_solutions, encode, import, Cell, EngineConfig, Position, Puzzle, Supervisor,
};

fn main() {
    // Describe a small puzzle
    let mut puzzle = Puzzle::new(4, 2);
    puzzle.set_cell(Position::new(0, 0), Cell::ShipLeft);
    puzzle.set_cell(Position::new(0, 1), Cell::ShipRight);
    puzzle.set_cell(Position::new(3, 3), Cell::ShipSingle);
    puzzle.toggle(Position::new(1, 1));
    puzzle.recalculate_targets();

    println!("Engine input:");
    let text = encode(&puzzle);
    print!("{}", text);

    // The same text can be pasted back in
    let reimported = import(&text).expect("encoded puzzles always import");
    assert_eq!(reimported, puzzle);
    println!("\nRe-imported a {}x{} board", reimported.size(), reimported.size());

    // Decoding tolerates framing and mixed separators
    let output = "SOLUTIONS: 1\n--- Solution 1 ---\n1,1,0,0\n0;0;0;0\n0 0 0 0\n0 0 0 1\n";
    for solution in decode_solutions(output, 4) {
        println!("\nDecoded solution ({} occupied):", solution.occupied_count());
        print!("{}", solution);
    }

    // Run a real engine if one was given
    let Some(engine) = std::env::args().nth(1) else {
        println!("\nNo engine given, skipping the solve");
        return;
    };
    let mut supervisor = Supervisor::new(EngineConfig::new(engine));
    match supervisor.start_solve(&puzzle) {
        Ok(id) => println!("\nSolve {} started", id),
        Err(err) => {
            println!("\n{}", err);
            return;
        }
    }
    if let Some(report) = supervisor.wait() {
        println!("{}", report.status);
        for solution in supervisor.solutions().iter() {
            println!();
            print!("{}", solution);
        }
    }
}
