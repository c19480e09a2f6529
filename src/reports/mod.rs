use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use itertools::Itertools;
use permforge::optimizer::SearchOutcome;
use permforge::path::PathRef;
use permforge::permutation::Permutation;
use permforge::scorer::BeforeCost;

fn order_string(order: &[usize]) -> String {
    order.iter().join(" ")
}

pub fn print_search_report(outcome: &SearchOutcome, perm: &Permutation) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Step").add_attribute(Attribute::Bold),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Gain").fg(Color::Green),
    ]);
    for (step, score) in outcome.trajectory.iter().enumerate() {
        let gain = if step == 0 {
            0.0
        } else {
            score - outcome.trajectory[step - 1]
        };
        table.add_row(vec![
            Cell::new(step),
            Cell::new(format!("{:.4}", score)),
            Cell::new(format!("{:+.4}", gain)),
        ]);
    }
    for i in 1..3 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("{}", table);

    println!("Iterations: {}", outcome.iterations);
    println!("Initial score: {:.4}", outcome.initial_score);
    println!("Final score: {:.4}", outcome.final_score);
    println!("Final order: {}", order_string(perm.order()));
}

pub fn print_kbest_table(paths: &[PathRef]) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Order"),
        Cell::new("Tree"),
    ]);
    for (rank, path) in paths.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.4}", path.score())).fg(Color::Cyan),
            Cell::new(order_string(&path.leaves())),
            Cell::new(path.to_string()),
        ]);
    }
    for i in 0..2 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("{}", table);
}

pub fn print_gradient_report(summary: &[(&str, f64)], gradient: &BeforeCost) {
    for (label, value) in summary {
        println!("{}: {:.6}", label, value);
    }

    let n = gradient.len();
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("before \\ after").add_attribute(Attribute::Bold)];
    header.extend((0..n).map(|j| Cell::new(j).add_attribute(Attribute::Bold)));
    table.set_header(header);

    for i in 0..n {
        let mut row = vec![Cell::new(i).add_attribute(Attribute::Bold)];
        for j in 0..n {
            let g = gradient.get(i, j);
            let cell = Cell::new(format!("{:.4}", g));
            row.push(if i == j {
                Cell::new("-")
            } else if g > 0.0 {
                cell.fg(Color::Green)
            } else if g < 0.0 {
                cell.fg(Color::Red)
            } else {
                cell
            });
        }
        table.add_row(row);
    }
    for i in 1..=n {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("{}", table);
}
